//! Configuration session lifecycle
//!
//! A [`ConfigSession`] tracks one candidate-configuration transaction on one
//! device for the duration of a single reconciliation pass:
//!
//! ```text
//! Created ──▶ Loaded ──▶ Diffed ──▶ Committed
//!    │           │          │   └──▶ Aborted
//!    │           │          │
//!    └───────────┴──────────┴──────▶ Failed
//! ```
//!
//! Transitions only move forward. Commit and abort are mutually exclusive
//! terminal actions, each issued at most once.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::{CommandExecutor, ExecutorCall, ops, output_text};
use crate::types::Vendor;

/// Prefix of generated session names
pub const SESSION_NAME_PREFIX: &str = "config-session-";

/// Generate a session name from the current time in milliseconds
pub fn generate_session_name() -> String {
    format!(
        "{}{}",
        SESSION_NAME_PREFIX,
        chrono::Utc::now().timestamp_millis()
    )
}

/// Use the caller's session name, or generate one when absent or empty
pub fn resolve_session_name(session_name: Option<&str>) -> String {
    match session_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => generate_session_name(),
    }
}

/// Session name required by a session-based operation
pub fn require_session_name<'a>(session_name: Option<&'a str>, operation: &str) -> Result<&'a str> {
    match session_name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(Error::invalid_input(format!(
            "{} requires a session name",
            operation
        ))),
    }
}

/// Command that enters (or re-enters) a named configuration session
pub fn session_command(session_name: &str) -> String {
    format!("configure session {}", session_name)
}

/// Render a template through the executor into configuration lines
///
/// The rendered text is trimmed, then split into lines. Zero lines is a
/// [`Error::Render`].
pub async fn render_commands(executor: &dyn CommandExecutor, template: &str) -> Result<Vec<String>> {
    let call = ExecutorCall::new(ops::TEMPLATE_RENDER)
        .arg(template)
        .kwarg("default_renderer", "jinja");
    let rendered = output_text(&executor.execute(&call).await?);

    let commands: Vec<String> = rendered.trim().lines().map(str::to_string).collect();
    if commands.is_empty() {
        return Err(Error::render(
            "The rendered template contains 0 lines of configuration. \
             Check the template or the template authorization.",
        ));
    }

    Ok(commands)
}

/// Lifecycle state of a configuration session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Created,
    Loaded,
    Diffed,
    Committed,
    Aborted,
    Failed,
}

impl SessionStatus {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Committed | SessionStatus::Aborted | SessionStatus::Failed
        )
    }
}

/// Terminal action issued against a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalAction {
    Commit,
    Abort,
}

/// One in-flight candidate configuration transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSession {
    session_name: Option<String>,
    vendor: Vendor,
    candidate_commands: Vec<String>,
    status: SessionStatus,
    diff_result: Option<String>,
    device_output: String,
    terminal_action: Option<TerminalAction>,
    may_be_open: bool,
}

impl ConfigSession {
    /// Create a session in the `Created` state
    pub fn new(vendor: Vendor, session_name: Option<String>) -> Self {
        Self {
            session_name,
            vendor,
            candidate_commands: Vec::new(),
            status: SessionStatus::Created,
            diff_result: None,
            device_output: String::new(),
            terminal_action: None,
            may_be_open: false,
        }
    }

    pub fn session_name(&self) -> Option<&str> {
        self.session_name.as_deref()
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub fn candidate_commands(&self) -> &[String] {
        &self.candidate_commands
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn diff_result(&self) -> Option<&str> {
        self.diff_result.as_deref()
    }

    pub fn device_output(&self) -> &str {
        &self.device_output
    }

    /// The commit or abort already issued, if any
    pub fn terminal_action(&self) -> Option<TerminalAction> {
        self.terminal_action
    }

    /// Record a completed load
    ///
    /// An empty command list never reaches `Loaded`.
    pub fn mark_loaded(
        &mut self,
        session_name: Option<String>,
        commands: Vec<String>,
        device_output: String,
    ) -> Result<()> {
        self.expect_status(SessionStatus::Created, "load")?;
        if commands.is_empty() {
            return Err(Error::render("cannot load a session with zero commands"));
        }
        if session_name.is_some() {
            self.session_name = session_name;
        }
        self.candidate_commands = commands;
        self.device_output = device_output;
        self.may_be_open = true;
        self.status = SessionStatus::Loaded;
        Ok(())
    }

    /// Record the computed diff
    pub fn mark_diffed(&mut self, diff: String) -> Result<()> {
        self.expect_status(SessionStatus::Loaded, "diff")?;
        self.diff_result = Some(diff);
        self.status = SessionStatus::Diffed;
        Ok(())
    }

    /// Claim the single terminal action of the session
    ///
    /// Must be called before the transport call is issued, so that a failing
    /// commit or abort can never be followed by a second terminal action.
    pub fn begin_terminal(&mut self, action: TerminalAction) -> Result<()> {
        if let Some(issued) = self.terminal_action {
            return Err(Error::session_state(format!(
                "{:?} requested but {:?} was already issued",
                action, issued
            )));
        }
        let allowed = match self.status {
            SessionStatus::Diffed => true,
            SessionStatus::Failed => self.may_be_open && action == TerminalAction::Abort,
            _ => false,
        };
        if !allowed {
            return Err(Error::session_state(format!(
                "{:?} requested on a {:?} session",
                action, self.status
            )));
        }
        self.terminal_action = Some(action);
        Ok(())
    }

    /// Record the successful completion of the claimed terminal action
    pub fn complete_terminal(&mut self, device_output: String) -> Result<()> {
        let status = match self.terminal_action {
            Some(TerminalAction::Commit) => SessionStatus::Committed,
            Some(TerminalAction::Abort) => SessionStatus::Aborted,
            None => {
                return Err(Error::session_state(
                    "no terminal action was claimed for this session",
                ));
            }
        };
        self.device_output = device_output;
        // a cleanup abort after a failure leaves the session failed
        if self.status != SessionStatus::Failed {
            self.status = status;
        }
        Ok(())
    }

    /// Move the session to `Failed`
    pub fn mark_failed(&mut self) {
        self.status = SessionStatus::Failed;
    }

    /// Whether a failed session still needs its best-effort abort
    pub fn needs_cleanup(&self) -> bool {
        self.status == SessionStatus::Failed && self.may_be_open && self.terminal_action.is_none()
    }

    /// Record that a load failed after the device may have opened the session
    ///
    /// Render failures happen before any session-open call and must not use
    /// this.
    pub fn mark_possibly_open(&mut self, device_output: Option<String>) {
        self.may_be_open = true;
        if let Some(output) = device_output {
            self.device_output = output;
        }
    }

    fn expect_status(&self, expected: SessionStatus, operation: &str) -> Result<()> {
        if self.status != expected {
            return Err(Error::session_state(format!(
                "{} requires a {:?} session, found {:?}",
                operation, expected, self.status
            )));
        }
        Ok(())
    }
}
