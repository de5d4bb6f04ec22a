//! Configuration convergence reconciler
//!
//! The ConfigReconciler is responsible for:
//! - Loading a rendered template into a candidate session
//! - Diffing the candidate against the running configuration
//! - Committing, aborting, or reporting depending on the diff and run mode
//! - Closing every session it opened, including on failure
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────────┐
//! request ───────▶ │ ConfigReconciler │ ── ReconcileEvent ──▶ observers
//!                  └──────────────────┘
//!                           │
//!                           ▼
//!               ┌──────────────────────┐
//!               │ ConfigSessionBackend │  load / diff / commit / abort
//!               └──────────────────────┘
//!                           │
//!                           ▼
//!                  ┌─────────────────┐
//!                  │ CommandExecutor │  transport (external)
//!                  └─────────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! ```text
//! Start ─▶ Loaded ─▶ Evaluated ─┬─▶ Converged       (empty diff, abort)
//!    │        │          │      ├─▶ DryRunReported  (diff, dry run, abort)
//!    │        │          │      └─▶ Applied         (diff, commit)
//!    └────────┴──────────┴────────▶ Failed          (best-effort abort)
//! ```

pub mod fleet;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{NetConvergeConfig, ReconcilerConfig, RunOptions};
use crate::error::{Error, Result};
use crate::registry::BackendRegistry;
use crate::session::{ConfigSession, TerminalAction, resolve_session_name};
use crate::traits::{CommandExecutor, ConfigSessionBackend};
use crate::types::{DeviceMetadata, Outcome, ReconcileResult, ReconcileStage};

pub use fleet::{FleetJob, reconcile_fleet};

/// Comment of a pass that found nothing to change
pub const COMMENT_CONVERGED: &str = "The device is already configured.";

/// Comment of a dry-run pass that found changes
pub const COMMENT_DRY_RUN: &str = "Changes would be applied but we are in test mode.";

/// Comment of a pass that committed changes
pub const COMMENT_APPLIED: &str = "The device has been successfully configured.";

/// A declared convergence target for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileRequest {
    /// Name of the target (echoed in the result)
    pub name: String,

    /// Vendor metadata of the device
    pub device: DeviceMetadata,

    /// Template reference passed to the renderer
    pub template: String,

    /// Report instead of committing
    #[serde(default)]
    pub dry_run: bool,

    /// Session name to use; generated when absent
    #[serde(default)]
    pub session_name: Option<String>,
}

impl ReconcileRequest {
    /// Create an apply request without a session name
    pub fn new(name: impl Into<String>, device: DeviceMetadata, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device,
            template: template.into(),
            dry_run: false,
            session_name: None,
        }
    }

    /// Set dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Use a fixed session name
    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }
}

/// Events emitted by the ConfigReconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Load started
    LoadStarted {
        name: String,
        session_name: Option<String>,
    },

    /// Candidate loaded
    Loaded {
        name: String,
        session_name: Option<String>,
        accepted: bool,
    },

    /// Diff computed
    Diffed { name: String, has_changes: bool },

    /// Nothing to change; session aborted
    Converged { name: String },

    /// Changes found in dry-run mode; session aborted
    DryRunReported { name: String, diff: String },

    /// Changes committed
    Applied { name: String, diff: String },

    /// Pass failed
    Failed {
        name: String,
        stage: ReconcileStage,
        error: String,
    },

    /// Best-effort abort after a failure
    CleanupAborted { name: String, succeeded: bool },
}

/// Convergence state machine for one device
///
/// Each call to [`reconcile`](Self::reconcile) is one pass over one
/// candidate session. Load, diff and the terminal action are awaited in
/// order; nothing is issued concurrently against the device.
///
/// ## Session Closure
///
/// Every session the pass may have opened is closed by exactly one commit
/// or abort. A failure before the terminal action triggers one best-effort
/// abort; a failing commit or abort is never followed by another terminal
/// action.
pub struct ConfigReconciler {
    /// Vendor backend driving the device
    backend: Box<dyn ConfigSessionBackend>,

    /// Injected run mode
    options: RunOptions,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl ConfigReconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields reconciler events
    pub fn new(
        backend: Box<dyn ConfigSessionBackend>,
        options: RunOptions,
        config: &ReconcilerConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let reconciler = Self {
            backend,
            options,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Create a reconciler for a device, selecting its backend from `registry`
    pub fn for_device(
        registry: &BackendRegistry,
        device: &DeviceMetadata,
        executor: Arc<dyn CommandExecutor>,
        config: &NetConvergeConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;
        let backend = registry.create_backend(device, executor, &config.backend)?;
        Self::new(backend, config.run, &config.reconciler)
    }

    /// The backend this reconciler drives
    pub fn backend(&self) -> &dyn ConfigSessionBackend {
        self.backend.as_ref()
    }

    /// The injected run options
    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Run one reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileResult)`: converged, dry-run report, or applied
    /// - `Err(Error::Reconcile)`: the pass failed; carries the stage and the
    ///   captured device output
    /// - `Err(_)`: the request does not match this reconciler's backend
    pub async fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileResult> {
        let vendor = self.backend.vendor();
        let requested = request.device.vendor()?;
        if requested != vendor {
            return Err(Error::invalid_input(format!(
                "request for {} targets a {} device but the backend is {}",
                request.name, requested, vendor
            )));
        }

        let dry_run = self.options.dry_run || request.dry_run;
        let session_name = self
            .backend
            .supports_sessions()
            .then(|| resolve_session_name(request.session_name.as_deref()));
        let mut session = ConfigSession::new(vendor, session_name);

        info!(
            "Reconciling {} via {} backend [mode: {}]",
            request.name,
            self.backend.backend_name(),
            if dry_run { "DRY-RUN" } else { "APPLY" }
        );

        self.load(request, &mut session).await?;

        let diff = self.diff(&request.name, &mut session).await?;

        let result = if diff.is_empty() {
            self.finish(&request.name, &mut session, TerminalAction::Abort)
                .await?;
            info!("{} is already converged", request.name);
            self.emit_event(ReconcileEvent::Converged {
                name: request.name.clone(),
            });
            ReconcileResult {
                name: request.name.clone(),
                result: Some(true),
                changes: BTreeMap::new(),
                comment: COMMENT_CONVERGED.to_string(),
                outcome: Outcome::Converged,
            }
        } else if dry_run {
            self.finish(&request.name, &mut session, TerminalAction::Abort)
                .await?;
            info!("{} would change (dry run, session aborted)", request.name);
            self.emit_event(ReconcileEvent::DryRunReported {
                name: request.name.clone(),
                diff: diff.clone(),
            });
            ReconcileResult {
                name: request.name.clone(),
                result: None,
                changes: BTreeMap::from([("diff".to_string(), diff)]),
                comment: COMMENT_DRY_RUN.to_string(),
                outcome: Outcome::DryRunReported,
            }
        } else {
            self.finish(&request.name, &mut session, TerminalAction::Commit)
                .await?;
            info!("{} configured, session committed", request.name);
            self.emit_event(ReconcileEvent::Applied {
                name: request.name.clone(),
                diff: diff.clone(),
            });
            ReconcileResult {
                name: request.name.clone(),
                result: Some(true),
                changes: BTreeMap::from([
                    ("old".to_string(), String::new()),
                    ("new".to_string(), diff),
                ]),
                comment: COMMENT_APPLIED.to_string(),
                outcome: Outcome::Applied,
            }
        };

        Ok(result)
    }

    /// Load the template into the session
    async fn load(&self, request: &ReconcileRequest, session: &mut ConfigSession) -> Result<()> {
        self.emit_event(ReconcileEvent::LoadStarted {
            name: request.name.clone(),
            session_name: session.session_name().map(str::to_string),
        });

        let load_result = self
            .backend
            .load(&request.template, session.session_name())
            .await;
        let loaded = match load_result {
            Ok(loaded) => loaded,
            Err(e) => {
                // rendering happens before the session is opened
                if !matches!(e, Error::Render(_)) {
                    session.mark_possibly_open(None);
                }
                return Err(self.fail(&request.name, session, ReconcileStage::Load, e).await);
            }
        };

        let accepted = loaded.result;
        if let Err(e) = session.mark_loaded(loaded.session_name, loaded.commands, loaded.device_output) {
            session.mark_possibly_open(None);
            return Err(self.fail(&request.name, session, ReconcileStage::Load, e).await);
        }

        debug!(
            "Loaded {} line(s) into session {:?} for {}",
            session.candidate_commands().len(),
            session.session_name(),
            request.name
        );
        self.emit_event(ReconcileEvent::Loaded {
            name: request.name.clone(),
            session_name: session.session_name().map(str::to_string),
            accepted,
        });

        if !accepted {
            if self.options.reject_invalid_load {
                let output = session.device_output().to_string();
                return Err(self
                    .fail(&request.name, session, ReconcileStage::Load, Error::LoadRejected(output))
                    .await);
            }
            warn!(
                "Device flagged the candidate for {} as invalid, continuing",
                request.name
            );
        }

        Ok(())
    }

    /// Diff the session against the running configuration
    async fn diff(&self, name: &str, session: &mut ConfigSession) -> Result<String> {
        let diff_result = self.backend.diff(session.session_name()).await;
        let diff = match diff_result {
            Ok(diff) => diff,
            Err(e) => return Err(self.fail(name, session, ReconcileStage::Diff, e).await),
        };

        if let Err(e) = session.mark_diffed(diff.clone()) {
            return Err(self.fail(name, session, ReconcileStage::Diff, e).await);
        }

        debug!("Diff for {} has {} line(s)", name, diff.lines().count());
        self.emit_event(ReconcileEvent::Diffed {
            name: name.to_string(),
            has_changes: !diff.is_empty(),
        });

        Ok(diff)
    }

    /// Issue the session's single terminal action
    async fn finish(
        &self,
        name: &str,
        session: &mut ConfigSession,
        action: TerminalAction,
    ) -> Result<()> {
        let stage = match action {
            TerminalAction::Commit => ReconcileStage::Commit,
            TerminalAction::Abort => ReconcileStage::Abort,
        };

        if let Err(e) = session.begin_terminal(action) {
            return Err(self.fail(name, session, stage, e).await);
        }

        let output = match action {
            TerminalAction::Commit => self.backend.commit(session.session_name()).await,
            TerminalAction::Abort => self.backend.abort(session.session_name()).await,
        };

        match output {
            Ok(output) => session.complete_terminal(output),
            Err(e) => Err(self.fail(name, session, stage, e).await),
        }
    }

    /// Move the session to `Failed`, clean up, and build the pass error
    async fn fail(
        &self,
        name: &str,
        session: &mut ConfigSession,
        stage: ReconcileStage,
        cause: Error,
    ) -> Error {
        session.mark_failed();
        let device_output = session.device_output().to_string();

        error!("Reconciliation of {} failed during {}: {}", name, stage, cause);
        self.emit_event(ReconcileEvent::Failed {
            name: name.to_string(),
            stage,
            error: cause.to_string(),
        });

        if session.needs_cleanup() {
            self.cleanup(name, session).await;
        }

        Error::reconcile(stage, device_output, cause)
    }

    /// Best-effort abort of a failed session
    async fn cleanup(&self, name: &str, session: &mut ConfigSession) {
        if let Err(e) = session.begin_terminal(TerminalAction::Abort) {
            warn!("Skipping cleanup of {}: {}", name, e);
            return;
        }

        let abort_result = self.backend.abort(session.session_name()).await;
        let succeeded = match abort_result {
            Ok(output) => {
                if let Err(e) = session.complete_terminal(output) {
                    warn!("Cleanup of {} left the session inconsistent: {}", name, e);
                }
                info!("Aborted session {:?} of {} after failure", session.session_name(), name);
                true
            }
            Err(e) => {
                warn!(
                    "Best-effort abort of session {:?} for {} failed: {}",
                    session.session_name(),
                    name,
                    e
                );
                false
            }
        };

        self.emit_event(ReconcileEvent::CleanupAborted {
            name: name.to_string(),
            succeeded,
        });
    }

    /// Emit a reconciler event
    fn emit_event(&self, event: ReconcileEvent) {
        // full channel: drop the event rather than block the pass
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!("Event channel full, dropping reconciler event {:?}", event);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("No event receiver, dropping reconciler event");
            }
        }
    }
}
