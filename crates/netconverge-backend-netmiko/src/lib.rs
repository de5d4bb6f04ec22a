// # Netmiko Configuration Session Backends
//
// This crate provides the session backends for devices reached through a
// netmiko-style CLI transport: Arista EOS, Cisco NX-OS, and any other device
// that understands `configure session <name>`.
//
// ## Session Protocol
//
// All three vendors share one command sequence:
//
// ```text
// load:    template.render ─▶ enter_config_mode("configure session S") ─▶ send_config(lines)
// diff:    send_command("show running-config | no-more")
//          send_command("show session-config named S | no-more")
// commit:  enter_config_mode("configure session S") ─▶ send_config(["commit"])
// abort:   enter_config_mode("configure session S") ─▶ send_config(["abort"])
// ```
//
// They differ in two places only:
//
// | Vendor          | Load error marker | Diff                                  |
// |-----------------|-------------------|---------------------------------------|
// | Arista          | `Invalid input`   | configurable, symmetric by default    |
// | Cisco NX-OS     | `Invalid`         | unsupported, fixed sentinel           |
// | Generic netmiko | `Invalid`         | set difference                        |
//
// ## Constraints
//
// - Every executor call is issued exactly once; retries belong to the executor
// - A template rendering to zero lines fails before the session is entered
// - Error markers in load output are reported through `LoadResult::result`

use async_trait::async_trait;
use netconverge_core::config::BackendConfig;
use netconverge_core::diff::{DiffStrategy, SessionDiffEngine};
use netconverge_core::session::{render_commands, require_session_name, resolve_session_name, session_command};
use netconverge_core::traits::{
    BackendFactory, CommandExecutor, ConfigSessionBackend, ExecutorCall, LoadResult, ops,
    output_text,
};
use netconverge_core::types::{RunningConfig, Vendor};
use netconverge_core::{BackendRegistry, Error, Result};
use serde_json::json;
use std::sync::Arc;

/// Load error marker of Arista EOS
pub const ARISTA_ERROR_MARKER: &str = "Invalid input";

/// Load error marker of Cisco NX-OS and generic devices
pub const GENERIC_ERROR_MARKER: &str = "Invalid";

/// Running configuration as compared by diff
pub const SHOW_RUNNING_CONFIG_NO_MORE: &str = "show running-config | no-more";

/// Running configuration as returned to callers
pub const SHOW_RUNNING_CONFIG: &str = "show running-config";

/// Command showing the configuration of a named session
pub fn show_session_config(session_name: &str) -> String {
    format!("show session-config named {} | no-more", session_name)
}

/// Configuration session backend for netmiko-driven devices
pub struct NetmikoBackend {
    vendor: Vendor,
    executor: Arc<dyn CommandExecutor>,
    diff_engine: SessionDiffEngine,
    error_marker: &'static str,
    load_delay_factor: u32,
    session_show_delay_factor: u32,
}

impl std::fmt::Debug for NetmikoBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetmikoBackend")
            .field("vendor", &self.vendor)
            .field("diff_engine", &self.diff_engine)
            .field("error_marker", &self.error_marker)
            .field("load_delay_factor", &self.load_delay_factor)
            .field("session_show_delay_factor", &self.session_show_delay_factor)
            .finish()
    }
}

impl NetmikoBackend {
    /// Create a backend for a netmiko vendor
    ///
    /// # Errors
    ///
    /// - `Error::UnsupportedVendor` for Junos
    /// - `Error::Config` when `config` does not validate
    pub fn new(vendor: Vendor, executor: Arc<dyn CommandExecutor>, config: &BackendConfig) -> Result<Self> {
        config.validate()?;

        let (strategy, error_marker) = match vendor {
            Vendor::Arista => (config.arista_diff, ARISTA_ERROR_MARKER),
            Vendor::CiscoNxos => (DiffStrategy::Unsupported, GENERIC_ERROR_MARKER),
            Vendor::GenericNetmiko => (DiffStrategy::SetDifference, GENERIC_ERROR_MARKER),
            Vendor::Junos => {
                return Err(Error::unsupported_vendor(
                    "Junos devices are not driven through netmiko",
                ));
            }
        };

        Ok(Self {
            vendor,
            executor,
            diff_engine: SessionDiffEngine::new(strategy),
            error_marker,
            load_delay_factor: config.load_delay_factor,
            session_show_delay_factor: config.session_show_delay_factor,
        })
    }

    /// Diff strategy in use
    pub fn diff_strategy(&self) -> DiffStrategy {
        self.diff_engine.strategy()
    }

    /// Enter the named session in configuration mode
    async fn enter_session(&self, session_name: &str) -> Result<String> {
        let call = ExecutorCall::new(ops::NETMIKO_ENTER_CONFIG_MODE)
            .kwarg("config_command", session_command(session_name));
        Ok(output_text(&self.executor.execute(&call).await?))
    }

    /// Submit configuration lines, leaving configuration mode afterwards
    async fn send_config(&self, commands: &[String], delay_factor: Option<u32>) -> Result<String> {
        let mut call = ExecutorCall::new(ops::NETMIKO_SEND_CONFIG)
            .kwarg("config_commands", json!(commands))
            .kwarg("exit_config_mode", true);
        if let Some(delay_factor) = delay_factor {
            call = call.kwarg("delay_factor", delay_factor);
        }
        Ok(output_text(&self.executor.execute(&call).await?))
    }

    async fn send_command(&self, command: &str, delay_factor: Option<u32>) -> Result<String> {
        let mut call = ExecutorCall::new(ops::NETMIKO_SEND_COMMAND).arg(command);
        if let Some(delay_factor) = delay_factor {
            call = call.kwarg("delay_factor", delay_factor);
        }
        Ok(output_text(&self.executor.execute(&call).await?))
    }

    /// Re-enter a session and send one session keyword (`commit`/`abort`)
    async fn close_session(&self, session_name: Option<&str>, keyword: &str) -> Result<String> {
        let session_name = require_session_name(session_name, keyword)?;

        let mut output = self.enter_session(session_name).await?;
        output.push_str(&self.send_config(&[keyword.to_string()], None).await?);

        tracing::info!(
            "Sent {} to session {} on {} device",
            keyword,
            session_name,
            self.vendor
        );
        Ok(output)
    }
}

#[async_trait]
impl ConfigSessionBackend for NetmikoBackend {
    /// Render `template` and load it into a named session
    ///
    /// The template is rendered before anything is sent, so an empty render
    /// never opens a session.
    async fn load(&self, template: &str, session_name: Option<&str>) -> Result<LoadResult> {
        let session_name = resolve_session_name(session_name);
        let commands = render_commands(self.executor.as_ref(), template).await?;

        tracing::info!(
            "Loading {} line(s) into session {} on {} device",
            commands.len(),
            session_name,
            self.vendor
        );

        self.enter_session(&session_name).await?;
        let device_output = self
            .send_config(&commands, Some(self.load_delay_factor))
            .await?;

        let result = !device_output.contains(self.error_marker);
        if !result {
            tracing::warn!(
                "Device reported '{}' while loading session {}",
                self.error_marker,
                session_name
            );
        }

        Ok(LoadResult {
            result,
            session_name: Some(session_name),
            device_output,
            commands,
        })
    }

    async fn diff(&self, session_name: Option<&str>) -> Result<String> {
        // nothing to fetch when the vendor cannot diff
        if !self.diff_engine.needs_configs() {
            tracing::debug!("Diff unsupported on {} device", self.vendor);
            return self.diff_engine.compare("", "");
        }

        let session_name = require_session_name(session_name, "diff")?;

        let running = self.send_command(SHOW_RUNNING_CONFIG_NO_MORE, None).await?;
        let session = self
            .send_command(
                &show_session_config(session_name),
                Some(self.session_show_delay_factor),
            )
            .await?;

        let diff = self.diff_engine.compare(&running, &session)?;
        tracing::debug!(
            "Session {} differs from running config in {} line(s) ({})",
            session_name,
            diff.lines().count(),
            self.diff_engine.strategy()
        );
        Ok(diff)
    }

    async fn commit(&self, session_name: Option<&str>) -> Result<String> {
        self.close_session(session_name, "commit").await
    }

    async fn abort(&self, session_name: Option<&str>) -> Result<String> {
        self.close_session(session_name, "abort").await
    }

    async fn running_config(&self) -> Result<RunningConfig> {
        let config = self.send_command(SHOW_RUNNING_CONFIG, None).await?;
        Ok(RunningConfig::Text(config))
    }

    fn vendor(&self) -> Vendor {
        self.vendor
    }

    fn backend_name(&self) -> &'static str {
        self.vendor.as_str()
    }
}

/// Factory for creating netmiko backends
pub struct NetmikoFactory;

impl BackendFactory for NetmikoFactory {
    fn create(
        &self,
        vendor: Vendor,
        executor: Arc<dyn CommandExecutor>,
        config: &BackendConfig,
    ) -> Result<Box<dyn ConfigSessionBackend>> {
        Ok(Box::new(NetmikoBackend::new(vendor, executor, config)?))
    }
}

/// Register the netmiko backends with a registry
///
/// Covers Arista EOS, Cisco NX-OS and generic netmiko devices.
///
/// # Example
///
/// ```rust
/// use netconverge_core::BackendRegistry;
///
/// let registry = BackendRegistry::new();
/// netconverge_backend_netmiko::register(&registry);
/// ```
pub fn register(registry: &BackendRegistry) {
    for vendor in [Vendor::Arista, Vendor::CiscoNxos, Vendor::GenericNetmiko] {
        registry.register_backend(vendor, Box::new(NetmikoFactory));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullExecutor;

    #[async_trait]
    impl CommandExecutor for NullExecutor {
        async fn execute(&self, _call: &ExecutorCall) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
    }

    fn backend(vendor: Vendor) -> Result<NetmikoBackend> {
        NetmikoBackend::new(vendor, Arc::new(NullExecutor), &BackendConfig::default())
    }

    #[test]
    fn test_vendor_policies() {
        let arista = backend(Vendor::Arista).unwrap();
        assert_eq!(arista.diff_strategy(), DiffStrategy::SymmetricDifference);
        assert_eq!(arista.error_marker, "Invalid input");

        let cisco = backend(Vendor::CiscoNxos).unwrap();
        assert_eq!(cisco.diff_strategy(), DiffStrategy::Unsupported);
        assert_eq!(cisco.error_marker, "Invalid");

        let generic = backend(Vendor::GenericNetmiko).unwrap();
        assert_eq!(generic.diff_strategy(), DiffStrategy::SetDifference);
    }

    #[test]
    fn test_arista_diff_is_configurable() {
        let config = BackendConfig {
            arista_diff: DiffStrategy::SetDifference,
            ..BackendConfig::default()
        };
        let arista = NetmikoBackend::new(Vendor::Arista, Arc::new(NullExecutor), &config).unwrap();
        assert_eq!(arista.diff_strategy(), DiffStrategy::SetDifference);
    }

    #[test]
    fn test_junos_rejected() {
        assert!(matches!(
            backend(Vendor::Junos),
            Err(Error::UnsupportedVendor(_))
        ));
    }

    #[test]
    fn test_register_covers_netmiko_vendors() {
        let registry = BackendRegistry::new();
        register(&registry);

        assert_eq!(
            registry.list_backends(),
            vec![Vendor::Arista, Vendor::CiscoNxos, Vendor::GenericNetmiko]
        );
        assert!(!registry.has_backend(Vendor::Junos));
    }

    #[test]
    fn test_show_session_config() {
        assert_eq!(
            show_session_config("s1"),
            "show session-config named s1 | no-more"
        );
    }
}
