// # Junos Configuration Session Backend
//
// This crate provides the session backend for Juniper Junos devices driven
// through RPC calls.
//
// ## Candidate Buffer
//
// Junos has no named sessions. Every primitive works on the device's single
// implicit candidate buffer, so the `session_name` arguments are ignored:
//
// ```text
// load:    template.render ─▶ junos.load(text, format/overwrite/replace)
// diff:    junos.diff      ─▶ { out, message }
// commit:  junos.commit
// abort:   junos.rollback
// ```
//
// ## Failure Reporting
//
// Junos replies carry an `out` flag. A diff whose flag is false fails with
// `Error::Diff`; load reports it through `LoadResult::result`. Commit and
// rollback replies with a false flag are execution failures.

use async_trait::async_trait;
use netconverge_core::config::{BackendConfig, JunosLoadOptions};
use netconverge_core::session::render_commands;
use netconverge_core::traits::{
    BackendFactory, CommandExecutor, ConfigSessionBackend, ExecutorCall, LoadResult, ops,
    output_text,
};
use netconverge_core::types::{RunningConfig, Vendor};
use netconverge_core::{BackendRegistry, Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// RPC returning the active configuration
pub const GET_CONFIG_RPC: &str = "get-config";

/// Configuration session backend for Junos
pub struct JunosBackend {
    executor: Arc<dyn CommandExecutor>,
    load_options: JunosLoadOptions,
}

impl JunosBackend {
    /// Create a Junos backend
    pub fn new(executor: Arc<dyn CommandExecutor>, config: &BackendConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            executor,
            load_options: config.junos_load.clone(),
        })
    }

    async fn call(&self, call: ExecutorCall) -> Result<Value> {
        self.executor.execute(&call).await
    }

    /// Discard the candidate buffer
    pub async fn rollback(&self) -> Result<String> {
        let reply = self.call(ExecutorCall::new(ops::JUNOS_ROLLBACK)).await?;
        let output = Self::checked_output(ops::JUNOS_ROLLBACK, &reply)?;
        tracing::info!("Rolled back the Junos candidate configuration");
        Ok(output)
    }

    /// Output of a commit or rollback reply, failing when `out` is false
    fn checked_output(operation: &str, reply: &Value) -> Result<String> {
        if reply.get("out").and_then(Value::as_bool) == Some(false) {
            return Err(Error::execution(operation, reply_message(reply)));
        }
        Ok(reply_message(reply))
    }
}

/// The `message` of a reply, or the whole reply when it has none
fn reply_message(reply: &Value) -> String {
    match reply.get("message") {
        Some(message) => output_text(message),
        None => output_text(reply),
    }
}

#[async_trait]
impl ConfigSessionBackend for JunosBackend {
    async fn load(&self, template: &str, _session_name: Option<&str>) -> Result<LoadResult> {
        let commands = render_commands(self.executor.as_ref(), template).await?;

        tracing::info!(
            "Loading {} line(s) into the Junos candidate configuration",
            commands.len()
        );

        let mut call = ExecutorCall::new(ops::JUNOS_LOAD).arg(commands.join("\n"));
        call.kwargs.extend(self.load_options.to_kwargs());
        let reply = self.call(call).await?;

        let result = reply.get("out").and_then(Value::as_bool).unwrap_or(true);
        if !result {
            tracing::warn!("Junos rejected the candidate configuration");
        }

        Ok(LoadResult {
            result,
            session_name: None,
            device_output: reply_message(&reply),
            commands,
        })
    }

    /// Device-side diff of the candidate buffer
    ///
    /// Fails with `Error::Diff` when the reply's `out` flag is not true.
    async fn diff(&self, _session_name: Option<&str>) -> Result<String> {
        let reply = self.call(ExecutorCall::new(ops::JUNOS_DIFF)).await?;

        if reply.get("out").and_then(Value::as_bool) != Some(true) {
            return Err(Error::diff(format!("diff failed: {}", reply)));
        }

        let diff = reply.get("message").map(output_text).unwrap_or_default();
        tracing::debug!("Junos candidate differs in {} line(s)", diff.lines().count());
        Ok(diff)
    }

    async fn commit(&self, _session_name: Option<&str>) -> Result<String> {
        let reply = self.call(ExecutorCall::new(ops::JUNOS_COMMIT)).await?;
        let output = Self::checked_output(ops::JUNOS_COMMIT, &reply)?;
        tracing::info!("Committed the Junos candidate configuration");
        Ok(output)
    }

    /// Junos aborts by rolling the candidate buffer back
    async fn abort(&self, _session_name: Option<&str>) -> Result<String> {
        self.rollback().await
    }

    async fn running_config(&self) -> Result<RunningConfig> {
        let reply = self
            .call(ExecutorCall::new(ops::JUNOS_RPC).arg(GET_CONFIG_RPC))
            .await?;

        let configuration = reply
            .get("rpc_reply")
            .and_then(|rpc_reply| rpc_reply.get("configuration"))
            .ok_or_else(|| {
                Error::execution(ops::JUNOS_RPC, "reply has no rpc_reply.configuration")
            })?;

        Ok(RunningConfig::Structured(configuration.clone()))
    }

    fn vendor(&self) -> Vendor {
        Vendor::Junos
    }

    fn backend_name(&self) -> &'static str {
        "junos"
    }
}

/// Factory for creating Junos backends
pub struct JunosFactory;

impl BackendFactory for JunosFactory {
    fn create(
        &self,
        vendor: Vendor,
        executor: Arc<dyn CommandExecutor>,
        config: &BackendConfig,
    ) -> Result<Box<dyn ConfigSessionBackend>> {
        if vendor != Vendor::Junos {
            return Err(Error::unsupported_vendor(format!(
                "Junos backend cannot drive {} devices",
                vendor
            )));
        }
        Ok(Box::new(JunosBackend::new(executor, config)?))
    }
}

/// Register the Junos backend with a registry
///
/// # Example
///
/// ```rust
/// use netconverge_core::BackendRegistry;
///
/// let registry = BackendRegistry::new();
/// netconverge_backend_junos::register(&registry);
/// ```
pub fn register(registry: &BackendRegistry) {
    registry.register_backend(Vendor::Junos, Box::new(JunosFactory));
}
