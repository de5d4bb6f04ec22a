// # Command Executor Trait
//
// Defines the interface of the transport collaborator that talks to a device.
//
// ## Implementations
//
// The core ships none. Transport drivers (SSH/console session drivers,
// NETCONF RPC clients) live outside this workspace and are injected into
// backends as `Arc<dyn CommandExecutor>`.
//
// ## Usage
//
// ```rust,ignore
// use netconverge_core::traits::{CommandExecutor, ExecutorCall, ops};
//
// let call = ExecutorCall::new(ops::NETMIKO_SEND_COMMAND)
//     .arg("show running-config | no-more");
// let output = executor.execute(&call).await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Operation names understood by executors
pub mod ops {
    /// Render a template reference into configuration text
    pub const TEMPLATE_RENDER: &str = "template.render";
    /// Enter configuration mode with a custom mode command
    pub const NETMIKO_ENTER_CONFIG_MODE: &str = "netmiko.enter_config_mode";
    /// Send a list of configuration commands
    pub const NETMIKO_SEND_CONFIG: &str = "netmiko.send_config";
    /// Send a single exec-mode command and return its output
    pub const NETMIKO_SEND_COMMAND: &str = "netmiko.send_command";
    /// Load configuration into the Junos candidate buffer
    pub const JUNOS_LOAD: &str = "junos.load";
    /// Diff the Junos candidate buffer against the active configuration
    pub const JUNOS_DIFF: &str = "junos.diff";
    /// Commit the Junos candidate buffer
    pub const JUNOS_COMMIT: &str = "junos.commit";
    /// Discard the Junos candidate buffer
    pub const JUNOS_ROLLBACK: &str = "junos.rollback";
    /// Issue a raw Junos RPC
    pub const JUNOS_RPC: &str = "junos.rpc";
}

/// One call to the executor: operation name plus positional and keyword arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorCall {
    /// Operation name (see [`ops`])
    pub operation: String,

    /// Positional arguments
    #[serde(default)]
    pub args: Vec<Value>,

    /// Keyword arguments
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl ExecutorCall {
    /// Create a call with no arguments
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            args: Vec::new(),
            kwargs: Map::new(),
        }
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Set a keyword argument
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }
}

/// Trait for transport collaborators
///
/// Executors run one named remote operation against one device and return
/// raw text (as a JSON string) or structured data. Every failure surfaces as
/// [`crate::Error::Execution`].
///
/// Executors own timeouts, retries and backoff. Backends issue each call
/// exactly once.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute one operation
    async fn execute(&self, call: &ExecutorCall) -> Result<Value, crate::Error>;

    /// Check whether the executor knows an operation
    ///
    /// Used to validate configuration at construction time.
    fn supports(&self, _operation: &str) -> bool {
        true
    }
}

/// Flatten an executor result into text
///
/// Strings are returned verbatim, `null` becomes empty, anything else is
/// serialized as JSON.
pub fn output_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
