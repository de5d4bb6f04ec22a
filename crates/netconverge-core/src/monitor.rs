//! Device state monitor
//!
//! A [`Monitor`] runs a fixed list of executor calls and turns every
//! non-empty result into a [`MonitorEvent`]. It polls exactly once per
//! [`Monitor::poll_once`]; scheduling belongs to the caller.
//!
//! ## Configuration
//!
//! ```json
//! {
//!   "calls": [
//!     { "operation": "netmiko.send_command", "args": ["show interfaces status | json"] },
//!     { "operation": "junos.rpc", "args": ["get-alarm-information"] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::traits::{CommandExecutor, ExecutorCall};

/// Monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Calls issued on every poll, in order
    #[serde(default)]
    pub calls: Vec<MonitoredCall>,
}

/// One monitored executor call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredCall {
    /// Operation name
    pub operation: String,

    /// Positional arguments
    #[serde(default)]
    pub args: Vec<Value>,

    /// Keyword arguments
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl MonitoredCall {
    /// Monitor an operation without arguments
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

    fn to_call(&self) -> ExecutorCall {
        ExecutorCall {
            operation: self.operation.clone(),
            args: self.args.clone(),
            kwargs: self.kwargs.clone(),
        }
    }
}

impl MonitorConfig {
    /// Validate the configuration against an executor
    pub fn validate(&self, executor: &dyn CommandExecutor) -> Result<()> {
        for call in &self.calls {
            if call.operation.is_empty() {
                return Err(Error::config("monitored call has an empty operation name"));
            }
            if !executor.supports(&call.operation) {
                return Err(Error::config(format!(
                    "{} is not an operation the executor supports",
                    call.operation
                )));
            }
        }
        Ok(())
    }
}

/// A non-empty result of a monitored call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub operation: String,
    pub ret: Value,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

/// Poller over a validated call list
pub struct Monitor {
    config: MonitorConfig,
    executor: Arc<dyn CommandExecutor>,
}

impl Monitor {
    /// Create a monitor; fails when a call names an unsupported operation
    pub fn new(config: MonitorConfig, executor: Arc<dyn CommandExecutor>) -> Result<Self> {
        config.validate(executor.as_ref())?;
        if config.calls.is_empty() {
            warn!("Monitor configured without calls, polls will emit nothing");
        }
        Ok(Self { config, executor })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Issue every configured call once
    ///
    /// A failing call is logged and skipped so it cannot hide the results of
    /// the others.
    pub async fn poll_once(&self) -> Vec<MonitorEvent> {
        let mut events = Vec::new();

        for monitored in &self.config.calls {
            let ret = match self.executor.execute(&monitored.to_call()).await {
                Ok(ret) => ret,
                Err(e) => {
                    warn!("Monitored call {} failed: {}", monitored.operation, e);
                    continue;
                }
            };

            if is_empty_result(&ret) {
                debug!("Monitored call {} returned nothing", monitored.operation);
                continue;
            }

            events.push(MonitorEvent {
                operation: monitored.operation.clone(),
                ret,
                args: monitored.args.clone(),
                kwargs: monitored.kwargs.clone(),
            });
        }

        events
    }
}

/// Null, false, zero, empty strings and empty collections carry no event
fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
