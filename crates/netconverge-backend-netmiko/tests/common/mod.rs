//! Test doubles for netmiko backend contract tests

#![allow(dead_code)]

use netconverge_core::error::{Error, Result};
use netconverge_core::traits::{CommandExecutor, ExecutorCall, ops};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// An executor answering from a script and recording every call
///
/// Responses are looked up by `"<operation> <first argument>"` first, then
/// by scripted prefix/suffix patterns of that key, then by operation alone.
/// Unscripted calls return an empty string.
#[derive(Clone, Default)]
pub struct ScriptedExecutor {
    responses: Arc<Mutex<HashMap<String, Value>>>,
    prefixed: Arc<Mutex<Vec<(String, String, Value)>>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<ExecutorCall>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `key` with `value`
    pub fn respond(self, key: &str, value: impl Into<Value>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(key.to_string(), value.into());
        self
    }

    /// Answer every key starting with `prefix` and ending with `suffix`
    pub fn respond_matching(self, prefix: &str, suffix: &str, value: impl Into<Value>) -> Self {
        self.prefixed
            .lock()
            .unwrap()
            .push((prefix.to_string(), suffix.to_string(), value.into()));
        self
    }

    /// Render every template to `text`
    pub fn rendering(self, text: &str) -> Self {
        self.respond(ops::TEMPLATE_RENDER, text)
    }

    /// Fail calls matching `key`
    pub fn failing(self, key: &str, message: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(key.to_string(), message.to_string());
        self
    }

    /// Get every recorded call
    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the recorded operation names
    pub fn operations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|call| call.operation)
            .collect()
    }

    /// Number of calls to `operation`
    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    fn matching(&self, key: &str) -> Option<Value> {
        self.prefixed
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, suffix, _)| {
                key.len() >= prefix.len() + suffix.len()
                    && key.starts_with(prefix.as_str())
                    && key.ends_with(suffix.as_str())
            })
            .map(|(_, _, value)| value.clone())
    }

    fn keys(call: &ExecutorCall) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(Value::String(first)) = call.args.first() {
            keys.push(format!("{} {}", call.operation, first));
        }
        keys.push(call.operation.clone());
        keys
    }
}

#[async_trait::async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, call: &ExecutorCall) -> Result<Value> {
        self.calls.lock().unwrap().push(call.clone());

        for key in Self::keys(call) {
            if let Some(message) = self.failures.lock().unwrap().get(&key) {
                return Err(Error::execution(&call.operation, message.clone()));
            }
            if let Some(value) = self.responses.lock().unwrap().get(&key) {
                return Ok(value.clone());
            }
            if let Some(value) = self.matching(&key) {
                return Ok(value);
            }
        }
        Ok(Value::String(String::new()))
    }
}
