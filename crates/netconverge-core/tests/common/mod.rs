//! Test doubles and common utilities for reconciler contract tests
//!
//! This module provides minimal test doubles that verify the session
//! protocol without talking to any device.

#![allow(dead_code)]

use netconverge_core::config::BackendConfig;
use netconverge_core::error::{Error, Result};
use netconverge_core::traits::{
    BackendFactory, CommandExecutor, ConfigSessionBackend, ExecutorCall, LoadResult,
};
use netconverge_core::types::{ReconcileStage, RunningConfig, Vendor};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Where a [`MockBackend`] should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Template renders to nothing; fails before any session call
    Render,
    /// Transport error at the given stage
    Transport(ReconcileStage),
}

/// A mock ConfigSessionBackend that tracks calls
pub struct MockBackend {
    vendor: Vendor,
    diff_output: String,
    load_accepted: bool,
    failures: Vec<Failure>,
    op_delay: Option<Duration>,
    /// Call counter for load()
    load_call_count: Arc<AtomicUsize>,
    /// Call counter for diff()
    diff_call_count: Arc<AtomicUsize>,
    /// Call counter for commit()
    commit_call_count: Arc<AtomicUsize>,
    /// Call counter for abort()
    abort_call_count: Arc<AtomicUsize>,
    /// Ordered log of calls, e.g. `load:s1`
    calls: Arc<Mutex<Vec<String>>>,
    /// Operations currently running against this device
    in_flight: Arc<AtomicUsize>,
    /// Highest value `in_flight` ever reached
    max_in_flight: Arc<AtomicUsize>,
    /// Operations currently running across every backend sharing this probe
    global_in_flight: Arc<AtomicUsize>,
    /// Highest value `global_in_flight` ever reached
    max_global_in_flight: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Create a backend whose diff is empty
    pub fn new(vendor: Vendor) -> Self {
        Self {
            vendor,
            diff_output: String::new(),
            load_accepted: true,
            failures: Vec::new(),
            op_delay: None,
            load_call_count: Arc::new(AtomicUsize::new(0)),
            diff_call_count: Arc::new(AtomicUsize::new(0)),
            commit_call_count: Arc::new(AtomicUsize::new(0)),
            abort_call_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            global_in_flight: Arc::new(AtomicUsize::new(0)),
            max_global_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Return `diff` from diff()
    pub fn with_diff(mut self, diff: &str) -> Self {
        self.diff_output = diff.to_string();
        self
    }

    /// Flag every load as rejected by the device
    pub fn rejecting_load(mut self) -> Self {
        self.load_accepted = false;
        self
    }

    /// Fail as described
    pub fn failing(mut self, failure: Failure) -> Self {
        self.failures.push(failure);
        self
    }

    /// Sleep inside every operation
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.op_delay = Some(delay);
        self
    }

    /// Share the cross-device concurrency probe of `other`
    pub fn sharing_probe_with(mut self, other: &Self) -> Self {
        self.global_in_flight = Arc::clone(&other.global_in_flight);
        self.max_global_in_flight = Arc::clone(&other.max_global_in_flight);
        self
    }

    /// Create a new MockBackend that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            vendor: other.vendor,
            diff_output: other.diff_output.clone(),
            load_accepted: other.load_accepted,
            failures: other.failures.clone(),
            op_delay: other.op_delay,
            load_call_count: Arc::clone(&other.load_call_count),
            diff_call_count: Arc::clone(&other.diff_call_count),
            commit_call_count: Arc::clone(&other.commit_call_count),
            abort_call_count: Arc::clone(&other.abort_call_count),
            calls: Arc::clone(&other.calls),
            in_flight: Arc::clone(&other.in_flight),
            max_in_flight: Arc::clone(&other.max_in_flight),
            global_in_flight: Arc::clone(&other.global_in_flight),
            max_global_in_flight: Arc::clone(&other.max_global_in_flight),
        }
    }

    pub fn load_call_count(&self) -> usize {
        self.load_call_count.load(Ordering::SeqCst)
    }

    pub fn diff_call_count(&self) -> usize {
        self.diff_call_count.load(Ordering::SeqCst)
    }

    pub fn commit_call_count(&self) -> usize {
        self.commit_call_count.load(Ordering::SeqCst)
    }

    pub fn abort_call_count(&self) -> usize {
        self.abort_call_count.load(Ordering::SeqCst)
    }

    /// Number of commit plus abort calls
    pub fn terminal_call_count(&self) -> usize {
        self.commit_call_count() + self.abort_call_count()
    }

    /// Get the ordered call log
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn max_global_in_flight(&self) -> usize {
        self.max_global_in_flight.load(Ordering::SeqCst)
    }

    fn fails_at(&self, stage: ReconcileStage) -> bool {
        self.failures.contains(&Failure::Transport(stage))
    }

    async fn enter(&self, op: &str, session_name: Option<&str>) {
        let local = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(local, Ordering::SeqCst);
        let global = self.global_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_global_in_flight.fetch_max(global, Ordering::SeqCst);

        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}", op, session_name.unwrap_or("-")));

        if let Some(delay) = self.op_delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.global_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ConfigSessionBackend for MockBackend {
    async fn load(&self, _template: &str, session_name: Option<&str>) -> Result<LoadResult> {
        if self.failures.contains(&Failure::Render) {
            return Err(Error::render("rendered template is empty"));
        }

        self.load_call_count.fetch_add(1, Ordering::SeqCst);
        self.enter("load", session_name).await;
        self.leave();

        if self.fails_at(ReconcileStage::Load) {
            return Err(Error::execution("netmiko.send_config", "connection reset"));
        }

        Ok(LoadResult {
            result: self.load_accepted,
            session_name: session_name.map(str::to_string),
            device_output: if self.load_accepted {
                "ip y".to_string()
            } else {
                "% Invalid input".to_string()
            },
            commands: vec!["ip y".to_string()],
        })
    }

    async fn diff(&self, session_name: Option<&str>) -> Result<String> {
        self.diff_call_count.fetch_add(1, Ordering::SeqCst);
        self.enter("diff", session_name).await;
        self.leave();

        if self.fails_at(ReconcileStage::Diff) {
            return Err(Error::diff("device reported failure"));
        }
        Ok(self.diff_output.clone())
    }

    async fn commit(&self, session_name: Option<&str>) -> Result<String> {
        self.commit_call_count.fetch_add(1, Ordering::SeqCst);
        self.enter("commit", session_name).await;
        self.leave();

        if self.fails_at(ReconcileStage::Commit) {
            return Err(Error::execution("netmiko.send_config", "commit timed out"));
        }
        Ok("committed".to_string())
    }

    async fn abort(&self, session_name: Option<&str>) -> Result<String> {
        self.abort_call_count.fetch_add(1, Ordering::SeqCst);
        self.enter("abort", session_name).await;
        self.leave();

        if self.fails_at(ReconcileStage::Abort) {
            return Err(Error::execution("netmiko.send_config", "abort timed out"));
        }
        Ok("aborted".to_string())
    }

    async fn running_config(&self) -> Result<RunningConfig> {
        Ok(RunningConfig::Text("hostname mock".to_string()))
    }

    fn vendor(&self) -> Vendor {
        self.vendor
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// A factory handing out MockBackends that share counters with a template
pub struct MockBackendFactory {
    template: MockBackend,
}

impl MockBackendFactory {
    pub fn new(template: &MockBackend) -> Self {
        Self {
            template: MockBackend::sharing_counters_with(template),
        }
    }
}

impl BackendFactory for MockBackendFactory {
    fn create(
        &self,
        _vendor: Vendor,
        _executor: Arc<dyn CommandExecutor>,
        _config: &BackendConfig,
    ) -> Result<Box<dyn ConfigSessionBackend>> {
        Ok(Box::new(MockBackend::sharing_counters_with(&self.template)))
    }
}

/// An executor that never expects to be called
pub struct UnusedExecutor;

#[async_trait::async_trait]
impl CommandExecutor for UnusedExecutor {
    async fn execute(&self, call: &ExecutorCall) -> Result<Value> {
        Err(Error::execution(&call.operation, "no transport in tests"))
    }
}
