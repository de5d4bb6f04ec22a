// # netconverge-core
//
// Core library for diff-based network configuration convergence.
//
// ## Architecture Overview
//
// This library provides the vendor-neutral half of the system:
// - **CommandExecutor**: Trait for the transport collaborator that runs device operations
// - **ConfigSessionBackend**: Trait for vendor candidate-session primitives (load/diff/commit/abort)
// - **SessionDiffEngine**: Per-vendor comparison of running and session configuration
// - **ConfigReconciler**: State machine that converges one device per pass
// - **BackendRegistry**: Explicit vendor-keyed registry of backend factories
// - **Monitor** / **report**: Polling and running-configuration reporting over the same executor
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Vendor backends live in their own crates
// 2. **Explicit Selection**: Backends are chosen from device metadata, never probed
// 3. **Session Closure**: Every opened session ends with exactly one commit or abort
// 4. **Library-First**: Run mode and executors are injected, nothing is global

pub mod config;
pub mod diff;
pub mod error;
pub mod monitor;
pub mod reconciler;
pub mod registry;
pub mod report;
pub mod session;
pub mod traits;
pub mod types;

// Re-export core types for convenience
pub use config::{BackendConfig, JunosLoadOptions, NetConvergeConfig, ReconcilerConfig, RunOptions};
pub use diff::{DiffStrategy, SessionDiffEngine};
pub use error::{Error, Result};
pub use monitor::{Monitor, MonitorConfig, MonitorEvent, MonitoredCall};
pub use reconciler::{
    ConfigReconciler, FleetJob, ReconcileEvent, ReconcileRequest, reconcile_fleet,
};
pub use registry::BackendRegistry;
pub use session::{ConfigSession, SessionStatus, TerminalAction};
pub use traits::{BackendFactory, CommandExecutor, ConfigSessionBackend, ExecutorCall, LoadResult};
pub use types::{DeviceMetadata, Outcome, ReconcileResult, ReconcileStage, RunningConfig, Vendor};
