// # Config Session Backend Trait
//
// Defines the vendor-abstracted configuration session protocol.
//
// ## Implementations
//
// - Arista EOS, Cisco NX-OS, generic netmiko: `netconverge-backend-netmiko` crate
// - Junos: `netconverge-backend-junos` crate
//
// ## Usage
//
// ```rust,ignore
// let loaded = backend.load("templates/ntp.j2", None).await?;
// let session = loaded.session_name.as_deref();
// let diff = backend.diff(session).await?;
// if diff.is_empty() {
//     backend.abort(session).await?;
// } else {
//     backend.commit(session).await?;
// }
// ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::BackendConfig;
use crate::traits::CommandExecutor;
use crate::types::{RunningConfig, Vendor};

/// Result of loading a template into a candidate session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    /// `false` when the device flagged the candidate with its error marker
    pub result: bool,
    /// Session the commands were loaded into (`None` without session semantics)
    pub session_name: Option<String>,
    /// Raw device output of the load
    pub device_output: String,
    /// Rendered configuration lines, in submission order
    pub commands: Vec<String>,
}

/// Trait for vendor configuration session backends
///
/// A backend translates the four session primitives into executor calls for
/// one vendor family. It never decides whether to commit; that belongs to
/// [`ConfigReconciler`](crate::reconciler::ConfigReconciler).
///
/// # Contract
///
/// - `load` must fail with [`Error::Render`](crate::Error::Render) before any
///   session-open call when the template renders to zero lines
/// - device error markers in load output are reported through
///   [`LoadResult::result`], never raised
/// - every transport failure is returned as an error, never retried here
///
/// Backends without named sessions ignore the `session_name` arguments.
#[async_trait]
pub trait ConfigSessionBackend: Send + Sync {
    /// Render `template` and load it into a candidate session
    ///
    /// A missing or empty `session_name` is replaced by a generated one.
    async fn load(
        &self,
        template: &str,
        session_name: Option<&str>,
    ) -> Result<LoadResult, crate::Error>;

    /// Diff the running configuration against the candidate session
    ///
    /// An empty string means no difference.
    async fn diff(&self, session_name: Option<&str>) -> Result<String, crate::Error>;

    /// Commit the candidate session, returning device output
    async fn commit(&self, session_name: Option<&str>) -> Result<String, crate::Error>;

    /// Discard the candidate session, returning device output
    async fn abort(&self, session_name: Option<&str>) -> Result<String, crate::Error>;

    /// Fetch the device's active configuration
    async fn running_config(&self) -> Result<RunningConfig, crate::Error>;

    /// Vendor family handled by this backend
    fn vendor(&self) -> Vendor;

    /// Whether the backend works with named sessions
    fn supports_sessions(&self) -> bool {
        self.vendor().has_named_sessions()
    }

    /// Backend name (for logging)
    fn backend_name(&self) -> &'static str;
}

/// Helper trait for constructing backends for a vendor
pub trait BackendFactory: Send + Sync {
    /// Create a backend bound to `executor`
    fn create(
        &self,
        vendor: Vendor,
        executor: Arc<dyn CommandExecutor>,
        config: &BackendConfig,
    ) -> Result<Box<dyn ConfigSessionBackend>, crate::Error>;
}
