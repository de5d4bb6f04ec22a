//! Vendor-keyed backend registry
//!
//! The registry maps each [`Vendor`] to the factory that builds its session
//! backend. Selection is explicit: the caller supplies device metadata, the
//! vendor is derived from it by [`Vendor::from_metadata`], and the matching
//! factory is looked up. Nothing registers itself implicitly and a vendor
//! has at most one factory.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use netconverge_core::registry::BackendRegistry;
//!
//! let registry = BackendRegistry::new();
//! netconverge_backend_netmiko::register(&registry);
//! netconverge_backend_junos::register(&registry);
//!
//! let backend = registry.create_backend(&device, executor, &config.backend)?;
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::traits::{BackendFactory, CommandExecutor, ConfigSessionBackend};
use crate::types::{DeviceMetadata, Vendor};

/// Registry of backend factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct BackendRegistry {
    backends: RwLock<HashMap<Vendor, Arc<dyn BackendFactory>>>,
}

impl BackendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for a vendor
    ///
    /// Registering a vendor twice replaces the earlier factory.
    pub fn register_backend(&self, vendor: Vendor, factory: Box<dyn BackendFactory>) {
        let mut backends = self.backends.write().unwrap_or_else(|e| e.into_inner());
        if backends.insert(vendor, Arc::from(factory)).is_some() {
            warn!("Replacing registered backend factory for {}", vendor);
        }
    }

    /// Create the backend for a device
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ConfigSessionBackend>)`: backend bound to `executor`
    /// - `Err(Error)`: unknown proxy type, unregistered vendor, invalid
    ///   config, or factory failure
    pub fn create_backend(
        &self,
        device: &DeviceMetadata,
        executor: Arc<dyn CommandExecutor>,
        config: &BackendConfig,
    ) -> Result<Box<dyn ConfigSessionBackend>> {
        let vendor = device.vendor()?;
        config.validate()?;

        let factory = {
            let backends = self.backends.read().unwrap_or_else(|e| e.into_inner());
            backends.get(&vendor).cloned().ok_or_else(|| {
                Error::unsupported_vendor(format!("no backend registered for {}", vendor))
            })?
        };

        debug!("Creating {} backend", vendor);
        factory.create(vendor, executor, config)
    }

    /// List all registered vendors
    pub fn list_backends(&self) -> Vec<Vendor> {
        let backends = self.backends.read().unwrap_or_else(|e| e.into_inner());
        let mut vendors: Vec<Vendor> = backends.keys().copied().collect();
        vendors.sort();
        vendors
    }

    /// Check if a vendor has a registered backend
    pub fn has_backend(&self, vendor: Vendor) -> bool {
        let backends = self.backends.read().unwrap_or_else(|e| e.into_inner());
        backends.contains_key(&vendor)
    }
}
