//! Core traits for configuration sessions
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`CommandExecutor`]: Run named operations against one device
//! - [`ConfigSessionBackend`]: Vendor-specific candidate session primitives

pub mod command_executor;
pub mod config_backend;

pub use command_executor::{CommandExecutor, ExecutorCall, ops, output_text};
pub use config_backend::{BackendFactory, ConfigSessionBackend, LoadResult};
