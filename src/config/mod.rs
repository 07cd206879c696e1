//! Service Configuration Module
//!
//! Per-deployment settings loaded from TOML: bind address, model bundle
//! locations and log format.
//!
//! ## Loading Order
//!
//! 1. `NEURALTRACK_CONFIG` environment variable (path to TOML file)
//! 2. `neuraltrack.toml` in the current working directory
//! 3. Built-in defaults
//!
//! `NEURALTRACK_SERVER_ADDR`, `NEURALTRACK_CURRENT_MODEL` and
//! `NEURALTRACK_PROJECTION_MODEL` override individual values afterwards; the
//! merged result is validated before use.
//!
//! ## Usage
//!
//! ```ignore
//! // In main():
//! config::init(ServiceConfig::load()?);
//!
//! // Anywhere in the codebase:
//! let addr = &config::get().server.addr;
//! ```

pub mod defaults;
mod service_config;
pub mod validation;

pub use service_config::*;

use std::sync::OnceLock;

/// Global service configuration, initialized once at startup.
static SERVICE_CONFIG: OnceLock<ServiceConfig> = OnceLock::new();

/// Initialize the global service configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: ServiceConfig) {
    if SERVICE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once - ignoring");
    }
}

/// Get a reference to the global service configuration.
///
/// Falls back to built-in defaults when `init()` was never called.
pub fn get() -> &'static ServiceConfig {
    SERVICE_CONFIG.get_or_init(ServiceConfig::default)
}
