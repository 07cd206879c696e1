//! API route handlers
//!
//! Request handling logic for all endpoints:
//! - Raw assessment-batch prediction
//! - Patient-record prediction with summary
//! - Loaded model metadata
//! - Liveness

mod health;
mod models;
mod patients;
mod predict;

pub use health::*;
pub use models::*;
pub use patients::*;
pub use predict::*;

use std::sync::Arc;
use std::time::Instant;

use crate::ml_engine::ModelRegistry;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Read-only current/projection models
    pub models: Arc<ModelRegistry>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(models: Arc<ModelRegistry>) -> Self {
        Self {
            models,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Run a CPU-bound closure off the async runtime.
///
/// A panicking or cancelled task is reported as `Err` with its message.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| format!("prediction task failed: {e}"))
}
