//! NeuralTrack: longitudinal MoCA inference
//!
//! Derives per-visit cognitive features from a patient's Montreal Cognitive
//! Assessment history and predicts Clinical Dementia Rating (CDR) with two
//! gradient-boosted classifiers.
//!
//! ## Architecture
//!
//! - **Types**: assessment payloads, patient records, prediction results
//! - **ML Engine**: feature derivation, tree-ensemble evaluation, orchestration
//! - **Config**: TOML service configuration with env overrides
//! - **API**: Axum HTTP surface

pub mod api;
pub mod config;
pub mod ml_engine;
pub mod types;

// Re-export service configuration
pub use config::ServiceConfig;

// Re-export commonly used types
pub use types::{
    Assessment, CdrStatus, ConfidenceLabel, ErrorPayload, PatientRecord, PatientReport,
    PatientSummary, PredictionResult, Subscores,
};

// Re-export ML Engine entry points
pub use ml_engine::{
    derive_features, predict_patient, predict_payload, run_prediction, ModelBundle, ModelError,
    ModelRegistry, PredictionError,
};
