//! System-wide default constants.
//!
//! Inference constants here are part of the trained models' contract and are
//! deliberately not exposed through `neuraltrack.toml`.

// ============================================================================
// Feature Derivation
// ============================================================================

/// Days per year used to annualise the score change between two visits.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Number of features fed to the current-state classifier.
pub const CURRENT_FEATURE_COUNT: usize = 18;

/// Number of features fed to the projection classifier (current + gap).
pub const PROJECTION_FEATURE_COUNT: usize = CURRENT_FEATURE_COUNT + 1;

// ============================================================================
// Inference
// ============================================================================

/// Projection horizon appended to the final visit's features (days).
pub const PROJECTION_GAP_DAYS: f64 = 365.0;

/// Message returned when a request carries no assessments.
pub const EMPTY_INPUT_MESSAGE: &str = "No assessment data provided";

// ============================================================================
// Server
// ============================================================================

/// Default HTTP bind address.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";

/// Default request body limit (bytes). 1 MiB holds thousands of visits.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

// ============================================================================
// Model Bundles
// ============================================================================

/// Default location of the current-state model bundle.
pub const DEFAULT_CURRENT_MODEL_PATH: &str = "ml_models/current_model/moca_current_model.json";

/// Default location of the one-year projection model bundle.
pub const DEFAULT_PROJECTION_MODEL_PATH: &str =
    "ml_models/future_model/moca_projection_model.json";

// ============================================================================
// Patient Summary
// ============================================================================

/// Confidence below this is labelled "Moderate".
pub const CONFIDENCE_MODERATE_BELOW: f64 = 0.75;

/// Confidence below this (and at or above moderate) is labelled "High".
pub const CONFIDENCE_HIGH_BELOW: f64 = 0.85;

/// CDR at or above this value raises a critical alert.
pub const CRITICAL_CDR: f64 = 1.0;
