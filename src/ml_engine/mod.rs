//! Cognitive-decline inference engine.
//!
//! Turns a patient's chronological MoCA visits into per-visit CDR
//! predictions from two gradient-boosted classifiers: a current-state model
//! applied to every visit and a one-year projection model applied to the
//! latest visit.
//!
//! ## Architecture
//! - `features`: longitudinal feature derivation (18 columns per visit)
//! - `forest`: tree-ensemble evaluation of XGBoost JSON models
//! - `bundle`: persisted model bundles and class-label decoding
//! - `registry`: process-wide current/projection model pair
//! - `predictor`: batch orchestration and result assembly
//! - `timeline`: patient record to dated assessment sequence
//! - `summary`: latest-visit summary, status and confidence band

pub mod bundle;
mod error;
pub mod features;
pub mod forest;
pub mod predictor;
pub mod registry;
pub mod summary;
pub mod timeline;

// Re-export public types
pub use bundle::{BundleMetadata, ClassPrediction, Classifier, ModelBundle, RevLabelMap};
pub use error::{ModelError, PredictionError};
pub use features::{derive_features, FeatureVector, LongitudinalState, VisitFeatures, FEATURE_NAMES};
pub use predictor::{predict_payload, run_prediction};
pub use registry::{ModelInfo, ModelRegistry, ModelRole};
pub use summary::{predict_patient, summarize};
pub use timeline::{prepare, PreparedTimeline};
