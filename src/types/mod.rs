//! Shared data types for the NeuralTrack inference service.

pub mod assessment;
pub mod patient;
pub mod prediction;

pub use assessment::{assessments_from_value, moca_ranges, parse_assessments, Assessment, Subscores};
pub use patient::{
    CdrStatus, ConfidenceLabel, MocaTest, PatientPrediction, PatientRecord, PatientReport,
    PatientSummary,
};
pub use prediction::{ErrorPayload, PredictionResult};
