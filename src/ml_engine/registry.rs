//! Process-wide model registry.
//!
//! Both classifiers are loaded once, validated against the feature layout,
//! and shared read-only across request handlers and batch workers.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use serde::Serialize;
use tracing::{info, warn};

use super::bundle::ModelBundle;
use super::features::{projection_feature_names, FEATURE_NAMES};
use super::ModelError;
use crate::config::defaults::{CURRENT_FEATURE_COUNT, PROJECTION_FEATURE_COUNT};
use crate::config::ModelsConfig;

static MODELS: OnceLock<Arc<ModelRegistry>> = OnceLock::new();

/// Serializes first-time loading so concurrent callers share one load.
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Which of the two models a bundle serves as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    Current,
    Projection,
}

impl ModelRole {
    fn expected_width(self) -> usize {
        match self {
            ModelRole::Current => CURRENT_FEATURE_COUNT,
            ModelRole::Projection => PROJECTION_FEATURE_COUNT,
        }
    }

    fn expected_names(self) -> Vec<&'static str> {
        match self {
            ModelRole::Current => FEATURE_NAMES.to_vec(),
            ModelRole::Projection => projection_feature_names(),
        }
    }
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelRole::Current => write!(f, "current"),
            ModelRole::Projection => write!(f, "projection"),
        }
    }
}

/// Description of a loaded model, as reported by the models endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub role: ModelRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub num_trees: usize,
    pub num_features: usize,
    pub num_classes: usize,
    pub labels: Vec<f64>,
    pub features: Vec<String>,
    pub best_params: serde_json::Value,
}

/// The current-state and one-year projection classifiers.
#[derive(Debug)]
pub struct ModelRegistry {
    current: ModelBundle,
    projection: ModelBundle,
    current_path: Option<PathBuf>,
    projection_path: Option<PathBuf>,
}

impl ModelRegistry {
    /// Pair two bundles, checking each against its expected input width.
    pub fn new(current: ModelBundle, projection: ModelBundle) -> Result<Self, ModelError> {
        check_layout(ModelRole::Current, &current)?;
        check_layout(ModelRole::Projection, &projection)?;
        Ok(Self {
            current,
            projection,
            current_path: None,
            projection_path: None,
        })
    }

    /// Load both bundles from the configured paths.
    pub fn load(config: &ModelsConfig) -> Result<Self, ModelError> {
        let current = ModelBundle::load(&config.current_path)?;
        let projection = ModelBundle::load(&config.projection_path)?;
        let mut registry = Self::new(current, projection)?;
        registry.current_path = Some(config.current_path.clone());
        registry.projection_path = Some(config.projection_path.clone());

        info!(
            current = %config.current_path.display(),
            projection = %config.projection_path.display(),
            "Models loaded"
        );
        Ok(registry)
    }

    pub fn current(&self) -> &ModelBundle {
        &self.current
    }

    pub fn projection(&self) -> &ModelBundle {
        &self.projection
    }

    pub fn describe(&self) -> Vec<ModelInfo> {
        vec![
            info_for(ModelRole::Current, &self.current, self.current_path.as_deref()),
            info_for(ModelRole::Projection, &self.projection, self.projection_path.as_deref()),
        ]
    }
}

fn check_layout(role: ModelRole, bundle: &ModelBundle) -> Result<(), ModelError> {
    let expected = role.expected_width();
    if bundle.num_features() != expected {
        return Err(ModelError::FeatureWidth {
            expected,
            actual: bundle.num_features(),
        });
    }

    let names = &bundle.metadata().features;
    if !names.is_empty() && !names.iter().map(String::as_str).eq(role.expected_names()) {
        warn!(
            model = %role,
            trained_on = ?names,
            "Model feature names differ from the derived feature layout"
        );
    }
    Ok(())
}

fn info_for(role: ModelRole, bundle: &ModelBundle, path: Option<&Path>) -> ModelInfo {
    ModelInfo {
        role,
        path: path.map(Path::to_path_buf),
        num_trees: bundle.num_trees(),
        num_features: bundle.num_features(),
        num_classes: bundle.num_classes(),
        labels: bundle.labels(),
        features: bundle.metadata().features.clone(),
        best_params: bundle.metadata().best_params.clone(),
    }
}

// ============================================================================
// Global access
// ============================================================================

/// Load the models into the process-wide registry.
///
/// The first successful call loads from `config`; later calls return the
/// already-loaded registry. A failed load leaves the registry empty.
pub fn init(config: &ModelsConfig) -> Result<Arc<ModelRegistry>, ModelError> {
    if let Some(models) = MODELS.get() {
        return Ok(Arc::clone(models));
    }

    let _guard = INIT_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(models) = MODELS.get() {
        return Ok(Arc::clone(models));
    }

    let registry = Arc::new(ModelRegistry::load(config)?);
    Ok(Arc::clone(MODELS.get_or_init(|| registry)))
}

/// The loaded registry, if [`init`] has succeeded.
pub fn get() -> Option<Arc<ModelRegistry>> {
    MODELS.get().cloned()
}

pub fn is_loaded() -> bool {
    MODELS.get().is_some()
}
