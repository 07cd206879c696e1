//! Persisted classifier bundles.
//!
//! A bundle couples a trained tree ensemble with the metadata written by the
//! training pipeline: the feature names it was fitted on, the chosen
//! hyper-parameters, and the class-index to CDR-label mapping.
//!
//! Bundles are JSON, optionally zstd-compressed. Compression is detected from
//! the frame magic, so `.json` and `.json.zst` files load through the same path.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::forest::{Forest, XgbDocument};
use super::ModelError;

/// zstd frame magic number (little-endian 0xFD2FB528).
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

// ============================================================================
// Classifier seam
// ============================================================================

/// Multi-class probability model over a fixed-width feature row.
pub trait Classifier: Send + Sync + fmt::Debug {
    fn num_trees(&self) -> usize;

    fn num_features(&self) -> usize;

    fn num_classes(&self) -> usize;

    /// Class probabilities for one row, in class-index order.
    fn predict_proba(&self, features: &[f64]) -> Vec<f64>;

    /// Index of the most probable class. Ties resolve to the lowest index.
    fn predict(&self, features: &[f64]) -> usize {
        argmax(&self.predict_proba(features)).0
    }
}

/// Returns `(index, value)` of the first maximum. An empty slice gives `(0, NaN)`.
pub(crate) fn argmax(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NAN), |(best_i, best), (i, v)| {
            if best.is_nan() || v > best {
                (i, v)
            } else {
                (best_i, best)
            }
        })
}

// ============================================================================
// Label map
// ============================================================================

/// Class index to CDR label, as written by the training script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevLabelMap(BTreeMap<usize, f64>);

impl RevLabelMap {
    /// Parse `{"0": "0.0", "1": 0.5, ...}`. Values may be numbers or numeric strings.
    pub fn from_json(map: &serde_json::Map<String, Value>) -> Result<Self, ModelError> {
        let mut out = BTreeMap::new();
        for (key, value) in map {
            let invalid = || ModelError::InvalidLabel {
                key: key.clone(),
                value: value.to_string(),
            };
            let index: usize = key.trim().parse().map_err(|_| invalid())?;
            let label = match value {
                Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
                Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid())?,
                _ => return Err(invalid()),
            };
            out.insert(index, label);
        }
        Ok(Self(out))
    }

    /// Identity-style map from explicit labels: class `i` -> `labels[i]`.
    pub fn from_labels(labels: &[f64]) -> Self {
        Self(labels.iter().copied().enumerate().collect())
    }

    pub fn label(&self, class_index: usize) -> Result<f64, ModelError> {
        self.0
            .get(&class_index)
            .copied()
            .ok_or(ModelError::UnknownLabel(class_index))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Labels in class-index order.
    pub fn labels(&self) -> Vec<f64> {
        self.0.values().copied().collect()
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// Training metadata carried alongside the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub best_params: Value,
    #[serde(default)]
    pub label_map: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawBundle {
    model: Value,
    #[serde(flatten)]
    metadata: BundleMetadata,
    #[serde(default)]
    rev_label_map: serde_json::Map<String, Value>,
}

/// One model decision: class index, decoded CDR label and its probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassPrediction {
    pub class_index: usize,
    pub label: f64,
    /// Maximum class probability
    pub confidence: f64,
}

/// A loaded classifier with its label mapping.
#[derive(Debug)]
pub struct ModelBundle {
    classifier: Box<dyn Classifier>,
    metadata: BundleMetadata,
    rev_label_map: RevLabelMap,
}

impl ModelBundle {
    /// Read a bundle from disk.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bundle = Self::from_slice(&bytes)?;
        debug!(
            path = %path.display(),
            trees = bundle.num_trees(),
            features = bundle.num_features(),
            classes = bundle.num_classes(),
            "Model bundle loaded"
        );
        Ok(bundle)
    }

    /// Decode a bundle from raw (possibly zstd-compressed) bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let decompressed;
        let json = if bytes.starts_with(&ZSTD_MAGIC) {
            decompressed = zstd::decode_all(bytes).map_err(ModelError::Decompress)?;
            decompressed.as_slice()
        } else {
            bytes
        };

        let raw: RawBundle = serde_json::from_slice(json)?;

        // Some exporters embed the booster as a JSON string.
        let model = match raw.model {
            Value::String(s) => serde_json::from_str(&s)?,
            other => other,
        };
        let doc: XgbDocument = serde_json::from_value(model)?;
        let forest = Forest::from_xgboost(doc)?;

        let rev_label_map = RevLabelMap::from_json(&raw.rev_label_map)?;
        Self::from_parts(Box::new(forest), raw.metadata, rev_label_map)
    }

    /// Assemble a bundle from an in-memory classifier.
    pub fn from_parts(
        classifier: Box<dyn Classifier>,
        metadata: BundleMetadata,
        rev_label_map: RevLabelMap,
    ) -> Result<Self, ModelError> {
        if let Some(missing) =
            (0..classifier.num_classes()).find(|i| rev_label_map.label(*i).is_err())
        {
            return Err(ModelError::UnknownLabel(missing));
        }
        Ok(Self {
            classifier,
            metadata,
            rev_label_map,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.classifier.num_trees()
    }

    pub fn num_features(&self) -> usize {
        self.classifier.num_features()
    }

    pub fn num_classes(&self) -> usize {
        self.classifier.num_classes()
    }

    pub fn metadata(&self) -> &BundleMetadata {
        &self.metadata
    }

    pub fn labels(&self) -> Vec<f64> {
        self.rev_label_map.labels()
    }

    /// Classify one row and decode its CDR label.
    pub fn predict(&self, features: &[f64]) -> Result<ClassPrediction, ModelError> {
        if features.len() != self.num_features() {
            return Err(ModelError::FeatureWidth {
                expected: self.num_features(),
                actual: features.len(),
            });
        }
        let probs = self.classifier.predict_proba(features);
        let (class_index, confidence) = argmax(&probs);
        let label = self.rev_label_map.label(class_index)?;
        Ok(ClassPrediction {
            class_index,
            label,
            confidence,
        })
    }
}
