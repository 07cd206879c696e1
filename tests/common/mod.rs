//! Shared fixtures for integration tests: small stump-tree model bundles
//! written to a temp directory and loaded the way the service loads them.

#![allow(dead_code)]

use std::path::Path;

use neuraltrack::config::ModelsConfig;
use neuraltrack::ModelRegistry;
use serde_json::{json, Value};

/// Three-class bundle over `width` features that splits on the MoCA total
/// (column 1): >= 24 gives CDR 0.0, 18..24 gives 0.5, < 18 gives 1.0.
pub fn stump_bundle(width: usize) -> Value {
    let stump = |threshold: f32, left: f32, right: f32| {
        json!({
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "split_indices": [1, 0, 0],
            "split_conditions": [threshold, left, right],
            "default_left": [1, 0, 0],
            "split_type": [0, 0, 0]
        })
    };
    json!({
        "model": {
            "learner": {
                "learner_model_param": {
                    "base_score": "5E-1",
                    "num_class": "3",
                    "num_feature": width.to_string()
                },
                "objective": { "name": "multi:softprob" },
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "trees": [
                            stump(24.0, -1.0, 2.0),
                            stump(24.0, 1.0, -1.0),
                            stump(18.0, 2.0, -1.0)
                        ],
                        "tree_info": [0, 1, 2]
                    }
                }
            }
        },
        "features": [],
        "best_params": { "max_depth": 1, "learning_rate": 0.1 },
        "label_map": { "0.0": 0, "0.5": 1, "1.0": 2 },
        "rev_label_map": { "0": "0.0", "1": "0.5", "2": "1.0" }
    })
}

/// Projection bundle: the 19-column stump model plus one tree in the CDR 1.0
/// group splitting on the projection gap (column 18) at 300 days. A 365-day
/// gap adds 5.0 to that class, so every projection comes out as CDR 1.0.
pub fn projection_bundle() -> Value {
    let mut bundle = stump_bundle(19);
    let model = &mut bundle["model"]["learner"]["gradient_booster"]["model"];
    model["trees"].as_array_mut().unwrap().push(json!({
        "left_children": [1, -1, -1],
        "right_children": [2, -1, -1],
        "split_indices": [18, 0, 0],
        "split_conditions": [300.0, 0.0, 5.0],
        "default_left": [1, 0, 0],
        "split_type": [0, 0, 0]
    }));
    model["tree_info"].as_array_mut().unwrap().push(json!(2));
    bundle
}

/// Write both bundles into `dir` and return the matching config.
pub fn write_models(dir: &Path) -> ModelsConfig {
    let current_path = dir.join("moca_current_model.json");
    let projection_path = dir.join("moca_projection_model.json.zst");

    std::fs::write(&current_path, serde_json::to_vec(&stump_bundle(18)).unwrap()).unwrap();
    let projection = serde_json::to_vec(&projection_bundle()).unwrap();
    std::fs::write(
        &projection_path,
        zstd::encode_all(projection.as_slice(), 3).unwrap(),
    )
    .unwrap();

    ModelsConfig {
        current_path,
        projection_path,
    }
}

pub fn load_registry() -> ModelRegistry {
    let dir = tempfile::tempdir().unwrap();
    ModelRegistry::load(&write_models(dir.path())).unwrap()
}

pub fn subscores() -> Value {
    json!({
        "visuospatialExec": 4, "naming": 3, "attention": 5, "language": 2,
        "abstraction": 2, "memory_recall": 3, "orientation": 6
    })
}

pub fn assessment(date: &str, total: f64, days: f64, age: f64) -> Value {
    json!({
        "date": date,
        "totalScore": total,
        "days_to_visit": days,
        "age": age,
        "subscores": subscores()
    })
}
