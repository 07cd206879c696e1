//! Gradient-boosted tree ensemble inference.
//!
//! Evaluates classifiers exported with XGBoost's JSON model format
//! (`Booster.save_model("model.json")`). Only the pieces needed for
//! prediction are read: per-tree node arrays, the tree-to-class assignment,
//! the base score and the objective.
//!
//! Arithmetic follows the exporting library: inputs are cast to `f32`,
//! leaf values are accumulated in `f32` in tree order, and the softmax
//! normalises with an `f64` running sum.

use serde::Deserialize;

use super::bundle::Classifier;
use super::ModelError;

// ============================================================================
// Serialized form
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct XgbDocument {
    learner: XgbLearner,
}

#[derive(Debug, Deserialize)]
struct XgbLearner {
    learner_model_param: XgbModelParam,
    gradient_booster: XgbGradientBooster,
    objective: XgbObjective,
}

#[derive(Debug, Deserialize)]
struct XgbModelParam {
    #[serde(default = "default_base_score")]
    base_score: String,
    #[serde(default)]
    num_class: String,
    #[serde(default)]
    num_feature: String,
}

fn default_base_score() -> String {
    "5E-1".to_string()
}

#[derive(Debug, Deserialize)]
struct XgbObjective {
    name: String,
}

#[derive(Debug, Deserialize)]
struct XgbGradientBooster {
    name: String,
    #[serde(default)]
    model: Option<XgbGbtreeModel>,
}

#[derive(Debug, Deserialize)]
struct XgbGbtreeModel {
    trees: Vec<XgbTree>,
    tree_info: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct XgbTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<u32>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<u8>,
}

/// Older exports write `default_left` as 0/1, newer ones as booleans.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

// ============================================================================
// In-memory model
// ============================================================================

/// Output transform applied to the summed margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// `multi:softprob` / `multi:softmax`: one margin per class, softmax.
    Softmax,
    /// `binary:logistic`: one margin, sigmoid, reported as `[1 - p, p]`.
    Logistic,
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    left: i32,
    right: i32,
    split_index: usize,
    /// Split threshold, or the leaf value when `left == -1`.
    value: f32,
    default_left: bool,
}

/// One regression tree stored as a flat node array, root at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_xgb(tree: XgbTree, tree_id: usize) -> Result<Self, ModelError> {
        let n = tree.left_children.len();
        if n == 0 {
            return Err(ModelError::InvalidModel(format!("tree {tree_id} has no nodes")));
        }
        if tree.right_children.len() != n
            || tree.split_indices.len() != n
            || tree.split_conditions.len() != n
            || tree.default_left.len() != n
        {
            return Err(ModelError::InvalidModel(format!(
                "tree {tree_id} has node arrays of different lengths"
            )));
        }
        if tree.split_type.iter().any(|t| *t != 0) {
            return Err(ModelError::InvalidModel(format!(
                "tree {tree_id} uses categorical splits, which are not supported"
            )));
        }

        let nodes = (0..n)
            .map(|i| {
                let (left, right) = (tree.left_children[i], tree.right_children[i]);
                // Children are stored after their parent; anything else is a cycle.
                let valid = |c: i32| c == -1 || (c > 0 && (c as usize) > i && (c as usize) < n);
                if !valid(left) || !valid(right) || (left == -1) != (right == -1) {
                    return Err(ModelError::InvalidModel(format!(
                        "tree {tree_id} node {i} has invalid children ({left}, {right})"
                    )));
                }
                Ok(Node {
                    left,
                    right,
                    split_index: tree.split_indices[i] as usize,
                    value: tree.split_conditions[i],
                    default_left: tree.default_left[i].is_set(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { nodes })
    }

    /// Build a single-split tree (`x[feature] < threshold`). Missing values go left.
    pub fn stump(feature: usize, threshold: f32, left_value: f32, right_value: f32) -> Self {
        Self {
            nodes: vec![
                Node { left: 1, right: 2, split_index: feature, value: threshold, default_left: true },
                Node { left: -1, right: -1, split_index: 0, value: left_value, default_left: false },
                Node { left: -1, right: -1, split_index: 0, value: right_value, default_left: false },
            ],
        }
    }

    /// Build a tree that always returns `value`.
    pub fn leaf(value: f32) -> Self {
        Self {
            nodes: vec![Node { left: -1, right: -1, split_index: 0, value, default_left: false }],
        }
    }

    fn max_split_index(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter(|n| n.left != -1)
            .map(|n| n.split_index)
            .max()
    }

    /// Walk from the root to a leaf and return its value.
    ///
    /// NaN takes the default branch; otherwise `x < threshold` goes left.
    pub fn predict(&self, features: &[f32]) -> f32 {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            if node.left == -1 {
                return node.value;
            }
            let x = features[node.split_index];
            let next = if x.is_nan() {
                if node.default_left { node.left } else { node.right }
            } else if x < node.value {
                node.left
            } else {
                node.right
            };
            idx = next as usize;
        }
    }
}

/// A boosted ensemble of trees, each contributing to one output group.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<Tree>,
    tree_groups: Vec<usize>,
    num_groups: usize,
    num_features: usize,
    /// Initial margin per output group.
    base_margin: Vec<f32>,
    objective: Objective,
}

impl Forest {
    /// Assemble a forest from already-built trees.
    pub fn new(
        trees: Vec<Tree>,
        tree_groups: Vec<usize>,
        num_features: usize,
        base_margin: Vec<f32>,
        objective: Objective,
    ) -> Result<Self, ModelError> {
        let num_groups = match objective {
            Objective::Softmax => base_margin.len(),
            Objective::Logistic => 1,
        };
        if num_groups == 0 || base_margin.len() != num_groups {
            return Err(ModelError::InvalidModel(format!(
                "expected {num_groups} base margins, got {}",
                base_margin.len()
            )));
        }
        if objective == Objective::Softmax && num_groups < 2 {
            return Err(ModelError::InvalidModel(
                "softmax objective needs at least two classes".to_string(),
            ));
        }
        if trees.len() != tree_groups.len() {
            return Err(ModelError::InvalidModel(format!(
                "{} trees but {} tree_info entries",
                trees.len(),
                tree_groups.len()
            )));
        }
        if let Some(g) = tree_groups.iter().find(|g| **g >= num_groups) {
            return Err(ModelError::InvalidModel(format!(
                "tree assigned to group {g}, model has {num_groups}"
            )));
        }
        if let Some(max) = trees.iter().filter_map(Tree::max_split_index).max() {
            if max >= num_features {
                return Err(ModelError::InvalidModel(format!(
                    "tree splits on feature {max}, model declares {num_features} features"
                )));
            }
        }

        Ok(Self {
            trees,
            tree_groups,
            num_groups,
            num_features,
            base_margin,
            objective,
        })
    }

    /// Convert a parsed XGBoost JSON document.
    pub(crate) fn from_xgboost(doc: XgbDocument) -> Result<Self, ModelError> {
        let learner = doc.learner;

        let objective = match learner.objective.name.as_str() {
            "multi:softprob" | "multi:softmax" => Objective::Softmax,
            "binary:logistic" => Objective::Logistic,
            other => {
                return Err(ModelError::InvalidModel(format!(
                    "unsupported objective '{other}'"
                )))
            }
        };

        let param = &learner.learner_model_param;
        let num_class = parse_count(&param.num_class, "num_class")?;
        let num_features = parse_count(&param.num_feature, "num_feature")?;
        let base_scores = parse_base_score(&param.base_score)?;

        let base_margin = match objective {
            Objective::Softmax => {
                if num_class < 2 {
                    return Err(ModelError::InvalidModel(format!(
                        "softmax objective with num_class = {num_class}"
                    )));
                }
                match base_scores.as_slice() {
                    [single] => vec![*single; num_class],
                    many if many.len() == num_class => many.to_vec(),
                    many => {
                        return Err(ModelError::InvalidModel(format!(
                            "{} base scores for {num_class} classes",
                            many.len()
                        )))
                    }
                }
            }
            Objective::Logistic => {
                let p = base_scores.first().copied().unwrap_or(0.5);
                vec![logit(p)]
            }
        };

        if learner.gradient_booster.name != "gbtree" {
            return Err(ModelError::InvalidModel(format!(
                "unsupported booster '{}'",
                learner.gradient_booster.name
            )));
        }
        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| ModelError::InvalidModel("gbtree booster has no model".to_string()))?;

        let trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| Tree::from_xgb(t, i))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(trees, model.tree_info, num_features, base_margin, objective)
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Summed margins per output group.
    pub fn margins(&self, features: &[f64]) -> Vec<f32> {
        let x: Vec<f32> = features.iter().map(|v| *v as f32).collect();
        let mut margins = self.base_margin.clone();
        for (tree, group) in self.trees.iter().zip(&self.tree_groups) {
            margins[*group] += tree.predict(&x);
        }
        margins
    }
}

impl Classifier for Forest {
    fn num_trees(&self) -> usize {
        self.trees.len()
    }

    fn num_features(&self) -> usize {
        self.num_features
    }

    fn num_classes(&self) -> usize {
        match self.objective {
            Objective::Softmax => self.num_groups,
            Objective::Logistic => 2,
        }
    }

    fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let margins = self.margins(features);
        let probs = match self.objective {
            Objective::Softmax => softmax(&margins),
            Objective::Logistic => {
                let p = sigmoid(margins[0]);
                vec![1.0 - p, p]
            }
        };
        probs.into_iter().map(f64::from).collect()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn softmax(margins: &[f32]) -> Vec<f32> {
    let wmax = margins.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = margins.iter().map(|m| (m - wmax).exp()).collect();
    let wsum: f64 = exps.iter().map(|e| f64::from(*e)).sum();
    exps.iter().map(|e| e / wsum as f32).collect()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn logit(p: f32) -> f32 {
    (p / (1.0 - p)).ln()
}

fn parse_count(raw: &str, name: &str) -> Result<usize, ModelError> {
    if raw.is_empty() {
        return Ok(0);
    }
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ModelError::InvalidModel(format!("{name} '{raw}' is not an integer")))
}

/// Accepts a scalar (`"5E-1"`) or a bracketed vector (`"[1E-1,2E-1]"`).
fn parse_base_score(raw: &str) -> Result<Vec<f32>, ModelError> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<f32>()
                .map_err(|_| ModelError::InvalidModel(format!("base_score '{raw}' is not numeric")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Three-class model over two features: one stump per class.
    fn three_class_doc() -> serde_json::Value {
        let stump = |feature: u32, threshold: f32, left: f32, right: f32| {
            json!({
                "left_children": [1, -1, -1],
                "right_children": [2, -1, -1],
                "split_indices": [feature, 0, 0],
                "split_conditions": [threshold, left, right],
                "default_left": [1, 0, 0],
                "split_type": [0, 0, 0],
                "base_weights": [0.0, left, right]
            })
        };
        json!({
            "learner": {
                "learner_model_param": { "base_score": "5E-1", "num_class": "3", "num_feature": "2" },
                "objective": { "name": "multi:softprob" },
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "trees": [
                            stump(0, 10.0, 2.0, -1.0),
                            stump(0, 10.0, -1.0, 2.0),
                            stump(1, 0.5, 0.0, 1.0)
                        ],
                        "tree_info": [0, 1, 2]
                    }
                }
            },
            "version": [2, 0, 3]
        })
    }

    fn forest() -> Forest {
        let doc: XgbDocument = serde_json::from_value(three_class_doc()).unwrap();
        Forest::from_xgboost(doc).unwrap()
    }

    #[test]
    fn test_parse_xgboost_json() {
        let f = forest();
        assert_eq!(f.num_trees(), 3);
        assert_eq!(f.num_classes(), 3);
        assert_eq!(f.num_features(), 2);
        assert_eq!(f.objective(), Objective::Softmax);
    }

    #[test]
    fn test_split_goes_left_when_strictly_less() {
        let tree = Tree::stump(0, 10.0, 1.0, 2.0);
        assert_eq!(tree.predict(&[9.99]), 1.0);
        assert_eq!(tree.predict(&[10.0]), 2.0);
        assert_eq!(tree.predict(&[f32::NAN]), 1.0);
    }

    #[test]
    fn test_margins_accumulate_per_class() {
        let f = forest();
        assert_eq!(f.margins(&[5.0, 1.0]), vec![2.5, -0.5, 1.5]);
        assert_eq!(f.margins(&[15.0, 0.0]), vec![-0.5, 2.5, 0.5]);
    }

    #[test]
    fn test_probabilities_sum_to_one_and_argmax() {
        let f = forest();
        let probs = f.predict_proba(&[5.0, 0.0]);
        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        assert_eq!(f.predict(&[5.0, 0.0]), 0);
        assert_eq!(f.predict(&[15.0, 0.0]), 1);
    }

    #[test]
    fn test_softmax_matches_closed_form() {
        let p = softmax(&[0.0, 0.0]);
        assert_eq!(p, vec![0.5, 0.5]);
        let p = softmax(&[1.0, 0.0, 0.0]);
        let e = 1.0_f32.exp();
        assert!((p[0] - e / (e + 2.0)).abs() < 1e-6);
    }

    #[test]
    fn test_logistic_objective() {
        let f = Forest::new(
            vec![Tree::stump(0, 0.0, -2.0, 2.0)],
            vec![0],
            1,
            vec![0.0],
            Objective::Logistic,
        )
        .unwrap();
        let probs = f.predict_proba(&[1.0]);
        assert_eq!(probs.len(), 2);
        assert!(probs[1] > 0.85);
        assert_eq!(f.predict(&[1.0]), 1);
        assert_eq!(f.predict(&[-1.0]), 0);
    }

    #[test]
    fn test_vector_base_score() {
        let mut doc = three_class_doc();
        doc["learner"]["learner_model_param"]["base_score"] = json!("[1E0,0E0,0E0]");
        let f = Forest::from_xgboost(serde_json::from_value(doc).unwrap()).unwrap();
        assert_eq!(f.margins(&[5.0, 1.0]), vec![3.0, -1.0, 1.0]);
    }

    #[test]
    fn test_boolean_default_left_accepted() {
        let mut doc = three_class_doc();
        doc["learner"]["gradient_booster"]["model"]["trees"][0]["default_left"] =
            json!([false, false, false]);
        let f = Forest::from_xgboost(serde_json::from_value(doc).unwrap()).unwrap();
        // NaN on feature 0 now goes right in tree 0 only.
        assert_eq!(f.margins(&[f64::NAN, 0.0]), vec![-0.5, -0.5, 0.5]);
    }

    #[test]
    fn test_unsupported_objective_rejected() {
        let mut doc = three_class_doc();
        doc["learner"]["objective"]["name"] = json!("reg:squarederror");
        let err = Forest::from_xgboost(serde_json::from_value(doc).unwrap()).unwrap_err();
        assert!(err.to_string().contains("unsupported objective"));
    }

    #[test]
    fn test_out_of_range_split_feature_rejected() {
        let mut doc = three_class_doc();
        doc["learner"]["learner_model_param"]["num_feature"] = json!("1");
        assert!(Forest::from_xgboost(serde_json::from_value(doc).unwrap()).is_err());
    }

    #[test]
    fn test_tree_info_mismatch_rejected() {
        let mut doc = three_class_doc();
        doc["learner"]["gradient_booster"]["model"]["tree_info"] = json!([0, 1]);
        assert!(Forest::from_xgboost(serde_json::from_value(doc).unwrap()).is_err());
    }

    #[test]
    fn test_invalid_child_index_rejected() {
        let mut doc = three_class_doc();
        doc["learner"]["gradient_booster"]["model"]["trees"][1]["left_children"] =
            json!([7, -1, -1]);
        assert!(Forest::from_xgboost(serde_json::from_value(doc).unwrap()).is_err());
    }

    #[test]
    fn test_cyclic_tree_rejected() {
        let mut doc = three_class_doc();
        let tree = &mut doc["learner"]["gradient_booster"]["model"]["trees"][0];
        tree["left_children"] = json!([1, 1, -1]);
        tree["right_children"] = json!([2, 2, -1]);

        let err = Forest::from_xgboost(serde_json::from_value(doc).unwrap()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidModel(m) if m.contains("node 1")));
    }

    #[test]
    fn test_back_edge_rejected() {
        let mut doc = three_class_doc();
        let tree = &mut doc["learner"]["gradient_booster"]["model"]["trees"][0];
        tree["left_children"] = json!([1, -1, 0]);
        tree["right_children"] = json!([2, -1, 1]);
        assert!(Forest::from_xgboost(serde_json::from_value(doc).unwrap()).is_err());
    }
}
