//! Pre-trained model loading and inference.
//!
//! Models are exported from the training notebooks as JSON. A file holds
//! either a bare model (an object with a `kind` tag) or a bundle: an object
//! carrying the model under `model` / `estimator` / `pipeline` plus metadata
//! such as `sensor_cols` and `target_label_cols`.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// Keys a bundle may store its predictor under, in lookup order.
const PREDICTOR_KEYS: [&str; 3] = ["model", "estimator", "pipeline"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model has no predict capability (no 'model', 'estimator' or 'pipeline' entry)")]
    NoPredictor,

    #[error("model expects {expected} input features, got {got}")]
    InputWidth { expected: usize, got: usize },

    #[error("invalid model: {0}")]
    Invalid(String),

    #[error("estimators mix label and numeric outputs")]
    MixedOutputs,

    #[error("prediction value '{0}' is not numeric")]
    NotNumeric(String),
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// Raw output of one `predict` call for a single sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Labels(Vec<String>),
    Values(Vec<f64>),
}

impl Prediction {
    /// Each output rendered as text (`1.0` style for numbers).
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            Self::Labels(l) => l.clone(),
            Self::Values(v) => v.iter().map(|x| format!("{x:?}")).collect(),
        }
    }

    /// The whole prediction as one string, used for keyword matching.
    pub fn as_text(&self) -> String {
        self.to_strings().join(" ")
    }

    pub fn to_values(&self) -> Result<Vec<f64>, ModelError> {
        match self {
            Self::Values(v) => Ok(v.clone()),
            Self::Labels(l) => l
                .iter()
                .map(|s| {
                    s.trim()
                        .parse::<f64>()
                        .map_err(|_| ModelError::NotNumeric(s.clone()))
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Model representation
// ---------------------------------------------------------------------------

/// Standard-scaler preprocessing step: `(x - mean) / scale`.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn transform(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        if x.len() != self.mean.len() {
            return Err(ModelError::InputWidth {
                expected: self.mean.len(),
                got: x.len(),
            });
        }
        Ok(x.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| if *s == 0.0 { v - m } else { (v - m) / s })
            .collect())
    }
}

/// A fitted decision tree in flat array layout.  Node `i` is a leaf when
/// `children_left[i] == -1`; otherwise samples with
/// `x[feature[i]] <= threshold[i]` go left.
#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per node: class weights (classifier) or output vector (regressor).
    pub value: Vec<Vec<f64>>,
    /// Present for classifiers.
    #[serde(default)]
    pub classes: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    /// Multi-output linear regression: `y[j] = intercept[j] + coef[j] . x`.
    Linear {
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    },
    DecisionTree(Tree),
    RandomForest {
        trees: Vec<Tree>,
    },
    /// One estimator per output, results concatenated.
    MultiOutput {
        estimators: Vec<Estimator>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub feature_names_in: Option<Vec<String>>,
    #[serde(default)]
    pub n_features_in: Option<usize>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    #[serde(flatten)]
    pub estimator: Estimator,
}

/// Optional metadata stored next to the predictor in a bundle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundleMeta {
    #[serde(default)]
    pub sensor_cols: Option<Vec<String>>,
    #[serde(default)]
    pub feature_cols: Option<Vec<String>>,
    #[serde(default)]
    pub target_label_cols: Option<Vec<String>>,
    #[serde(default)]
    pub label_cols: Option<Vec<String>>,
    /// Every top-level key of the bundle, for the startup log.
    #[serde(skip)]
    pub keys: Vec<String>,
}

impl BundleMeta {
    /// Declared input column order (`sensor_cols`, then `feature_cols`).
    pub fn columns(&self) -> Option<&[String]> {
        first_non_empty([&self.sensor_cols, &self.feature_cols])
    }

    /// Declared output label names (`target_label_cols`, then `label_cols`).
    pub fn label_columns(&self) -> Option<&[String]> {
        first_non_empty([&self.target_label_cols, &self.label_cols])
    }
}

fn first_non_empty<'a>(candidates: [&'a Option<Vec<String>>; 2]) -> Option<&'a [String]> {
    candidates
        .into_iter()
        .filter_map(|c| c.as_deref())
        .find(|c| !c.is_empty())
}

#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub model: Model,
    pub meta: BundleMeta,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ModelBundle {
    /// Read and validate a model file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model: {}", path.display()))?;
        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse model json: {}", path.display()))?;
        let bundle = Self::from_value(value)
            .with_context(|| format!("invalid model file: {}", path.display()))?;
        Ok(bundle)
    }

    /// Unwrap a bare model or a bundle object.
    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        let Value::Object(obj) = value else {
            return Err(ModelError::NoPredictor);
        };

        let (model_value, meta) = if obj.contains_key("kind") {
            (Value::Object(obj), BundleMeta::default())
        } else {
            let predictor = PREDICTOR_KEYS
                .iter()
                .filter_map(|k| obj.get(*k))
                .find(|v| v.is_object())
                .cloned()
                .ok_or(ModelError::NoPredictor)?;
            let mut meta: BundleMeta = serde_json::from_value(Value::Object(obj.clone()))
                .map_err(|e| ModelError::Invalid(format!("bad bundle metadata: {e}")))?;
            meta.keys = obj.keys().cloned().collect();
            (predictor, meta)
        };

        if model_value.get("kind").is_none() {
            return Err(ModelError::NoPredictor);
        }

        let model: Model = serde_json::from_value(model_value)
            .map_err(|e| ModelError::Invalid(e.to_string()))?;
        model.validate()?;
        Ok(Self { model, meta })
    }
}

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------

impl Model {
    /// Expected input width, if the model declares or implies one.
    pub fn n_features(&self) -> Option<usize> {
        self.n_features_in
            .or_else(|| self.feature_names_in.as_ref().map(Vec::len))
            .or_else(|| self.scaler.as_ref().map(|s| s.mean.len()))
            .or_else(|| self.estimator.n_features())
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names_in.as_deref()
    }

    pub fn predict(&self, x: &[f64]) -> Result<Prediction, ModelError> {
        if let Some(expected) = self.n_features() {
            if x.len() != expected {
                return Err(ModelError::InputWidth {
                    expected,
                    got: x.len(),
                });
            }
        }
        match &self.scaler {
            Some(scaler) => self.estimator.predict(&scaler.transform(x)?),
            None => self.estimator.predict(x),
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if let (Some(n), Some(names)) = (self.n_features_in, &self.feature_names_in) {
            if n != names.len() {
                return Err(ModelError::Invalid(format!(
                    "n_features_in ({n}) disagrees with feature_names_in ({} names)",
                    names.len()
                )));
            }
        }
        if let Some(s) = &self.scaler {
            if s.mean.len() != s.scale.len() {
                return Err(ModelError::Invalid(
                    "scaler mean and scale lengths differ".to_string(),
                ));
            }
        }
        self.estimator.validate()
    }
}

impl Estimator {
    fn n_features(&self) -> Option<usize> {
        match self {
            Self::Linear { coef, .. } => coef.first().map(Vec::len),
            Self::MultiOutput { estimators } => estimators.iter().find_map(Estimator::n_features),
            Self::DecisionTree(_) | Self::RandomForest { .. } => None,
        }
    }

    fn predict(&self, x: &[f64]) -> Result<Prediction, ModelError> {
        match self {
            Self::Linear { coef, intercept } => {
                let mut out = Vec::with_capacity(coef.len());
                for (row, b) in coef.iter().zip(intercept) {
                    if row.len() != x.len() {
                        return Err(ModelError::InputWidth {
                            expected: row.len(),
                            got: x.len(),
                        });
                    }
                    out.push(b + row.iter().zip(x).map(|(c, v)| c * v).sum::<f64>());
                }
                Ok(Prediction::Values(out))
            }
            Self::DecisionTree(tree) => {
                let leaf = tree.leaf_value(x)?;
                match tree.class_names() {
                    Some(classes) => pick_class(classes, leaf),
                    None => Ok(Prediction::Values(leaf.to_vec())),
                }
            }
            Self::RandomForest { trees } => forest_predict(trees, x),
            Self::MultiOutput { estimators } => {
                let mut labels = Vec::new();
                let mut values = Vec::new();
                for est in estimators {
                    match est.predict(x)? {
                        Prediction::Labels(l) => labels.extend(l),
                        Prediction::Values(v) => values.extend(v),
                    }
                }
                match (labels.is_empty(), values.is_empty()) {
                    (false, false) => Err(ModelError::MixedOutputs),
                    (true, false) => Ok(Prediction::Values(values)),
                    _ => Ok(Prediction::Labels(labels)),
                }
            }
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        match self {
            Self::Linear { coef, intercept } => {
                if coef.is_empty() || coef.len() != intercept.len() {
                    return Err(ModelError::Invalid(format!(
                        "linear model has {} coefficient rows and {} intercepts",
                        coef.len(),
                        intercept.len()
                    )));
                }
                let width = coef[0].len();
                if coef.iter().any(|r| r.len() != width) {
                    return Err(ModelError::Invalid(
                        "linear coefficient rows differ in width".to_string(),
                    ));
                }
                Ok(())
            }
            Self::DecisionTree(tree) => tree.validate(),
            Self::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err(ModelError::Invalid("random forest has no trees".to_string()));
                }
                let kind = trees[0].classes.is_some();
                if trees.iter().any(|t| t.classes.is_some() != kind) {
                    return Err(ModelError::Invalid(
                        "random forest mixes classifier and regressor trees".to_string(),
                    ));
                }
                trees.iter().try_for_each(Tree::validate)
            }
            Self::MultiOutput { estimators } => {
                if estimators.is_empty() {
                    return Err(ModelError::Invalid(
                        "multi-output model has no estimators".to_string(),
                    ));
                }
                estimators.iter().try_for_each(Estimator::validate)
            }
        }
    }
}

impl Tree {
    fn class_names(&self) -> Option<Vec<String>> {
        self.classes
            .as_ref()
            .map(|c| c.iter().map(label_text).collect())
    }

    fn leaf_value(&self, x: &[f64]) -> Result<&[f64], ModelError> {
        let mut node = 0usize;
        while self.children_left[node] >= 0 {
            let f = self.feature[node] as usize;
            let v = *x.get(f).ok_or(ModelError::InputWidth {
                expected: f + 1,
                got: x.len(),
            })?;
            node = if v <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        Ok(&self.value[node])
    }

    /// Checks array lengths, and that every child index points forward so
    /// traversal always terminates.
    fn validate(&self) -> Result<(), ModelError> {
        let n = self.children_left.len();
        if n == 0 {
            return Err(ModelError::Invalid("tree has no nodes".to_string()));
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(ModelError::Invalid("tree arrays differ in length".to_string()));
        }
        if self.classes.as_ref().is_some_and(Vec::is_empty) {
            return Err(ModelError::Invalid("classifier tree has no classes".to_string()));
        }
        for i in 0..n {
            let (l, r) = (self.children_left[i], self.children_right[i]);
            if l < 0 {
                if let Some(classes) = &self.classes {
                    if self.value[i].len() != classes.len() {
                        return Err(ModelError::Invalid(format!(
                            "leaf {i} has {} class weights for {} classes",
                            self.value[i].len(),
                            classes.len()
                        )));
                    }
                }
                continue;
            }
            let in_range = |c: i64| c > i as i64 && (c as usize) < n;
            if !in_range(l) || !in_range(r) || self.feature[i] < 0 {
                return Err(ModelError::Invalid(format!("tree node {i} has invalid links")));
            }
        }
        Ok(())
    }
}

fn forest_predict(trees: &[Tree], x: &[f64]) -> Result<Prediction, ModelError> {
    let mut acc: Vec<f64> = Vec::new();
    for tree in trees {
        let leaf = tree.leaf_value(x)?;
        let total: f64 = leaf.iter().sum();
        let contrib: Vec<f64> = if tree.classes.is_some() && total > 0.0 {
            leaf.iter().map(|w| w / total).collect()
        } else {
            leaf.to_vec()
        };
        if acc.is_empty() {
            acc = contrib;
        } else if acc.len() == contrib.len() {
            acc.iter_mut().zip(&contrib).for_each(|(a, c)| *a += c);
        } else {
            return Err(ModelError::Invalid("forest trees disagree on output width".to_string()));
        }
    }
    let n = trees.len() as f64;
    acc.iter_mut().for_each(|a| *a /= n);

    match trees[0].class_names() {
        Some(classes) => pick_class(classes, &acc),
        None => Ok(Prediction::Values(acc)),
    }
}

/// The class with the highest weight.
fn pick_class(mut classes: Vec<String>, weights: &[f64]) -> Result<Prediction, ModelError> {
    let idx = argmax(weights);
    if idx >= classes.len() || weights.is_empty() {
        return Err(ModelError::Invalid(format!(
            "{} class weights for {} classes",
            weights.len(),
            classes.len()
        )));
    }
    Ok(Prediction::Labels(vec![classes.swap_remove(idx)]))
}

/// Index of the largest value; ties resolve to the first.
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
            if v > bv {
                (i, v)
            } else {
                (bi, bv)
            }
        })
        .0
}

fn label_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    /// Soil stump: soil (feature 0) <= 35 -> "Kering (butuh air)", else "Optimal".
    fn soil_tree() -> Value {
        json!({
            "kind": "decision_tree",
            "children_left": [1, -1, -1],
            "children_right": [2, -1, -1],
            "feature": [0, -2, -2],
            "threshold": [35.0, -2.0, -2.0],
            "value": [[5.0, 5.0], [4.0, 0.0], [0.0, 6.0]],
            "classes": ["Kering (butuh air)", "Optimal"]
        })
    }

    fn bundle(v: Value) -> ModelBundle {
        ModelBundle::from_value(v).unwrap()
    }

    // -- Loading ------------------------------------------------------------

    #[test]
    fn bare_model_has_empty_meta() {
        let b = bundle(soil_tree());
        assert!(b.meta.keys.is_empty());
        assert!(b.meta.columns().is_none());
    }

    #[test]
    fn bundle_unwraps_model_and_meta() {
        let b = bundle(json!({
            "model": soil_tree(),
            "sensor_cols": ["soil_moisture_pct"],
            "target_label_cols": ["label_soil"]
        }));
        assert_eq!(b.meta.columns().unwrap(), ["soil_moisture_pct"]);
        assert_eq!(b.meta.label_columns().unwrap(), ["label_soil"]);
        assert_eq!(b.meta.keys.len(), 3);
    }

    #[test]
    fn bundle_falls_back_to_pipeline_key() {
        let b = bundle(json!({ "pipeline": soil_tree() }));
        assert!(matches!(b.model.estimator, Estimator::DecisionTree(_)));
    }

    #[test]
    fn bundle_without_predictor_rejected() {
        let err = ModelBundle::from_value(json!({ "sensor_cols": ["a"] })).unwrap_err();
        assert!(matches!(err, ModelError::NoPredictor));
    }

    #[test]
    fn non_object_rejected() {
        let err = ModelBundle::from_value(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, ModelError::NoPredictor));
    }

    #[test]
    fn predictor_without_kind_rejected() {
        let err = ModelBundle::from_value(json!({ "model": { "coef": [[1.0]] } })).unwrap_err();
        assert!(matches!(err, ModelError::NoPredictor));
    }

    #[test]
    fn empty_meta_columns_ignored() {
        let b = bundle(json!({
            "model": soil_tree(),
            "sensor_cols": [],
            "feature_cols": ["tempC"]
        }));
        assert_eq!(b.meta.columns().unwrap(), ["tempC"]);
    }

    #[test]
    fn load_reads_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{}", json!({ "estimator": soil_tree(), "label_cols": ["x"] })).unwrap();
        let b = ModelBundle::load(f.path()).unwrap();
        assert_eq!(b.meta.label_columns().unwrap(), ["x"]);
    }

    #[test]
    fn load_missing_file_fails_with_path() {
        let err = ModelBundle::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/model.json"));
    }

    // -- Validation ---------------------------------------------------------

    #[test]
    fn tree_with_backward_link_rejected() {
        let mut t = soil_tree();
        t["children_left"] = json!([0, -1, -1]);
        let err = ModelBundle::from_value(t).unwrap_err();
        assert!(format!("{err}").contains("invalid links"));
    }

    #[test]
    fn tree_with_ragged_arrays_rejected() {
        let mut t = soil_tree();
        t["threshold"] = json!([35.0]);
        assert!(ModelBundle::from_value(t).is_err());
    }

    #[test]
    fn classifier_without_classes_rejected() {
        let stump = json!({
            "children_left": [-1], "children_right": [-1], "feature": [-2],
            "threshold": [-2.0], "value": [[]], "classes": []
        });
        let mut tree = stump.clone();
        tree["kind"] = json!("decision_tree");
        let err = ModelBundle::from_value(tree).unwrap_err();
        assert!(format!("{err}").contains("no classes"), "{err}");

        let forest = json!({ "kind": "random_forest", "trees": [stump] });
        assert!(ModelBundle::from_value(forest).is_err());
    }

    #[test]
    fn empty_class_weights_are_an_error_not_a_panic() {
        let err = pick_class(vec![], &[]).unwrap_err();
        assert!(matches!(err, ModelError::Invalid(_)));
        assert!(pick_class(vec!["aman".into()], &[]).is_err());
        assert_eq!(
            pick_class(vec!["aman".into(), "kering".into()], &[0.2, 0.8]).unwrap(),
            Prediction::Labels(vec!["kering".into()])
        );
    }

    #[test]
    fn names_and_count_must_agree() {
        let mut t = soil_tree();
        t["n_features_in"] = json!(6);
        t["feature_names_in"] = json!(["a", "b"]);
        assert!(ModelBundle::from_value(t).is_err());
    }

    // -- Inference ----------------------------------------------------------

    #[test]
    fn tree_classifier_follows_threshold() {
        let m = bundle(soil_tree()).model;
        assert_eq!(
            m.predict(&[20.0, 0.0]).unwrap(),
            Prediction::Labels(vec!["Kering (butuh air)".into()])
        );
        assert_eq!(
            m.predict(&[35.0, 0.0]).unwrap(),
            Prediction::Labels(vec!["Kering (butuh air)".into()])
        );
        assert_eq!(
            m.predict(&[50.0, 0.0]).unwrap(),
            Prediction::Labels(vec!["Optimal".into()])
        );
    }

    #[test]
    fn numeric_classes_rendered_as_text() {
        let mut t = soil_tree();
        t["classes"] = json!([0, 1]);
        let m = bundle(t).model;
        assert_eq!(m.predict(&[60.0]).unwrap(), Prediction::Labels(vec!["1".into()]));
    }

    #[test]
    fn linear_multi_output_regression() {
        let m = bundle(json!({
            "kind": "linear",
            "coef": [[1.0, 0.0], [0.5, 0.5]],
            "intercept": [0.0, 1.0]
        }))
        .model;
        assert_eq!(m.n_features(), Some(2));
        assert_eq!(m.predict(&[4.0, 2.0]).unwrap(), Prediction::Values(vec![4.0, 4.0]));
    }

    #[test]
    fn input_width_checked() {
        let m = bundle(json!({
            "kind": "linear",
            "coef": [[1.0, 0.0]],
            "intercept": [0.0]
        }))
        .model;
        let err = m.predict(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, ModelError::InputWidth { expected: 2, got: 3 }));
    }

    #[test]
    fn scaler_applied_before_estimator() {
        let m = bundle(json!({
            "kind": "linear",
            "scaler": { "mean": [10.0], "scale": [2.0] },
            "coef": [[1.0]],
            "intercept": [0.0]
        }))
        .model;
        assert_eq!(m.predict(&[14.0]).unwrap(), Prediction::Values(vec![2.0]));
    }

    #[test]
    fn forest_classifier_votes_by_probability() {
        let dry = json!({
            "children_left": [-1], "children_right": [-1], "feature": [-2],
            "threshold": [-2.0], "value": [[9.0, 1.0]], "classes": ["kering", "basah"]
        });
        let wet = json!({
            "children_left": [-1], "children_right": [-1], "feature": [-2],
            "threshold": [-2.0], "value": [[0.0, 1.0]], "classes": ["kering", "basah"]
        });
        let m = bundle(json!({ "kind": "random_forest", "trees": [dry.clone(), dry, wet] })).model;
        assert_eq!(m.predict(&[0.0]).unwrap(), Prediction::Labels(vec!["kering".into()]));
    }

    #[test]
    fn forest_regressor_averages() {
        let leaf = |v: f64| {
            json!({
                "children_left": [-1], "children_right": [-1], "feature": [-2],
                "threshold": [-2.0], "value": [[v, v + 1.0]]
            })
        };
        let m = bundle(json!({ "kind": "random_forest", "trees": [leaf(60.0), leaf(70.0)] })).model;
        assert_eq!(m.predict(&[0.0]).unwrap(), Prediction::Values(vec![65.0, 66.0]));
    }

    #[test]
    fn multi_output_concatenates_labels() {
        let m = bundle(json!({
            "kind": "multi_output",
            "n_features_in": 1,
            "estimators": [soil_tree(), soil_tree()]
        }))
        .model;
        let p = m.predict(&[10.0]).unwrap();
        assert_eq!(p.to_strings().len(), 2);
        assert_eq!(p.as_text(), "Kering (butuh air) Kering (butuh air)");
    }

    #[test]
    fn multi_output_rejects_mixed_outputs() {
        let m = bundle(json!({
            "kind": "multi_output",
            "estimators": [soil_tree(), { "kind": "linear", "coef": [[1.0]], "intercept": [0.0] }]
        }))
        .model;
        assert!(matches!(m.predict(&[10.0]).unwrap_err(), ModelError::MixedOutputs));
    }

    // -- Prediction helpers -------------------------------------------------

    #[test]
    fn labels_parse_to_values() {
        let p = Prediction::Labels(vec!["61.5".into(), " 60 ".into()]);
        assert_eq!(p.to_values().unwrap(), vec![61.5, 60.0]);
        assert!(Prediction::Labels(vec!["dry".into()]).to_values().is_err());
    }

    #[test]
    fn values_render_with_decimal_point() {
        assert_eq!(Prediction::Values(vec![1.0, 2.5]).as_text(), "1.0 2.5");
    }
}
