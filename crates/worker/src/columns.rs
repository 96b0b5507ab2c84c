//! Choosing which row columns, in which order, a model is fed.

use crate::features::{
    FeatureError, FeatureRow, DEVICE_FEATURES_5, DEVICE_FEATURES_6, MODEL_FEATURES_5,
    MODEL_FEATURES_6,
};
use crate::model::{BundleMeta, Model};

/// One model input vector together with the column names that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub columns: Vec<String>,
    pub values: Vec<f64>,
}

/// Resolve a single-step input for `model`.
///
/// Column order comes from, in priority: the model's own `feature_names_in`,
/// the bundle's `sensor_cols`/`feature_cols`, then a fixed table chosen by
/// the model's feature count.
pub fn resolve_columns(
    model: &Model,
    meta: &BundleMeta,
    row: &FeatureRow,
) -> Result<ModelInput, FeatureError> {
    if let Some(names) = model.feature_names() {
        return select(names, row, "feature_names_in");
    }
    if let Some(names) = meta.columns() {
        return select(names, row, "meta sensor_cols");
    }

    let (training, device): (&[&str], &[&str]) = match model.n_features() {
        Some(5) => (&MODEL_FEATURES_5[..], &DEVICE_FEATURES_5[..]),
        _ => (&MODEL_FEATURES_6[..], &DEVICE_FEATURES_6[..]),
    };
    let cols = if training.iter().all(|c| row.contains(c)) {
        training
    } else {
        device
    };
    select(cols, row, "fallback")
}

fn select<S: AsRef<str>>(
    names: &[S],
    row: &FeatureRow,
    origin: &'static str,
) -> Result<ModelInput, FeatureError> {
    let mut values = Vec::with_capacity(names.len());
    let mut missing = Vec::new();
    for name in names {
        match row.get(name.as_ref()) {
            Some(v) => values.push(v),
            None => missing.push(name.as_ref().to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(FeatureError::MissingColumns { origin, missing });
    }
    Ok(ModelInput {
        columns: names.iter().map(|n| n.as_ref().to_string()).collect(),
        values,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
