//! Turning decision-model output into a pump command.
//!
//! Several generations of decision models are in the field and each names
//! its outputs differently, so interpretation walks a fixed precedence:
//!
//! 1. an explicit `label_soil` from a multi-output classifier,
//! 2. the legacy single-label table,
//! 3. heat-stress keywords (fall back to the soil threshold),
//! 4. the soil threshold alone.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::features::FeatureRow;
use crate::model::{BundleMeta, Prediction};

/// Label names used when the bundle does not declare its own.
const DEFAULT_LABEL_COLS: [&str; 5] = [
    "label_suhu",
    "label_rh",
    "label_soil",
    "label_lux",
    "label_uv",
];

/// Legacy labels and the pump action they imply. Checked in order by
/// substring, so `kurang_air` must precede `kering`-style catch-alls.
const LABEL_MAP: [(&str, bool); 7] = [
    ("kurang_air", true),
    ("butuh_air", true),
    ("kering", true),
    ("aman", false),
    ("normal", false),
    ("cukup", false),
    ("basah", false),
];

const SOIL_DRY_KEYWORDS: [&str; 3] = ["kering", "butuh air", "agak kering"];
const SOIL_WET_KEYWORDS: [&str; 2] = ["basah", "optimal"];
const HEAT_KEYWORDS: [&str; 2] = ["stres_panas", "panas"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    SoilLabel,
    LegacyLabel,
    HeatStress,
    Threshold,
    /// Device power is off; the model's answer was overridden.
    PowerOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub pump: bool,
    pub source: DecisionSource,
}

impl Decision {
    /// Apply the device power switch: with power off the pump stays off.
    pub fn gated_by_power(self, power: bool) -> Self {
        if power {
            self
        } else {
            Decision {
                pump: false,
                source: DecisionSource::PowerOff,
            }
        }
    }
}

/// Name each output of a prediction.
///
/// Two or more outputs are zipped with the bundle's label columns (or the
/// default five); a single output is stored under `label`.
pub fn decode_prediction(pred: &Prediction, meta: &BundleMeta) -> BTreeMap<String, String> {
    let outputs = pred.to_strings();

    if outputs.len() >= 2 {
        let names: Vec<String> = match meta.label_columns() {
            Some(cols) => cols.to_vec(),
            None => DEFAULT_LABEL_COLS.iter().map(|s| s.to_string()).collect(),
        };
        return names.into_iter().zip(outputs).collect();
    }

    let mut labels = BTreeMap::new();
    labels.insert(
        "label".to_string(),
        outputs.into_iter().next().unwrap_or_default(),
    );
    labels
}

pub fn interpret_decision(
    pred: &Prediction,
    row: &FeatureRow,
    labels: &BTreeMap<String, String>,
    threshold: f64,
) -> Decision {
    let decide = |pump, source| Decision { pump, source };

    if let Some(soil) = labels.get("label_soil") {
        let soil = soil.trim().to_lowercase();
        if !soil.is_empty() {
            if SOIL_DRY_KEYWORDS.iter().any(|k| soil.contains(k)) {
                return decide(true, DecisionSource::SoilLabel);
            }
            if SOIL_WET_KEYWORDS.iter().any(|k| soil.contains(k)) {
                return decide(false, DecisionSource::SoilLabel);
            }
        }
    }

    let text = pred.as_text().trim().to_lowercase();
    if let Some((_, pump)) = LABEL_MAP.iter().find(|(key, _)| text.contains(key)) {
        return decide(*pump, DecisionSource::LegacyLabel);
    }

    let below = row.soil_percent < threshold;
    if HEAT_KEYWORDS.iter().any(|k| text.contains(k)) {
        return decide(below, DecisionSource::HeatStress);
    }
    decide(below, DecisionSource::Threshold)
}

// ===========================================================================
// Tests
// ===========================================================================
