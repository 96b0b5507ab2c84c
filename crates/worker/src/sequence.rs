//! Multi-step input for the forecast model, assembled from telemetry history.

use serde_json::{Map, Value};
use std::cmp::Ordering;
use time::{Duration, OffsetDateTime};

use crate::columns::ModelInput;
use crate::features::{normalize_point, FeatureError, FeatureRow, MODEL_FEATURES_5, MODEL_FEATURES_6};
use crate::model::Model;

/// How many history points are examined per required step; extra points
/// absorb malformed entries that get skipped.
const LOOKBACK_FACTOR: usize = 3;

/// Width and length of a flattened input sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceShape {
    /// Features per step: 5, or 6 when `hour` is included.
    pub per_step: usize,
    pub steps: usize,
}

impl SequenceShape {
    fn columns(&self) -> &'static [&'static str] {
        if self.per_step == 6 {
            &MODEL_FEATURES_6
        } else {
            &MODEL_FEATURES_5
        }
    }
}

/// Work out whether `model` wants a history sequence.
///
/// Returns `None` when a single reading suffices (unknown width or at most
/// six features).  Widths divisible by 5 are read as 5 features per step
/// before 6 is tried, so a width of 30 means six 5-wide steps.
pub fn sequence_shape(model: &Model) -> Result<Option<SequenceShape>, FeatureError> {
    let n = match model.n_features() {
        Some(n) if n > 6 => n,
        _ => return Ok(None),
    };
    let per_step = if n % 5 == 0 {
        5
    } else if n % 6 == 0 {
        6
    } else {
        return Err(FeatureError::UnmappableInputCount(n));
    };
    Ok(Some(SequenceShape {
        per_step,
        steps: n / per_step,
    }))
}

/// Pull the ordered list of object points out of a raw telemetry node.
///
/// The node may be a list or a keyed map, optionally nested under `history`
/// or `series`. Keyed maps are ordered by integer key first, then by string
/// key (push ids sort chronologically).
pub fn extract_points(raw: &Value) -> Vec<&Map<String, Value>> {
    let inner = match raw {
        Value::Object(obj) => obj
            .get("history")
            .or_else(|| obj.get("series"))
            .unwrap_or(raw),
        other => other,
    };

    let points: Vec<&Value> = match inner {
        Value::Array(items) => items.iter().collect(),
        Value::Object(obj) => {
            let mut items: Vec<(&String, &Value)> = obj.iter().collect();
            items.sort_by(|a, b| compare_keys(a.0, b.0));
            items.into_iter().map(|(_, v)| v).collect()
        }
        _ => Vec::new(),
    };

    points.into_iter().filter_map(Value::as_object).collect()
}

fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Flatten the most recent `shape.steps` readings into one input vector.
///
/// History shorter than the window is padded at the front with the current
/// reading. For 6-wide steps each row's hour is rewritten to the hour it
/// represents, counting back from `now` in `step_minutes` increments.
pub fn build_sequence(
    shape: SequenceShape,
    points: &[&Map<String, Value>],
    current: &FeatureRow,
    now: OffsetDateTime,
    step_minutes: u32,
) -> ModelInput {
    let steps = shape.steps;
    let window_start = points.len().saturating_sub(steps * LOOKBACK_FACTOR);

    let history: Vec<FeatureRow> = points[window_start..]
        .iter()
        .filter_map(|p| normalize_point(p, now))
        .collect();

    let mut rows: Vec<FeatureRow> = Vec::with_capacity(steps.max(history.len()));
    rows.extend(std::iter::repeat(*current).take(steps.saturating_sub(history.len())));
    rows.extend(history);
    let rows = &rows[rows.len() - steps..];

    let step = Duration::minutes(i64::from(step_minutes));
    let columns = shape.columns();
    let mut values = Vec::with_capacity(steps * shape.per_step);
    for (i, row) in rows.iter().enumerate() {
        let row = if shape.per_step == 6 {
            let back = (steps - 1 - i) as i32;
            let at = step.checked_mul(back).and_then(|d| now.checked_sub(d));
            row.with_hour(at.map_or(row.hour, |t| t.hour()))
        } else {
            *row
        };
        values.extend(columns.iter().filter_map(|c| row.get(c)));
    }

    ModelInput {
        columns: (0..steps)
            .flat_map(|i| columns.iter().map(move |c| format!("{c}_t{i}")))
            .collect(),
        values,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
