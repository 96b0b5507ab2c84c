//! Canonical sensor reading (`FeatureRow`) and its two column-name schemes.
//!
//! The device firmware reports `soil_percent`, `tempC`, ... while the models
//! were trained on `soil_moisture_pct`, `air_temperature_c`, ...  Both names
//! resolve against the same stored value, so a row can satisfy either model's
//! column list without re-deriving anything.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;

// ---------------------------------------------------------------------------
// Column schemes
// ---------------------------------------------------------------------------

/// Device-style (ESP32) column names.
pub const DEVICE_FEATURES_5: [&str; 5] =
    ["soil_percent", "tempC", "humRH", "light_percent", "uv_uvi"];
pub const DEVICE_FEATURES_6: [&str; 6] = [
    "soil_percent",
    "tempC",
    "humRH",
    "light_percent",
    "uv_uvi",
    "hour",
];

/// Training-style column names.
pub const MODEL_FEATURES_5: [&str; 5] = [
    "soil_moisture_pct",
    "air_temperature_c",
    "air_humidity_pct",
    "light_intensity_lux",
    "uv_index",
];
pub const MODEL_FEATURES_6: [&str; 6] = [
    "soil_moisture_pct",
    "air_temperature_c",
    "air_humidity_pct",
    "light_intensity_lux",
    "uv_index",
    "hour",
];

/// Every key a serialized row carries, device scheme first.
const ALL_KEYS: [&str; 11] = [
    "soil_percent",
    "tempC",
    "humRH",
    "light_percent",
    "uv_uvi",
    "hour",
    "soil_moisture_pct",
    "air_temperature_c",
    "air_humidity_pct",
    "light_intensity_lux",
    "uv_index",
];

/// Lux estimate per percent of light when the device has no real lux sensor.
const LUX_PER_PERCENT: f64 = 10.0;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("state incomplete: missing {missing:?} (need soil/percent and env/tempC|humRH)")]
    IncompleteState { missing: Vec<&'static str> },

    #[error("field '{field}' is not numeric: {value}")]
    NotNumeric { field: String, value: String },

    #[error("missing features for model ({origin}): {missing:?}")]
    MissingColumns {
        origin: &'static str,
        missing: Vec<String>,
    },

    #[error("forecast model n_features_in={0} cannot be mapped to 5 or 6 features per step")]
    UnmappableInputCount(usize),
}

// ---------------------------------------------------------------------------
// Feature identity
// ---------------------------------------------------------------------------

/// A physical quantity, independent of which scheme named it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Soil,
    Temperature,
    Humidity,
    LightPercent,
    LightLux,
    Uv,
    Hour,
}

impl Feature {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "soil_percent" | "soil_moisture_pct" => Some(Self::Soil),
            "tempC" | "air_temperature_c" => Some(Self::Temperature),
            "humRH" | "air_humidity_pct" => Some(Self::Humidity),
            "light_percent" => Some(Self::LightPercent),
            "light_intensity_lux" => Some(Self::LightLux),
            "uv_uvi" | "uv_index" => Some(Self::Uv),
            "hour" => Some(Self::Hour),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Feature row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    pub soil_percent: f64,
    pub temp_c: f64,
    pub hum_rh: f64,
    pub light_percent: f64,
    pub light_lux: f64,
    pub uv_index: f64,
    pub hour: u8,
}

impl FeatureRow {
    pub fn value(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Soil => self.soil_percent,
            Feature::Temperature => self.temp_c,
            Feature::Humidity => self.hum_rh,
            Feature::LightPercent => self.light_percent,
            Feature::LightLux => self.light_lux,
            Feature::Uv => self.uv_index,
            Feature::Hour => f64::from(self.hour),
        }
    }

    /// Look up a value by either scheme's column name.
    pub fn get(&self, name: &str) -> Option<f64> {
        Feature::from_name(name).map(|f| self.value(f))
    }

    pub fn contains(&self, name: &str) -> bool {
        Feature::from_name(name).is_some()
    }

    pub fn with_hour(mut self, hour: u8) -> Self {
        self.hour = hour;
        self
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for FeatureRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(ALL_KEYS.len()))?;
        for key in ALL_KEYS {
            if key == "hour" {
                map.serialize_entry(key, &self.hour)?;
            } else if let Some(v) = self.get(key) {
                map.serialize_entry(key, &v)?;
            }
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build a row from the device `state` node (`soil/percent`, `env/tempC`, ...).
pub fn build_row_from_state(state: &Value, now: OffsetDateTime) -> Result<FeatureRow, FeatureError> {
    let soil = lookup(state, "soil", "percent");
    let temp = lookup(state, "env", "tempC");
    let hum = lookup(state, "env", "humRH");

    let (soil, temp, hum) = match (soil, temp, hum) {
        (Some(s), Some(t), Some(h)) => (s, t, h),
        _ => {
            let missing = [
                ("soil/percent", soil),
                ("env/tempC", temp),
                ("env/humRH", hum),
            ]
            .into_iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| name)
            .collect();
            return Err(FeatureError::IncompleteState { missing });
        }
    };

    let light_percent = match lookup(state, "light", "percent") {
        Some(v) => number("light/percent", v)?,
        None => 0.0,
    };
    let light_lux = match lookup(state, "light", "lux") {
        Some(v) => number("light/lux", v)?,
        None => light_percent * LUX_PER_PERCENT,
    };
    let uv_index = match lookup(state, "uv", "uvi") {
        Some(v) => number("uv/uvi", v)?,
        None => 0.0,
    };

    Ok(FeatureRow {
        soil_percent: number("soil/percent", soil)?,
        temp_c: number("env/tempC", temp)?,
        hum_rh: number("env/humRH", hum)?,
        light_percent,
        light_lux,
        uv_index,
        hour: now.hour(),
    })
}

/// Normalize one telemetry history point into a row.
///
/// Accepts the flat device scheme, the flat training scheme, or a
/// state-shaped node. Anything else (or anything non-numeric) yields `None`.
pub fn normalize_point(point: &Map<String, Value>, now: OffsetDateTime) -> Option<FeatureRow> {
    let has_all = |keys: &[&str]| keys.iter().all(|k| point.contains_key(*k));

    if has_all(&DEVICE_FEATURES_5) {
        let light_percent = field(point, "light_percent")?;
        let light_lux = match point.get("light_intensity_lux") {
            Some(v) => number("light_intensity_lux", v).ok()?,
            None => light_percent * LUX_PER_PERCENT,
        };
        return Some(FeatureRow {
            soil_percent: field(point, "soil_percent")?,
            temp_c: field(point, "tempC")?,
            hum_rh: field(point, "humRH")?,
            light_percent,
            light_lux,
            uv_index: field(point, "uv_uvi")?,
            hour: point_hour(point, now)?,
        });
    }

    if has_all(&MODEL_FEATURES_5) {
        let light_lux = field(point, "light_intensity_lux")?;
        let light_percent = match point.get("light_percent") {
            Some(v) => number("light_percent", v).ok()?,
            None => light_lux / LUX_PER_PERCENT,
        };
        return Some(FeatureRow {
            soil_percent: field(point, "soil_moisture_pct")?,
            temp_c: field(point, "air_temperature_c")?,
            hum_rh: field(point, "air_humidity_pct")?,
            light_percent,
            light_lux,
            uv_index: field(point, "uv_index")?,
            hour: point_hour(point, now)?,
        });
    }

    build_row_from_state(&Value::Object(point.clone()), now).ok()
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

fn lookup<'a>(obj: &'a Value, section: &str, key: &str) -> Option<&'a Value> {
    obj.get(section)?.get(key).filter(|v| !v.is_null())
}

fn field(point: &Map<String, Value>, key: &str) -> Option<f64> {
    point.get(key).and_then(|v| number(key, v).ok())
}

fn point_hour(point: &Map<String, Value>, now: OffsetDateTime) -> Option<u8> {
    match point.get("hour") {
        None | Some(Value::Null) => Some(now.hour()),
        Some(v) => {
            let h = number("hour", v).ok()?.trunc();
            (0.0..24.0).contains(&h).then_some(h as u8)
        }
    }
}

/// Read a JSON number or numeric string as `f64`.
fn number(field: &str, v: &Value) -> Result<f64, FeatureError> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.ok_or_else(|| FeatureError::NotNumeric {
        field: field.to_string(),
        value: v.to_string(),
    })
}

// ===========================================================================
// Tests
// ===========================================================================
