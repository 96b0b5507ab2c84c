//! Threshold labels for an indoor tomato profile. These match the bands the
//! mobile app uses, so the app can show them next to the model's labels.

use std::collections::BTreeMap;

use crate::features::FeatureRow;

const UNKNOWN: &str = "-";

pub fn temperature_label(t: f64) -> &'static str {
    match t {
        t if t.is_nan() => UNKNOWN,
        t if t < 13.0 => "Dingin",
        t if t < 18.0 => "Sejuk",
        t if t <= 27.0 => "Optimal",
        t if t <= 30.0 => "Hangat",
        t if t <= 33.0 => "Panas",
        _ => "Bahaya panas",
    }
}

pub fn humidity_label(rh: f64) -> &'static str {
    match rh {
        rh if rh.is_nan() => UNKNOWN,
        rh if rh < 40.0 => "Terlalu kering",
        rh if rh < 55.0 => "Agak kering",
        rh if rh <= 75.0 => "Optimal",
        rh if rh <= 85.0 => "Terlalu lembap",
        _ => "Sangat lembap (risiko jamur)",
    }
}

pub fn soil_label(sm: f64) -> &'static str {
    match sm {
        sm if sm.is_nan() => UNKNOWN,
        sm if sm < 30.0 => "Kering (butuh air)",
        sm if sm < 40.0 => "Agak kering",
        sm if sm <= 70.0 => "Optimal",
        sm if sm <= 85.0 => "Basah (kurangi air)",
        _ => "Terlalu basah (risiko busuk akar)",
    }
}

pub fn lux_label(lux: f64) -> &'static str {
    match lux {
        lux if lux.is_nan() => UNKNOWN,
        lux if lux < 200.0 => "Rendah",
        lux if lux < 600.0 => "Sedang",
        lux if lux < 900.0 => "Tinggi",
        _ => "Sangat tinggi",
    }
}

pub fn uv_label(uv: f64) -> &'static str {
    match uv {
        uv if uv.is_nan() => UNKNOWN,
        uv if uv <= 2.0 => "Rendah",
        uv if uv <= 5.0 => "Sedang",
        uv if uv <= 7.0 => "Tinggi",
        uv if uv <= 10.0 => "Sangat tinggi",
        _ => "Ekstrem",
    }
}

/// All five rule labels for a row, keyed like the decision model's outputs.
pub fn rule_labels(row: &FeatureRow) -> BTreeMap<String, String> {
    [
        ("label_suhu", temperature_label(row.temp_c)),
        ("label_rh", humidity_label(row.hum_rh)),
        ("label_soil", soil_label(row.soil_percent)),
        ("label_lux", lux_label(row.light_lux)),
        ("label_uv", uv_label(row.uv_index)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
