use serde_json::Value;

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

/// The subset of `/devices/{id}/controls` the worker reads each tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controls {
    /// Lowercased; `"auto"` when absent.
    pub mode: String,
    pub power: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            mode: "auto".to_string(),
            power: true,
        }
    }
}

impl Controls {
    /// Parse the raw controls node. A null or non-object node yields the
    /// defaults.
    pub fn from_value(raw: &Value) -> Self {
        let mut controls = Self::default();
        let Some(obj) = raw.as_object() else {
            return controls;
        };

        if let Some(mode) = obj.get("mode") {
            controls.mode = match mode {
                Value::String(s) => s.trim().to_lowercase(),
                Value::Null => "auto".to_string(),
                other => other.to_string().to_lowercase(),
            };
        }
        if let Some(power) = obj.get("power") {
            controls.power = truthy(power);
        }
        controls
    }

    pub fn is_auto(&self) -> bool {
        self.mode == "auto"
    }
}

/// Loose truthiness for values written by the app and the device firmware,
/// which disagree on whether booleans are bools, numbers or strings.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "" | "false" | "0" | "off" | "no"
        ),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// Loop state
// ---------------------------------------------------------------------------

/// What the control loop remembers between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopState {
    /// Last pump command written; `None` until the first write.
    pub last_pump: Option<bool>,
    /// Unix seconds of the last forecast run.
    pub last_forecast_ts: Option<i64>,
}

impl LoopState {
    /// Whether `pump` differs from what was last written.
    pub fn pump_changed(&self, pump: bool) -> bool {
        self.last_pump != Some(pump)
    }

    pub fn forecast_due(&self, now_ts: i64, interval_sec: u64) -> bool {
        match self.last_forecast_ts {
            None => true,
            Some(last) => now_ts.saturating_sub(last) >= interval_sec as i64,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_controls_default_to_auto_powered() {
        assert_eq!(Controls::from_value(&Value::Null), Controls::default());
        assert_eq!(Controls::from_value(&json!({})), Controls::default());
    }

    #[test]
    fn mode_compared_case_insensitively() {
        let c = Controls::from_value(&json!({ "mode": " AUTO " }));
        assert!(c.is_auto());
        let c = Controls::from_value(&json!({ "mode": "Manual" }));
        assert_eq!(c.mode, "manual");
        assert!(!c.is_auto());
    }

    #[test]
    fn power_truthiness() {
        let power = |v: Value| Controls::from_value(&json!({ "power": v })).power;
        assert!(power(json!(true)));
        assert!(power(json!(1)));
        assert!(power(json!("on")));
        assert!(power(json!("true")));
        assert!(!power(json!(false)));
        assert!(!power(json!(0)));
        assert!(!power(json!("off")));
        assert!(!power(json!("False")));
        assert!(!power(json!("")));
        assert!(!power(Value::Null));
    }

    #[test]
    fn pump_edge_detection() {
        let mut s = LoopState::default();
        assert!(s.pump_changed(false));
        s.last_pump = Some(true);
        assert!(!s.pump_changed(true));
        assert!(s.pump_changed(false));
    }

    #[test]
    fn forecast_gate() {
        let mut s = LoopState::default();
        assert!(s.forecast_due(1_000, 10));
        s.last_forecast_ts = Some(1_000);
        assert!(!s.forecast_due(1_009, 10));
        assert!(s.forecast_due(1_010, 10));
    }
}
