//! TOML config file loading and validation.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::UtcOffset;

/// Largest UTC offset in use anywhere (Line Islands).
const MAX_UTC_OFFSET_HOURS: i32 = 14;
/// Forecast steps longer than a day make no sense for soil moisture.
const MAX_STEP_MINUTES: u32 = 1440;

// ---------------------------------------------------------------------------
// Config file structure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Node under `/devices` this worker serves.
    pub device_id: String,
    pub database_url: String,

    pub service_account_path: PathBuf,
    pub decision_model_path: PathBuf,
    pub forecast_model_path: PathBuf,

    /// Local time zone of the greenhouse, whole hours east of UTC.
    pub utc_offset_hours: i32,

    pub loop_sec: u64,
    pub error_backoff_sec: u64,
    pub forecast_interval_sec: u64,
    /// Minutes between forecast steps, both in history and output.
    pub step_minutes: u32,

    /// Soil moisture percent below which the plant needs water.
    pub soil_irrigate_threshold: f64,
    pub request_timeout_sec: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_id: "esp32-iris-01".into(),
            database_url: "https://smart-iris-default-rtdb.firebaseio.com".into(),
            service_account_path: "serviceAccountKey.json".into(),
            decision_model_path: "tomato_decision_model.json".into(),
            forecast_model_path: "tomato_forecast_model.json".into(),
            utc_offset_hours: 8,
            loop_sec: 1,
            error_backoff_sec: 3,
            forecast_interval_sec: 10,
            step_minutes: 10,
            soil_irrigate_threshold: 60.0,
            request_timeout_sec: 10,
        }
    }
}

impl Config {
    pub fn utc_offset(&self) -> UtcOffset {
        i8::try_from(self.utc_offset_hours)
            .ok()
            .and_then(|h| UtcOffset::from_hms(h, 0, 0).ok())
            .unwrap_or(UtcOffset::UTC)
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_secs(self.loop_sec)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_sec)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }

    /// Make relative file paths relative to `base` instead of the working
    /// directory.
    fn resolve_paths(&mut self, base: &Path) {
        for p in [
            &mut self.service_account_path,
            &mut self.decision_model_path,
            &mut self.forecast_model_path,
        ] {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Validate every field. Returns `Ok(())` or an error describing every
    /// violation found (not just the first one).
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // ── Identity ────────────────────────────────────────
        if self.device_id.trim().is_empty() {
            errors.push("device_id is empty".into());
        } else if self.device_id.contains('/') {
            errors.push(format!(
                "device_id '{}' must not contain '/'",
                self.device_id
            ));
        }

        if !(self.database_url.starts_with("https://") || self.database_url.starts_with("http://"))
        {
            errors.push(format!(
                "database_url '{}' must start with http:// or https://",
                self.database_url
            ));
        }

        // ── Timing (all must be positive) ───────────────────
        for (name, value) in [
            ("loop_sec", self.loop_sec),
            ("error_backoff_sec", self.error_backoff_sec),
            ("forecast_interval_sec", self.forecast_interval_sec),
            ("step_minutes", u64::from(self.step_minutes)),
            ("request_timeout_sec", self.request_timeout_sec),
        ] {
            if value == 0 {
                errors.push(format!("{name} must be positive"));
            }
        }

        if self.step_minutes > MAX_STEP_MINUTES {
            errors.push(format!(
                "step_minutes {} exceeds one day ({MAX_STEP_MINUTES})",
                self.step_minutes
            ));
        }

        if self.utc_offset_hours.abs() > MAX_UTC_OFFSET_HOURS {
            errors.push(format!(
                "utc_offset_hours {} out of range [-{MAX_UTC_OFFSET_HOURS}, {MAX_UTC_OFFSET_HOURS}]",
                self.utc_offset_hours
            ));
        }

        // ── Threshold ───────────────────────────────────────
        if !(0.0..=100.0).contains(&self.soil_irrigate_threshold) {
            errors.push(format!(
                "soil_irrigate_threshold {} out of range [0, 100]",
                self.soil_irrigate_threshold
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Read, parse, and validate a TOML config file. A missing file yields the
/// defaults. File paths in the config are resolved against its directory.
pub fn load(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))?
    } else {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    config.resolve_paths(base);

    config
        .validate()
        .with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================
