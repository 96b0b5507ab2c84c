//! Reading a soil-moisture trajectory as a time-to-irrigation estimate.

use std::fmt;

use crate::model::{ModelError, Prediction};

/// When the trajectory first drops below the irrigation threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eta {
    Now,
    Minutes(i64),
    Hours(f64),
    /// No crossing within the horizon, given in hours.
    Beyond(f64),
}

impl Eta {
    fn from_minutes(minutes: i64) -> Self {
        match minutes {
            0 => Eta::Now,
            m if m < 60 => Eta::Minutes(m),
            m => Eta::Hours(m as f64 / 60.0),
        }
    }
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eta::Now => write!(f, "sekarang"),
            Eta::Minutes(m) => write!(f, "{m} menit lagi"),
            Eta::Hours(h) => write!(f, "{h:.1} jam lagi"),
            Eta::Beyond(h) => write!(f, ">{h:.1} jam (masih aman)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOutcome {
    pub soil_future: Vec<f64>,
    /// Index of the first step below threshold.
    pub first_below: Option<usize>,
    pub next_irrigation_min: Option<i64>,
    pub text: String,
}

impl ForecastOutcome {
    /// Lowest predicted value, or `current` when the trajectory is empty.
    pub fn min_or(&self, current: f64) -> f64 {
        self.soil_future.iter().copied().reduce(f64::min).unwrap_or(current)
    }
}

pub fn interpret_forecast(
    pred: &Prediction,
    threshold: f64,
    step_minutes: u32,
) -> Result<ForecastOutcome, ModelError> {
    let soil_future = pred.to_values()?;
    let step = i64::from(step_minutes);

    let first_below = soil_future.iter().position(|v| *v < threshold);
    let (next_irrigation_min, eta) = match first_below {
        Some(idx) => {
            let minutes = idx as i64 * step;
            (Some(minutes), Eta::from_minutes(minutes))
        }
        None => {
            let horizon = if soil_future.len() > 1 {
                (soil_future.len() as i64 - 1) * step
            } else {
                step
            };
            (None, Eta::Beyond(horizon as f64 / 60.0))
        }
    };

    Ok(ForecastOutcome {
        soil_future,
        first_below,
        next_irrigation_min,
        text: eta.to_string(),
    })
}

// ===========================================================================
// Tests
// ===========================================================================
