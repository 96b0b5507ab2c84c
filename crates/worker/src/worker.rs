//! The control loop: poll the device, decide on the pump, forecast soil
//! moisture, and write the results back.
//!
//! ## Tick
//!
//! ```text
//! fetch controls + state
//!   ├─[mode == auto]──▶ decide ──[command changed]──▶ write pump_auto, ai/now
//!   └─[forecast due]──▶ forecast ──▶ write ai/forecast, controls.forecast_*
//! ```
//!
//! Any error aborts the tick; the loop logs it, backs off, and carries on.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::columns::{resolve_columns, ModelInput};
use crate::config::Config;
use crate::decision::{decode_prediction, interpret_decision};
use crate::features::{build_row_from_state, FeatureRow};
use crate::forecast::interpret_forecast;
use crate::labels::rule_labels;
use crate::model::ModelBundle;
use crate::rtdb::Store;
use crate::sequence::{build_sequence, extract_points, sequence_shape};
use crate::state::{Controls, LoopState};

pub struct Worker<S: Store> {
    store: S,
    decision: ModelBundle,
    forecast: ModelBundle,
    config: Config,
}

impl<S: Store> Worker<S> {
    pub fn new(store: S, decision: ModelBundle, forecast: ModelBundle, config: Config) -> Self {
        Self {
            store,
            decision,
            forecast,
            config,
        }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    /// Run forever.
    pub async fn run(&self) {
        let mut state = LoopState::default();
        info!(
            device = %self.config.device_id,
            loop_sec = self.config.loop_sec,
            forecast_interval_sec = self.config.forecast_interval_sec,
            "worker started"
        );
        loop {
            let pause = self.iterate(&mut state).await;
            tokio::time::sleep(pause).await;
        }
    }

    /// One loop iteration at the current wall-clock time. Returns how long
    /// to sleep before the next one.
    async fn iterate(&self, state: &mut LoopState) -> Duration {
        let now = OffsetDateTime::now_utc().to_offset(self.config.utc_offset());
        match self.tick(state, now).await {
            Ok(()) => self.config.loop_interval(),
            Err(e) => {
                error!(device = %self.config.device_id, "tick failed: {e:#}");
                self.config.error_backoff()
            }
        }
    }

    pub async fn tick(&self, state: &mut LoopState, now: OffsetDateTime) -> Result<()> {
        let controls = Controls::from_value(
            &self.store.get("controls").await.context("failed to read controls")?,
        );
        let device_state = self.store.get("state").await.context("failed to read state")?;

        if controls.is_auto() {
            self.decide(&controls, &device_state, state, now).await?;
        }

        let now_ts = now.unix_timestamp();
        if state.forecast_due(now_ts, self.config.forecast_interval_sec) {
            self.run_forecast(&device_state, now).await?;
            state.last_forecast_ts = Some(now_ts);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Decision
    // -----------------------------------------------------------------------

    async fn decide(
        &self,
        controls: &Controls,
        device_state: &Value,
        state: &mut LoopState,
        now: OffsetDateTime,
    ) -> Result<()> {
        let row = build_row_from_state(device_state, now)?;
        let input = resolve_columns(&self.decision.model, &self.decision.meta, &row)?;
        let pred = self
            .decision
            .model
            .predict(&input.values)
            .context("decision model failed")?;

        let labels = decode_prediction(&pred, &self.decision.meta);
        let decision = interpret_decision(&pred, &row, &labels, self.config.soil_irrigate_threshold)
            .gated_by_power(controls.power);

        if !state.pump_changed(decision.pump) {
            return Ok(());
        }

        self.store
            .update("controls", &json!({ "pump_auto": decision.pump }))
            .await
            .context("failed to write pump_auto")?;

        let label = ["label_soil", "label"]
            .iter()
            .filter_map(|k| labels.get(*k))
            .find(|l| !l.is_empty())
            .cloned()
            .unwrap_or_default();

        let now_doc = json!({
            "pump_auto": decision.pump,
            "mode": controls.mode,
            "power": controls.power,
            "row": row.to_json(),
            "labels": labels,
            "label": label,
            "rule_labels": rule_labels(&row),
            "source": decision.source,
            "ts": now.unix_timestamp(),
            "iso": iso(now)?,
        });
        self.store
            .set("ai/now", &now_doc)
            .await
            .context("failed to write ai/now")?;

        info!(pump_auto = decision.pump, source = ?decision.source, ?labels, "decision");
        state.last_pump = Some(decision.pump);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Forecast
    // -----------------------------------------------------------------------

    async fn run_forecast(&self, device_state: &Value, now: OffsetDateTime) -> Result<()> {
        let row = build_row_from_state(device_state, now)?;
        let (input, degraded) = self.forecast_input(&row, now).await?;
        let pred = self
            .forecast
            .model
            .predict(&input.values)
            .context("forecast model failed")?;

        let threshold = self.config.soil_irrigate_threshold;
        let step_minutes = self.config.step_minutes;
        let outcome = interpret_forecast(&pred, threshold, step_minutes)?;

        let forecast_doc = json!({
            "soil_future": outcome.soil_future,
            "threshold": threshold,
            "step_minutes": step_minutes,
            "text": outcome.text,
            "next_irrigation_min": outcome.next_irrigation_min,
            "row_now": row.to_json(),
            "degraded": degraded,
            "ts": now.unix_timestamp(),
            "iso": iso(now)?,
        });
        self.store
            .set("ai/forecast", &forecast_doc)
            .await
            .context("failed to write ai/forecast")?;

        self.store
            .update(
                "controls",
                &json!({
                    "forecast_text": outcome.text,
                    "forecast_next_min": outcome.next_irrigation_min.unwrap_or(-1),
                    "forecast_soil_now": row.soil_percent,
                    "forecast_soil_min_horizon": outcome.min_or(row.soil_percent),
                }),
            )
            .await
            .context("failed to write forecast controls")?;

        info!(text = %outcome.text, steps = outcome.soil_future.len(), degraded, "forecast");
        Ok(())
    }

    /// Single-step input for narrow models, otherwise a sequence built from
    /// telemetry history. The flag is set when the telemetry read failed and
    /// the sequence is only padded copies of `row`.
    async fn forecast_input(
        &self,
        row: &FeatureRow,
        now: OffsetDateTime,
    ) -> Result<(ModelInput, bool)> {
        let Some(shape) = sequence_shape(&self.forecast.model)? else {
            let input = resolve_columns(&self.forecast.model, &self.forecast.meta, row)?;
            return Ok((input, false));
        };

        let (raw, degraded) = match self.store.get("telemetry").await {
            Ok(raw) => (raw, false),
            Err(e) => {
                warn!("telemetry unavailable, using current reading only: {e:#}");
                (Value::Null, true)
            }
        };
        let points = extract_points(&raw);
        let input = build_sequence(shape, &points, row, now, self.config.step_minutes);
        Ok((input, degraded))
    }
}

fn iso(now: OffsetDateTime) -> Result<String> {
    now.format(&Rfc3339).context("failed to format timestamp")
}

// ===========================================================================
// Tests
// ===========================================================================
