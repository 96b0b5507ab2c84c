mod auth;
mod columns;
mod config;
mod decision;
mod features;
mod forecast;
mod labels;
mod model;
mod rtdb;
mod sequence;
mod state;
mod worker;

use anyhow::{bail, Context, Result};
use std::{env, path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use auth::{ServiceAccount, TokenProvider};
use model::ModelBundle;
use rtdb::RtdbClient;
use worker::Worker;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ──────────────────────────────────────────────────────
    let config_path =
        PathBuf::from(env::var("CONFIG_PATH").unwrap_or_else(|_| "worker.toml".to_string()));
    let cfg = config::load(&config_path)?;

    info!(
        config = %config_path.display(),
        device = %cfg.device_id,
        database_url = %cfg.database_url,
        service_account = %cfg.service_account_path.display(),
        service_account_exists = cfg.service_account_path.exists(),
        decision_model = %cfg.decision_model_path.display(),
        decision_model_exists = cfg.decision_model_path.exists(),
        forecast_model = %cfg.forecast_model_path.display(),
        forecast_model_exists = cfg.forecast_model_path.exists(),
        "worker starting"
    );

    for (what, path) in [
        ("service account key", &cfg.service_account_path),
        ("decision model", &cfg.decision_model_path),
        ("forecast model", &cfg.forecast_model_path),
    ] {
        if !path.exists() {
            bail!("{what} not found: {}", path.display());
        }
    }

    // ── Models ──────────────────────────────────────────────────────
    let decision = ModelBundle::load(&cfg.decision_model_path).context("decision model")?;
    let forecast = ModelBundle::load(&cfg.forecast_model_path).context("forecast model")?;
    info!(
        n_features = ?decision.model.n_features(),
        meta_keys = ?decision.meta.keys,
        "decision model loaded"
    );
    info!(
        n_features = ?forecast.model.n_features(),
        meta_keys = ?forecast.meta.keys,
        "forecast model loaded"
    );

    // ── Database ────────────────────────────────────────────────────
    let account = ServiceAccount::load(&cfg.service_account_path)?;
    let tokens = TokenProvider::new(account, cfg.request_timeout())?;
    let store = RtdbClient::new(
        &cfg.database_url,
        &cfg.device_id,
        cfg.request_timeout(),
        Arc::new(tokens),
    )?;

    Worker::new(store, decision, forecast, cfg).run().await;
    Ok(())
}
