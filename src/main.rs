//! # HR Service Main Entry Point

use anyhow::Context;
use hr_service::{
    config::ConfigLoader,
    db::{init_pool, run_migrations},
    seeds::seed_all,
    server::{AppState, run_server},
    telemetry::init_tracing,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from layered env files and variables
    let config = ConfigLoader::new().load()?;

    init_tracing(&config)?;
    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = init_pool(&config).await?;
    run_migrations(&db).await?;
    seed_all(&db, &config)
        .await
        .context("Failed to seed database")?;

    let state = AppState::new(config, db)?;
    run_server(state).await
}
