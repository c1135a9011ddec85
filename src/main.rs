mod app;
mod config;
mod db;
mod errors;
mod logging;
mod models;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::db::PgReportStore;
use crate::logging::LoggingConfig;
use crate::services::llm_service::{LlmConfig, LlmService};
use crate::services::render_service::ReportRenderer;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    let logging_config = LoggingConfig::from_env().context("invalid logging configuration")?;
    logging::init_logging(logging_config)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let config = AppConfig::from_env().context("invalid server configuration")?;
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("cannot create output directory {}", config.output_dir.display()))?;

    // Connections are opened on first use so the service starts without a reachable database.
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout)
        .connect_lazy_with(config.database.connect_options().context("invalid database settings")?);

    let llm_config = LlmConfig::from_env().context("invalid LLM configuration")?;
    let llm = LlmService::new(&llm_config).context("cannot build LLM client")?;
    if !llm.is_enabled() {
        tracing::warn!("No LLM API key configured; report generation and interpretation will fail");
    }

    let renderer = ReportRenderer::new(config.output_dir.clone(), config.bakery.clone());
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(PgReportStore::new(pool)),
        llm: Arc::new(llm),
        renderer: Arc::new(renderer),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    tracing::info!("🚀 Bakery report service running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
