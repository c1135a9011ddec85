use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/health", get(api_health))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    info!("GET /health - Health check");
    Json(json!({
        "status": "ok",
        "service": state.config.service_name,
        "environment": state.config.environment,
    }))
}

async fn api_health(State(state): State<AppState>) -> Json<Value> {
    info!("GET /api/health - Health check");
    Json(json!({
        "status": "ok",
        "service": state.config.service_name,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
