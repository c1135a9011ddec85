use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Map, Value};
use tracing::info;

use crate::errors::AppError;
use crate::models::{GenerateReportBody, PreviewQuery, PreviewResponse, ReportResponse};
use crate::routes::today;
use crate::services::{report_registry, report_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tipos", get(list_types))
        .route("/generar", post(generate))
        .route("/preview/:tipo", get(preview))
}

async fn list_types() -> Json<Value> {
    info!("GET /api/reportes/tipos");
    let types: Map<String, Value> = report_registry::all()
        .map(|spec| {
            (
                spec.report_type.key().to_uppercase(),
                Value::String(spec.description.to_string()),
            )
        })
        .collect();
    Json(Value::Object(types))
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateReportBody>, JsonRejection>,
) -> Result<Json<ReportResponse>, AppError> {
    info!("POST /api/reportes/generar");
    let Json(body) = payload?;
    let request = report_service::request_from_body(body, &state.config, today())?;
    report_service::generate(&state, request).await.map(Json)
}

async fn preview(
    State(state): State<AppState>,
    Path(tipo): Path<String>,
    query: Result<Query<PreviewQuery>, QueryRejection>,
) -> Result<Json<PreviewResponse>, AppError> {
    info!("GET /api/reportes/preview/{}", tipo);
    let Query(query) = query?;
    report_service::preview(&state, &tipo, query, today()).await.map(Json)
}
