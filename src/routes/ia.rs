use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::errors::AppError;
use crate::models::{InterpretBody, InterpretResponse, LegacyReportBody, LegacyReportResponse, ReportType};
use crate::routes::today;
use crate::services::{interpret_service, report_registry, report_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/modulos", get(list_modules))
        .route("/interpretar", post(interpret))
        .route("/generar-reporte", post(generate_report))
        .route("/reportes/ejemplos/:modulo", get(module_examples))
        .route("/contexto/empresa", get(company_context))
}

/// GET /ia/modulos
async fn list_modules() -> Json<Value> {
    info!("GET /ia/modulos");
    let mut details = Map::new();
    for spec in report_registry::all() {
        details.insert(spec.report_type.key().to_string(), json!(spec.group_names()));
    }
    let keys: Vec<&str> = ReportType::ALL.iter().map(|t| t.key()).collect();

    Json(json!({
        "modulos_disponibles": keys,
        "detalles": details,
    }))
}

/// POST /ia/interpretar
async fn interpret(
    State(state): State<AppState>,
    payload: Result<Json<InterpretBody>, JsonRejection>,
) -> Result<Json<InterpretResponse>, AppError> {
    info!("POST /ia/interpretar");
    let Json(body) = payload?;
    interpret_service::interpret(&state.llm, body, today()).await.map(Json)
}

/// POST /ia/generar-reporte
async fn generate_report(
    State(state): State<AppState>,
    payload: Result<Json<LegacyReportBody>, JsonRejection>,
) -> Result<Json<LegacyReportResponse>, AppError> {
    info!("POST /ia/generar-reporte");
    let Json(body) = payload?;
    report_service::generate_legacy(&state, body, today()).await.map(Json)
}

/// GET /ia/reportes/ejemplos/:modulo
async fn module_examples(Path(modulo): Path<String>) -> Result<Json<Value>, AppError> {
    info!("GET /ia/reportes/ejemplos/{}", modulo);
    let spec = report_registry::lookup(ReportType::parse(&modulo));
    if spec.examples.is_empty() {
        return Err(AppError::Validation(format!("Módulo '{}' no tiene ejemplos", modulo)));
    }

    Ok(Json(json!({
        "modulo": spec.report_type.key(),
        "ejemplos": spec.examples,
    })))
}

/// GET /ia/contexto/empresa
async fn company_context(State(state): State<AppState>) -> Json<Value> {
    info!("GET /ia/contexto/empresa");
    let mut types = Map::new();
    let mut examples = Map::new();
    for spec in report_registry::all() {
        let key = spec.report_type.key().to_string();
        types.insert(key.clone(), json!(spec.description));
        if !spec.examples.is_empty() {
            examples.insert(key, json!(spec.examples));
        }
    }
    let modules: Vec<&str> = ReportType::ALL.iter().map(|t| t.key()).collect();

    Json(json!({
        "success": true,
        "contexto": {
            "nombre_empresa": state.config.bakery.name,
            "modulos_disponibles": modules,
            "tipos_reportes": types,
            "ejemplos": examples,
        }
    }))
}
