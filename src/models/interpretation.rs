use serde::{Deserialize, Serialize};

use crate::models::{DateRange, ReportType};

/// Body of `POST /ia/interpretar`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterpretBody {
    pub texto_solicitud: Option<String>,
    #[serde(default)]
    pub contexto: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterpretationParams {
    pub limite: Option<i64>,
    pub ordenar_por: Option<String>,
    pub filtro: Option<String>,
}

/// Best-effort structured reading of a free-text report request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    pub tipo_reporte: String,
    pub modulo: ReportType,
    pub periodo: DateRange,
    pub parametros: InterpretationParams,
    pub formato_salida: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterpretResponse {
    pub success: bool,
    pub solicitud_original: String,
    pub interpretacion: Interpretation,
}
