use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AggregatedReportData, NarrativeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Ventas,
    Inventario,
    Produccion,
    Pedidos,
    Compras,
    Clientes,
    Financiero,
    Tendencias,
    General,
}

impl ReportType {
    pub const ALL: [ReportType; 9] = [
        ReportType::Ventas,
        ReportType::Inventario,
        ReportType::Produccion,
        ReportType::Pedidos,
        ReportType::Compras,
        ReportType::Clientes,
        ReportType::Financiero,
        ReportType::Tendencias,
        ReportType::General,
    ];

    /// Lenient parse: unknown or missing names resolve to `General`.
    pub fn parse(raw: &str) -> ReportType {
        match raw.trim().to_lowercase().as_str() {
            "ventas" | "sales" => ReportType::Ventas,
            "inventario" | "inventory" | "stock" => ReportType::Inventario,
            "produccion" | "producción" | "production" => ReportType::Produccion,
            "pedidos" | "orders" => ReportType::Pedidos,
            "compras" | "purchasing" | "purchases" => ReportType::Compras,
            "clientes" | "customers" => ReportType::Clientes,
            "financiero" | "financial" | "finanzas" => ReportType::Financiero,
            "tendencias" | "trends" => ReportType::Tendencias,
            _ => ReportType::General,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            ReportType::Ventas => "ventas",
            ReportType::Inventario => "inventario",
            ReportType::Produccion => "produccion",
            ReportType::Pedidos => "pedidos",
            ReportType::Compras => "compras",
            ReportType::Clientes => "clientes",
            ReportType::Financiero => "financiero",
            ReportType::Tendencias => "tendencias",
            ReportType::General => "general",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "excel")]
    Spreadsheet,
    #[serde(rename = "pdf")]
    Document,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Option<OutputFormat> {
        match raw.trim().to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "excel" | "xlsx" | "spreadsheet" => Some(OutputFormat::Spreadsheet),
            "pdf" | "document" => Some(OutputFormat::Document),
            _ => None,
        }
    }

    /// Wire name, matching the serde representation.
    pub fn key(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Spreadsheet => "excel",
            OutputFormat::Document => "pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Spreadsheet => "xlsx",
            OutputFormat::Document => "pdf",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(rename = "inicio")]
    pub start: NaiveDate,
    #[serde(rename = "fin")]
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} a {}", self.start, self.end)
    }
}

/// Fully resolved request handed to the report pipeline.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub report_type: ReportType,
    pub period: DateRange,
    pub output_formats: Vec<OutputFormat>,
    pub free_text_prompt: Option<String>,
    pub include_charts: bool,
    pub row_limit: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateReportBody {
    pub tipo_reporte: Option<String>,
    pub prompt_custom: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub formatos: Option<Vec<String>>,
    #[serde(default)]
    pub incluir_graficos: bool,
    pub limite: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacyReportBody {
    pub texto_solicitud: Option<String>,
    pub modulo: Option<String>,
    pub formato: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewQuery {
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedArtifact {
    #[serde(rename = "formato")]
    pub format: OutputFormat,
    #[serde(rename = "ruta")]
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse {
    pub id: Uuid,
    pub tipo_reporte: ReportType,
    pub titulo: String,
    pub fecha_generacion: DateTime<Utc>,
    pub periodo: DateRange,
    pub datos: AggregatedReportData,
    pub analisis_ia: NarrativeResult,
    pub archivos_generados: Vec<RenderedArtifact>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub tipo: ReportType,
    pub datos_preview: AggregatedReportData,
    pub periodo: DateRange,
}

#[derive(Debug, Serialize)]
pub struct LegacyReportResponse {
    pub success: bool,
    pub solicitud_original: String,
    pub modulo: ReportType,
    pub reporte: ReportResponse,
}
