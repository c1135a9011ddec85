use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{
    GenerateReportBody, LegacyReportBody, LegacyReportResponse, OutputFormat, PreviewQuery, PreviewResponse,
    ReportRequest, ReportResponse, ReportType,
};
use crate::services::date_range::{self, DefaultWindow};
use crate::services::interpret_service::validate_request_text;
use crate::services::{aggregation_service, narrative_service, report_registry};
use crate::state::AppState;

const MAX_ROW_LIMIT: i64 = 100;

fn parse_formats(raw: Option<&[String]>) -> Result<Vec<OutputFormat>, AppError> {
    let mut formats = Vec::new();
    for name in raw.unwrap_or_default() {
        let format = OutputFormat::parse(name)
            .ok_or_else(|| AppError::Validation(format!("Formato no soportado: {}", name)))?;
        formats.push(format);
    }
    if formats.is_empty() {
        formats.push(OutputFormat::Json);
    }
    formats.sort();
    formats.dedup();
    Ok(formats)
}

/// Normalizes a `POST /api/reportes/generar` body. Missing dates default to
/// the trailing window ending today.
pub fn request_from_body(
    body: GenerateReportBody,
    config: &AppConfig,
    today: NaiveDate,
) -> Result<ReportRequest, AppError> {
    let report_type = ReportType::parse(body.tipo_reporte.as_deref().unwrap_or("general"));
    let period = date_range::resolve(
        body.fecha_inicio.as_deref(),
        body.fecha_fin.as_deref(),
        today,
        DefaultWindow::Trailing(config.default_window_days),
    )?;

    let mut output_formats = parse_formats(body.formatos.as_deref())?;
    if body.incluir_graficos && !output_formats.contains(&OutputFormat::Spreadsheet) {
        output_formats.push(OutputFormat::Spreadsheet);
        output_formats.sort();
    }

    Ok(ReportRequest {
        report_type,
        period,
        output_formats,
        free_text_prompt: body.prompt_custom.filter(|p| !p.trim().is_empty()),
        include_charts: body.incluir_graficos,
        row_limit: body.limite.unwrap_or(config.row_limit).clamp(1, MAX_ROW_LIMIT),
    })
}

/// Normalizes a `POST /ia/generar-reporte` body. The request text is checked
/// first, so an invalid text never reaches the store or the model.
pub fn request_from_legacy(
    body: LegacyReportBody,
    config: &AppConfig,
    today: NaiveDate,
) -> Result<(String, ReportRequest), AppError> {
    let text = validate_request_text(body.texto_solicitud.as_deref())?;

    let report_type = ReportType::parse(body.modulo.as_deref().unwrap_or("ventas"));
    let period = date_range::resolve(
        body.fecha_inicio.as_deref(),
        body.fecha_fin.as_deref(),
        today,
        DefaultWindow::CurrentMonth,
    )?;
    let formats = body.formato.map(|f| vec![f]);
    let output_formats = parse_formats(formats.as_deref())?;

    let request = ReportRequest {
        report_type,
        period,
        output_formats,
        free_text_prompt: Some(text.clone()),
        include_charts: false,
        row_limit: config.row_limit,
    };
    Ok((text, request))
}

/// Aggregation, narrative, then one artifact per requested format.
pub async fn generate(state: &AppState, request: ReportRequest) -> Result<ReportResponse, AppError> {
    let spec = report_registry::lookup(request.report_type);
    info!(
        "Generating '{}' report for {} (formats: {:?})",
        request.report_type, request.period, request.output_formats
    );

    let data = aggregation_service::aggregate(
        state.store.as_ref(),
        request.report_type,
        request.period,
        request.row_limit,
    )
    .await?;

    let narrative = narrative_service::generate_narrative(
        &state.llm,
        spec,
        &data,
        request.free_text_prompt.as_deref(),
    )
    .await?;

    let mut report = ReportResponse {
        id: Uuid::new_v4(),
        tipo_reporte: request.report_type,
        titulo: format!("Reporte de {}", spec.title),
        fecha_generacion: Utc::now(),
        periodo: request.period,
        datos: data,
        analisis_ia: narrative,
        archivos_generados: Vec::new(),
    };

    report.archivos_generados = state
        .renderer
        .render_all(&report, &request.output_formats, spec.title, request.include_charts)
        .await?;

    info!("Report {} generated with {} artifacts", report.id, report.archivos_generados.len());
    Ok(report)
}

pub async fn generate_legacy(
    state: &AppState,
    body: LegacyReportBody,
    today: NaiveDate,
) -> Result<LegacyReportResponse, AppError> {
    let (text, request) = request_from_legacy(body, &state.config, today)?;
    let modulo = request.report_type;
    let reporte = generate(state, request).await?;

    Ok(LegacyReportResponse {
        success: true,
        solicitud_original: text,
        modulo,
        reporte,
    })
}

/// Aggregation only: no narrative call and no files.
pub async fn preview(
    state: &AppState,
    tipo: &str,
    query: PreviewQuery,
    today: NaiveDate,
) -> Result<PreviewResponse, AppError> {
    let report_type = ReportType::parse(tipo);
    let period = date_range::resolve(
        query.fecha_inicio.as_deref(),
        query.fecha_fin.as_deref(),
        today,
        DefaultWindow::Trailing(state.config.default_window_days),
    )?;

    let data = aggregation_service::aggregate(state.store.as_ref(), report_type, period, state.config.row_limit).await?;

    Ok(PreviewResponse {
        tipo: report_type,
        datos_preview: data,
        periodo: period,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{date, test_config};

    #[test]
    fn body_defaults() {
        let config = test_config();
        let request = request_from_body(GenerateReportBody::default(), &config, date(2024, 3, 31)).unwrap();
        assert_eq!(request.report_type, ReportType::General);
        assert_eq!(request.output_formats, vec![OutputFormat::Json]);
        assert_eq!(request.period.start, date(2024, 3, 1));
        assert_eq!(request.period.end, date(2024, 3, 31));
        assert_eq!(request.row_limit, config.row_limit);
        assert!(request.free_text_prompt.is_none());
    }

    #[test]
    fn charts_force_spreadsheet_output() {
        let body = GenerateReportBody {
            tipo_reporte: Some("sales".into()),
            formatos: Some(vec!["pdf".into(), "JSON".into(), "pdf".into()]),
            incluir_graficos: true,
            limite: Some(500),
            ..Default::default()
        };
        let request = request_from_body(body, &test_config(), date(2024, 3, 31)).unwrap();
        assert_eq!(request.report_type, ReportType::Ventas);
        assert_eq!(
            request.output_formats,
            vec![OutputFormat::Json, OutputFormat::Spreadsheet, OutputFormat::Document]
        );
        assert_eq!(request.row_limit, MAX_ROW_LIMIT);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let body = GenerateReportBody {
            formatos: Some(vec!["docx".into()]),
            ..Default::default()
        };
        let err = request_from_body(body, &test_config(), date(2024, 3, 31)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn legacy_defaults_to_sales_for_current_month() {
        let body = LegacyReportBody {
            texto_solicitud: Some("¿Cuáles fueron mis ventas este mes?".into()),
            ..Default::default()
        };
        let (text, request) = request_from_legacy(body, &test_config(), date(2024, 2, 10)).unwrap();
        assert_eq!(request.report_type, ReportType::Ventas);
        assert_eq!(request.period.start, date(2024, 2, 1));
        assert_eq!(request.period.end, date(2024, 2, 29));
        assert_eq!(request.output_formats, vec![OutputFormat::Json]);
        assert_eq!(request.free_text_prompt.as_deref(), Some(text.as_str()));
    }

    #[test]
    fn legacy_short_text_is_rejected() {
        let body = LegacyReportBody {
            texto_solicitud: Some("ventas".into()),
            ..Default::default()
        };
        assert!(request_from_legacy(body, &test_config(), date(2024, 2, 10)).is_err());
    }
}
