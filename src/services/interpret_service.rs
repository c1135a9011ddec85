use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::{AppError, LlmError};
use crate::models::{InterpretBody, InterpretResponse, Interpretation, InterpretationParams, OutputFormat, ReportType};
use crate::services::date_range::{self, DefaultWindow};
use crate::services::llm_service::LlmService;
use crate::services::narrative_service::JSON_BLOCK;

pub const MIN_REQUEST_CHARS: usize = 10;
pub const MAX_REQUEST_CHARS: usize = 500;

const INTERPRET_INSTRUCTION: &str = r#"Eres un asistente que interpreta solicitudes de reportes para una panadería.
Responde SOLO con un objeto JSON válido, sin explicaciones, con esta estructura:

{
  "tipo_reporte": "ventas_total|ventas_categoria|clientes_top|productos_top|estado_stock|bajo_stock|produccion_periodo|estado_pedidos|compras_periodo|segmentacion_clientes|resumen_financiero|tendencias_ventas",
  "modulo": "ventas|inventario|produccion|pedidos|compras|clientes|financiero|tendencias|general",
  "periodo": {"fecha_inicio": "YYYY-MM-DD", "fecha_fin": "YYYY-MM-DD"},
  "parametros": {"limite": 10, "ordenar_por": "total|cantidad|nombre", "filtro": "categoría o null"},
  "formato_salida": "json|excel|pdf"
}

Reglas:
- Si no se indican fechas, usa el mes actual.
- Si no se indica formato, usa "json".
- Si se piden "top", "principales" o "mejores", usa limite 10.
- "venta", "cliente", "producto vendido" → ventas; "inventario", "stock" → inventario;
  "producción", "receta" → produccion; "pedido", "entrega" → pedidos; "compra", "proveedor" → compras."#;

/// Trimmed request text, or a 400 when it is missing, shorter than 10 or
/// longer than 500 characters.
pub fn validate_request_text(text: Option<&str>) -> Result<String, AppError> {
    let text = text.map(str::trim).unwrap_or_default();
    let chars = text.chars().count();

    if chars < MIN_REQUEST_CHARS {
        return Err(AppError::Validation(format!(
            "texto_solicitud debe tener al menos {} caracteres",
            MIN_REQUEST_CHARS
        )));
    }
    if chars > MAX_REQUEST_CHARS {
        return Err(AppError::Validation(format!(
            "texto_solicitud no puede superar {} caracteres",
            MAX_REQUEST_CHARS
        )));
    }
    Ok(text.to_string())
}

pub async fn interpret(llm: &LlmService, body: InterpretBody, today: NaiveDate) -> Result<InterpretResponse, AppError> {
    let text = validate_request_text(body.texto_solicitud.as_deref())?;
    if !llm.is_enabled() {
        return Err(AppError::Llm(LlmError::Disabled));
    }

    let mut prompt = text.clone();
    if let Some(context) = body.contexto.filter(|c| !c.is_null()) {
        prompt.push_str("\n\nContexto adicional:\n");
        prompt.push_str(&context.to_string());
    }

    let reply = llm.generate_completion(INTERPRET_INSTRUCTION, prompt).await?;
    let interpretation = parse_interpretation(&reply, today);
    info!(
        "Interpreted request as module '{}' ({})",
        interpretation.modulo, interpretation.tipo_reporte
    );

    Ok(InterpretResponse {
        success: true,
        solicitud_original: text,
        interpretacion: interpretation,
    })
}

/// Strict JSON, then an embedded `{...}` block, then a default reading that
/// carries a `parse_error` note.
pub fn parse_interpretation(reply: &str, today: NaiveDate) -> Interpretation {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(reply.trim()) {
        return normalize(&Value::Object(map), today, None);
    }

    let embedded = JSON_BLOCK
        .find(reply)
        .and_then(|block| serde_json::from_str::<Value>(block.as_str()).ok())
        .filter(Value::is_object);

    match embedded {
        Some(value) => normalize(&value, today, None),
        None => {
            warn!("Could not parse interpretation reply, using default reading");
            normalize(
                &Value::Null,
                today,
                Some("No se pudo interpretar la respuesta del modelo".to_string()),
            )
        }
    }
}

fn normalize(value: &Value, today: NaiveDate, parse_error: Option<String>) -> Interpretation {
    let text = |v: &Value| v.as_str().map(str::trim).filter(|s| !s.is_empty()).map(String::from);

    let modulo = text(&value["modulo"])
        .map(|m| ReportType::parse(&m))
        .unwrap_or(ReportType::Ventas);

    let periodo = &value["periodo"];
    let start = periodo["fecha_inicio"].as_str();
    let end = periodo["fecha_fin"].as_str();
    let period = date_range::resolve(start, end, today, DefaultWindow::CurrentMonth).unwrap_or_else(|_| {
        warn!("Interpreted period is inverted, using current month");
        date_range::current_month_range(today)
    });

    let params = &value["parametros"];
    let formato = text(&value["formato_salida"])
        .and_then(|f| OutputFormat::parse(&f))
        .unwrap_or(OutputFormat::Json);

    Interpretation {
        tipo_reporte: text(&value["tipo_reporte"]).unwrap_or_else(|| "ventas_total".to_string()),
        modulo,
        periodo: period,
        parametros: InterpretationParams {
            limite: params["limite"].as_i64(),
            ordenar_por: text(&params["ordenar_por"]),
            filtro: text(&params["filtro"]).filter(|f| f != "null"),
        },
        formato_salida: formato.key().to_string(),
        parse_error,
    }
}
