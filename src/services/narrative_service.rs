use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::errors::{AppError, LlmError};
use crate::models::{AggregatedReportData, NarrativeResult, NarrativeSource};
use crate::services::llm_service::LlmService;
use crate::services::report_registry::ReportSpec;

const SYSTEM_INSTRUCTION: &str = "Eres un analista de negocios especializado en panaderías. \
Generas reportes claros basados únicamente en los datos entregados, con insights accionables \
y recomendaciones justificadas con cifras. Responde siempre con un único objeto JSON con las \
claves \"analysis\" (texto), \"insights\" (lista de textos) y \"recommendations\" (lista de \
textos); puedes añadir las claves extra que pida la solicitud. No incluyas texto fuera del JSON.";

const ANALYSIS_KEYS: [&str; 5] = ["analysis", "analisis", "análisis", "resumen", "summary"];
const INSIGHT_KEYS: [&str; 1] = ["insights"];
const RECOMMENDATION_KEYS: [&str; 2] = ["recommendations", "recomendaciones"];

/// Longest line, markup stripped, still read as a section heading.
const MAX_HEADING_CHARS: usize = 40;

/// Outermost `{...}` span of a model reply, across lines.
pub(crate) static JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("JSON block pattern is valid"));

/// Ask the narrative model to interpret the aggregated data.
pub async fn generate_narrative(
    llm: &LlmService,
    spec: &ReportSpec,
    data: &AggregatedReportData,
    free_text: Option<&str>,
) -> Result<NarrativeResult, AppError> {
    if !llm.is_enabled() {
        return Err(AppError::Llm(LlmError::Disabled));
    }

    let prompt = build_prompt(spec, data, free_text);
    info!("Requesting narrative for '{}' report ({} prompt chars)", spec.report_type, prompt.len());

    let reply = llm.generate_completion(SYSTEM_INSTRUCTION, prompt).await?;
    let narrative = parse_narrative(&reply);
    info!("Narrative parsed via {:?}", narrative.source);
    Ok(narrative)
}

/// Fills the type template with the pretty JSON of the data and appends the
/// user's own request, if any.
pub fn build_prompt(spec: &ReportSpec, data: &AggregatedReportData, free_text: Option<&str>) -> String {
    let datos = serde_json::to_string_pretty(data).unwrap_or_else(|e| {
        warn!("Could not serialize report data for prompt: {}", e);
        String::from("{}")
    });

    let mut prompt = spec.prompt.replace("{datos}", &datos);
    if let Some(text) = free_text.map(str::trim).filter(|t| !t.is_empty()) {
        prompt.push_str("\n\nSolicitud del usuario:\n");
        prompt.push_str(text);
    }
    prompt
}

/// Never fails: each tier is tried in order and the raw text is the last resort.
pub fn parse_narrative(reply: &str) -> NarrativeResult {
    if let Some(result) = parse_structured(reply) {
        return result;
    }
    warn!("Narrative reply is not a JSON object, looking for an embedded block");

    if let Some(result) = extract_embedded_block(reply) {
        return result;
    }
    warn!("No embedded JSON block in narrative reply, scanning for bullet lists");

    if let Some(result) = scan_bullets(reply) {
        return result;
    }
    warn!("Narrative reply has no recognizable structure, passing it through as analysis");

    NarrativeResult::raw(reply)
}

pub fn parse_structured(reply: &str) -> Option<NarrativeResult> {
    match serde_json::from_str::<Value>(reply.trim()) {
        Ok(Value::Object(map)) => Some(from_object(map, NarrativeSource::Structured)),
        _ => None,
    }
}

pub fn extract_embedded_block(reply: &str) -> Option<NarrativeResult> {
    let block = JSON_BLOCK.find(reply)?.as_str();
    match serde_json::from_str::<Value>(block) {
        Ok(Value::Object(map)) => Some(from_object(map, NarrativeSource::EmbeddedBlock)),
        _ => None,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Heading {
    Insights,
    Recommendations,
}

/// Collects bullet lines that follow an insight or recommendation heading.
/// Headings may themselves be numbered (`3. Insights clave`); prose lines
/// inside a section are skipped without closing it.
pub fn scan_bullets(reply: &str) -> Option<NarrativeResult> {
    let mut insights = Vec::new();
    let mut recommendations = Vec::new();
    let mut current: Option<Heading> = None;

    for line in reply.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let item = strip_bullet(line);
        if let Some(heading) = heading_of(item.unwrap_or(line)) {
            current = Some(heading);
            continue;
        }

        match (item, current) {
            (Some(item), Some(Heading::Insights)) => insights.push(item.to_string()),
            (Some(item), Some(Heading::Recommendations)) => recommendations.push(item.to_string()),
            _ => {}
        }
    }

    if insights.is_empty() && recommendations.is_empty() {
        return None;
    }

    Some(NarrativeResult {
        analysis: reply.to_string(),
        insights,
        recommendations,
        extra: BTreeMap::new(),
        source: NarrativeSource::BulletScan,
    })
}

/// A short line naming the insight or recommendation section, with any
/// markdown emphasis, `#` or trailing colon ignored.
fn heading_of(text: &str) -> Option<Heading> {
    let label = text.trim_matches(|c: char| c == '*' || c == '#' || c == ':' || c == '_' || c.is_whitespace());
    if label.is_empty() || label.chars().count() > MAX_HEADING_CHARS {
        return None;
    }

    let lower = label.to_lowercase();
    if lower.contains("insight") {
        Some(Heading::Insights)
    } else if lower.contains("recomendaci") || lower.contains("recommendation") {
        Some(Heading::Recommendations)
    } else {
        None
    }
}

/// Returns the item text of a `-`, `*`, `•`, `1.` or `1)` bullet line.
fn strip_bullet(line: &str) -> Option<&str> {
    for marker in ['-', '*', '•'] {
        if let Some(rest) = line.strip_prefix(marker) {
            if rest.starts_with(char::is_whitespace) {
                return non_empty(rest);
            }
            return None;
        }
    }

    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    let rest = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'))?;
    if rest.starts_with(char::is_whitespace) {
        non_empty(rest)
    } else {
        None
    }
}

fn non_empty(rest: &str) -> Option<&str> {
    let item = rest.trim();
    (!item.is_empty()).then_some(item)
}

fn from_object(mut map: Map<String, Value>, source: NarrativeSource) -> NarrativeResult {
    let analysis = take_first(&mut map, &ANALYSIS_KEYS).map(|v| match v {
        Value::String(s) => s,
        other => other.to_string(),
    });
    let insights = take_first(&mut map, &INSIGHT_KEYS).map(into_list).unwrap_or_default();
    let recommendations = take_first(&mut map, &RECOMMENDATION_KEYS)
        .map(into_list)
        .unwrap_or_default();

    let analysis = match analysis {
        Some(text) => text,
        None => Value::Object(map.clone()).to_string(),
    };

    NarrativeResult {
        analysis,
        insights,
        recommendations,
        extra: map.into_iter().collect(),
        source,
    }
}

/// Removes every alias from `map`, keeping the first one present.
fn take_first(map: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    let mut found = None;
    for key in keys {
        if let Some(value) = map.remove(*key) {
            found.get_or_insert(value);
        }
    }
    found
}

fn into_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::String(s) => vec![s],
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportType;
    use crate::services::report_registry;
    use crate::test_support::{march_2024, StubLlm};
    use std::sync::Arc;

    #[test]
    fn structured_reply_round_trips() {
        let result = parse_narrative(r#"{"analysis":"x","insights":["a"],"recommendations":["b"]}"#);
        assert_eq!(result.analysis, "x");
        assert_eq!(result.insights, vec!["a"]);
        assert_eq!(result.recommendations, vec!["b"]);
        assert!(result.extra.is_empty());
        assert_eq!(result.source, NarrativeSource::Structured);
    }

    #[test]
    fn spanish_keys_and_extras_are_understood() {
        let result = parse_narrative(
            r#"{"resumen":"Buen mes","insights":["Pan lidera", 3],"recomendaciones":"Subir stock","proyeccion":{"abril":1200}}"#,
        );
        assert_eq!(result.analysis, "Buen mes");
        assert_eq!(result.insights, vec!["Pan lidera", "3"]);
        assert_eq!(result.recommendations, vec!["Subir stock"]);
        assert_eq!(result.extra["proyeccion"]["abril"], 1200);
    }

    #[test]
    fn object_without_analysis_uses_its_json() {
        let result = parse_narrative(r#"{"insights":["a"],"riesgos":["r"]}"#);
        assert_eq!(result.analysis, r#"{"riesgos":["r"]}"#);
        assert_eq!(result.insights, vec!["a"]);
    }

    #[test]
    fn embedded_block_is_extracted_from_prose() {
        let reply = "Claro, aquí está:\n```json\n{\"analysis\": \"ok\", \"insights\": [], \"recommendations\": [\"r\"]}\n```";
        let result = parse_narrative(reply);
        assert_eq!(result.source, NarrativeSource::EmbeddedBlock);
        assert_eq!(result.analysis, "ok");
        assert_eq!(result.recommendations, vec!["r"]);
    }

    #[test]
    fn bullets_under_headings_are_scanned() {
        let reply = "Las ventas subieron.\n\n**Insights:**\n- El pan es el más vendido\n* Los sábados venden más\n\nRecomendaciones\n1. Hornear más baguettes\n2) Promocionar tortas\n\nGracias.";
        let result = parse_narrative(reply);
        assert_eq!(result.source, NarrativeSource::BulletScan);
        assert_eq!(result.insights, vec!["El pan es el más vendido", "Los sábados venden más"]);
        assert_eq!(result.recommendations, vec!["Hornear más baguettes", "Promocionar tortas"]);
        assert_eq!(result.analysis, reply);
    }

    #[test]
    fn json_block_spans_lines_and_serves_repeated_calls() {
        for reply in ["a {\"x\":\n1} b", "antes\n{\"y\": {\"z\": 2}}\ndespués"] {
            let block = JSON_BLOCK.find(reply).unwrap().as_str();
            assert!(serde_json::from_str::<Value>(block).unwrap().is_object());
        }
        assert!(JSON_BLOCK.find("sin llaves").is_none());
    }

    #[test]
    fn numbered_section_headings_open_sections() {
        let reply = "Resumen del mes.\n\n1. Insights clave\n- El pan lidera\n- Sábados fuertes\n2. Recomendaciones accionables\n- Hornear más\n";
        let result = parse_narrative(reply);
        assert_eq!(result.source, NarrativeSource::BulletScan);
        assert_eq!(result.insights, vec!["El pan lidera", "Sábados fuertes"]);
        assert_eq!(result.recommendations, vec!["Hornear más"]);
    }

    #[test]
    fn intro_prose_under_a_heading_keeps_the_section_open() {
        let reply = "Insights:\nEstos son los hallazgos del período:\n- El pan lidera\nRecomendaciones:\nSugerimos:\n- Hornear más\n";
        let result = parse_narrative(reply);
        assert_eq!(result.source, NarrativeSource::BulletScan);
        assert_eq!(result.insights, vec!["El pan lidera"]);
        assert_eq!(result.recommendations, vec!["Hornear más"]);
    }

    #[test]
    fn long_bullets_mentioning_a_keyword_stay_items() {
        let reply = "Recomendaciones\n- Revisar las recomendaciones del proveedor de harina antes de abril";
        let result = scan_bullets(reply).unwrap();
        assert_eq!(
            result.recommendations,
            vec!["Revisar las recomendaciones del proveedor de harina antes de abril"]
        );
    }

    #[test]
    fn bullets_without_heading_are_ignored() {
        assert!(scan_bullets("Resumen:\n- uno\n- dos").is_none());
    }

    #[test]
    fn plain_prose_is_passed_through() {
        let reply = "  Las ventas fueron estables durante el mes.\n";
        let result = parse_narrative(reply);
        assert_eq!(result.source, NarrativeSource::RawText);
        assert_eq!(result.analysis, reply);
        assert!(result.insights.is_empty());
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn broken_json_block_falls_through() {
        let result = parse_narrative("Resultado: {analysis: sin comillas}");
        assert_eq!(result.source, NarrativeSource::RawText);
    }

    #[test]
    fn bullet_markers() {
        assert_eq!(strip_bullet("- uno"), Some("uno"));
        assert_eq!(strip_bullet("• dos"), Some("dos"));
        assert_eq!(strip_bullet("12. doce"), Some("doce"));
        assert_eq!(strip_bullet("3) tres"), Some("tres"));
        assert_eq!(strip_bullet("**Insights**"), None);
        assert_eq!(strip_bullet("2024 fue bueno"), None);
        assert_eq!(strip_bullet("-"), None);
    }

    #[test]
    fn prompt_embeds_data_and_user_request() {
        let spec = report_registry::lookup(ReportType::Ventas);
        let data = AggregatedReportData::new(ReportType::Ventas, march_2024());
        let prompt = build_prompt(spec, &data, Some("  enfócate en los sábados "));
        assert!(prompt.contains("\"tipo\": \"ventas\""));
        assert!(!prompt.contains("{datos}"));
        assert!(prompt.ends_with("Solicitud del usuario:\nenfócate en los sábados"));
    }

    #[tokio::test]
    async fn disabled_model_is_an_error() {
        let spec = report_registry::lookup(ReportType::General);
        let data = AggregatedReportData::new(ReportType::General, march_2024());
        let err = generate_narrative(&LlmService::disabled(), spec, &data, None).await.unwrap_err();
        assert!(matches!(err, AppError::Llm(LlmError::Disabled)));
    }

    #[tokio::test]
    async fn model_reply_is_parsed() {
        let stub = Arc::new(StubLlm::replying(r#"{"analysis":"bien","insights":[],"recommendations":[]}"#));
        let llm = LlmService::with_provider(stub.clone());
        let spec = report_registry::lookup(ReportType::Ventas);
        let data = AggregatedReportData::new(ReportType::Ventas, march_2024());

        let narrative = generate_narrative(&llm, spec, &data, None).await.unwrap();
        assert_eq!(narrative.analysis, "bien");
        assert_eq!(stub.calls(), 1);
        assert!(stub.last_system().contains("analysis"));
    }
}
