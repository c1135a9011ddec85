use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which parsing tier produced a narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    /// The whole reply was a JSON object.
    Structured,
    /// A single `{...}` block was found inside surrounding prose.
    EmbeddedBlock,
    /// Bullet lines were scraped from under insight/recommendation headings.
    BulletScan,
    /// Nothing could be extracted; the reply is passed through as analysis.
    RawText,
}

/// Narrative analysis returned by the model, always present after a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeResult {
    pub analysis: String,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    /// Additional keys the template asked for (projections, risks, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
    pub source: NarrativeSource,
}

impl NarrativeResult {
    pub fn raw(text: &str) -> Self {
        Self {
            analysis: text.to_string(),
            insights: Vec::new(),
            recommendations: Vec::new(),
            extra: BTreeMap::new(),
            source: NarrativeSource::RawText,
        }
    }
}
