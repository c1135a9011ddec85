use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::models::{DateRange, ReportType};

/// A single scalar cell of a metric record. Records are flat: text or numbers only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Number(v) => format!("{:.2}", v),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

/// Ordered field list; serializes as a JSON object keeping column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricRecord {
    fields: Vec<(String, FieldValue)>,
}

impl MetricRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.push(name, FieldValue::Text(value.into()));
        self
    }

    /// A missing value is written as an empty string.
    pub fn opt_text(self, name: &str, value: Option<String>) -> Self {
        self.text(name, value.unwrap_or_default())
    }

    pub fn int(mut self, name: &str, value: i64) -> Self {
        self.push(name, FieldValue::Int(value));
        self
    }

    /// Non-finite values are stored as zero so the record stays JSON-safe.
    pub fn number(mut self, name: &str, value: f64) -> Self {
        let value = if value.is_finite() { round2(value) } else { 0.0 };
        self.push(name, FieldValue::Number(value));
        self
    }

    /// Replaces an existing field in place, or appends it.
    pub fn push(&mut self, name: &str, value: FieldValue) {
        match self.fields.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn extend(&mut self, other: MetricRecord) {
        for (name, value) in other.fields {
            self.push(&name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }
}

impl Serialize for MetricRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricGroup {
    pub name: String,
    pub records: Vec<MetricRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricGroups(Vec<MetricGroup>);

impl MetricGroups {
    /// Registers a group; a later insert under the same name replaces the rows.
    pub fn insert(&mut self, name: &str, records: Vec<MetricRecord>) {
        match self.0.iter_mut().find(|g| g.name == name) {
            Some(group) => group.records = records,
            None => self.0.push(MetricGroup { name: name.to_string(), records }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[MetricRecord]> {
        self.0.iter().find(|g| g.name == name).map(|g| g.records.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricGroup> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|g| g.name.as_str()).collect()
    }
}

impl Serialize for MetricGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for group in &self.0 {
            map.serialize_entry(&group.name, &group.records)?;
        }
        map.end()
    }
}

/// Request-scoped result of the aggregation stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedReportData {
    #[serde(rename = "tipo")]
    pub report_type: ReportType,
    #[serde(rename = "periodo")]
    pub period: DateRange,
    #[serde(rename = "resumen")]
    pub summary: MetricRecord,
    #[serde(rename = "grupos")]
    pub groups: MetricGroups,
}

impl AggregatedReportData {
    pub fn new(report_type: ReportType, period: DateRange) -> Self {
        Self {
            report_type,
            period,
            summary: MetricRecord::new(),
            groups: MetricGroups::default(),
        }
    }

    pub fn group(&self, name: &str) -> Option<&[MetricRecord]> {
        self.groups.get(name)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Zero-safe division: an empty denominator yields 0 instead of NaN/inf.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}
