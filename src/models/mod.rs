mod aggregate;
mod interpretation;
mod narrative;
mod report;
pub mod rows;

pub use aggregate::{ratio, AggregatedReportData, FieldValue, MetricGroup, MetricRecord};
pub use interpretation::{InterpretBody, InterpretResponse, Interpretation, InterpretationParams};
pub use narrative::{NarrativeResult, NarrativeSource};
pub use report::{
    DateRange, GenerateReportBody, LegacyReportBody, LegacyReportResponse, OutputFormat, PreviewQuery,
    PreviewResponse, RenderedArtifact, ReportRequest, ReportResponse, ReportType,
};
