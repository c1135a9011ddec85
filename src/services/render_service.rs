use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::BakeryProfile;
use crate::errors::AppError;
use crate::models::{AggregatedReportData, DateRange, NarrativeResult, OutputFormat, RenderedArtifact, ReportResponse, ReportType};
use crate::services::{document_renderer, spreadsheet_renderer};

/// Writes report artifacts into the output directory. Each call produces one
/// new file named by title, timestamp and report id; nothing is read back or
/// cleaned up.
pub struct ReportRenderer {
    output_dir: PathBuf,
    bakery: BakeryProfile,
}

const ID_SUFFIX_CHARS: usize = 8;

/// The report payload as exported to a `.json` artifact.
#[derive(Serialize)]
struct JsonExport<'a> {
    id: Uuid,
    tipo_reporte: ReportType,
    titulo: &'a str,
    fecha_generacion: DateTime<Utc>,
    periodo: DateRange,
    datos: &'a AggregatedReportData,
    analisis_ia: &'a NarrativeResult,
}

impl ReportRenderer {
    pub fn new(output_dir: PathBuf, bakery: BakeryProfile) -> Self {
        Self { output_dir, bakery }
    }

    /// Renders every requested format off the async runtime.
    pub async fn render_all(
        self: &Arc<Self>,
        report: &ReportResponse,
        formats: &[OutputFormat],
        file_title: &str,
        include_charts: bool,
    ) -> Result<Vec<RenderedArtifact>, AppError> {
        let mut artifacts = Vec::with_capacity(formats.len());

        for format in formats.iter().copied() {
            let renderer = Arc::clone(self);
            let report = report.clone();
            let title = file_title.to_string();

            let artifact = tokio::task::spawn_blocking(move || {
                renderer.render(format, &report, &title, include_charts)
            })
            .await
            .map_err(|e| AppError::Render(format!("render task failed: {}", e)))??;

            artifacts.push(artifact);
        }

        Ok(artifacts)
    }

    /// Blocking: writes one artifact of `format`.
    pub fn render(
        &self,
        format: OutputFormat,
        report: &ReportResponse,
        file_title: &str,
        include_charts: bool,
    ) -> Result<RenderedArtifact, AppError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.file_path(file_title, report.id, format, Utc::now());

        let result = match format {
            OutputFormat::Json => write_json(&path, report),
            OutputFormat::Spreadsheet => spreadsheet_renderer::write_workbook(&path, report, &self.bakery, include_charts),
            OutputFormat::Document => document_renderer::write_document(&path, report, &self.bakery),
        };

        if let Err(e) = &result {
            error!("Failed to render {} artifact at {}: {}", format.key(), path.display(), e);
        }
        result?;

        info!("Rendered {} artifact: {}", format.key(), path.display());
        Ok(RenderedArtifact {
            format,
            location: path.to_string_lossy().into_owned(),
        })
    }

    /// `Reporte_<title>_<YYYYmmdd_HHMMSS_mmm>_<id prefix>.<ext>`
    fn file_path(&self, title: &str, id: Uuid, format: OutputFormat, now: DateTime<Utc>) -> PathBuf {
        let id = id.simple().to_string();
        let name = format!(
            "Reporte_{}_{}_{}.{}",
            sanitize(title),
            now.format("%Y%m%d_%H%M%S_%3f"),
            &id[..ID_SUFFIX_CHARS],
            format.extension()
        );
        self.output_dir.join(name)
    }
}

fn sanitize(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "General".to_string()
    } else {
        cleaned
    }
}

fn write_json(path: &Path, report: &ReportResponse) -> Result<(), AppError> {
    let export = JsonExport {
        id: report.id,
        tipo_reporte: report.tipo_reporte,
        titulo: &report.titulo,
        fecha_generacion: report.fecha_generacion,
        periodo: report.periodo,
        datos: &report.datos,
        analisis_ia: &report.analisis_ia,
    };

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &export)
        .map_err(|e| AppError::Render(format!("could not write JSON report: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bakery, sample_report};
    use chrono::TimeZone;

    #[test]
    fn file_names_carry_title_timestamp_and_id() {
        let renderer = ReportRenderer::new(PathBuf::from("outputs"), bakery());
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let id = Uuid::parse_str("1b4e28ba-2fa1-11d2-883f-0016d3cca427").unwrap();
        let path = renderer.file_path("Ventas", id, OutputFormat::Spreadsheet, now);
        assert_eq!(path, PathBuf::from("outputs/Reporte_Ventas_20240305_140709_000_1b4e28ba.xlsx"));
    }

    #[tokio::test]
    async fn reports_rendered_in_the_same_instant_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ReportRenderer::new(dir.path().to_path_buf(), bakery());
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let first = renderer.file_path("Ventas", Uuid::new_v4(), OutputFormat::Json, now);
        let second = renderer.file_path("Ventas", Uuid::new_v4(), OutputFormat::Json, now);
        assert_ne!(first, second);

        let renderer = Arc::new(renderer);
        let mut other = sample_report();
        other.id = Uuid::new_v4();
        let a = renderer.render_all(&sample_report(), &[OutputFormat::Json], "Ventas", false).await.unwrap();
        let b = renderer.render_all(&other, &[OutputFormat::Json], "Ventas", false).await.unwrap();
        assert_ne!(a[0].location, b[0].location);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn titles_are_made_filesystem_safe() {
        assert_eq!(sanitize("Ventas / Marzo"), "Ventas___Marzo");
        assert_eq!(sanitize("  "), "General");
    }

    #[tokio::test]
    async fn json_artifact_is_written_without_artifact_list() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(ReportRenderer::new(dir.path().to_path_buf(), bakery()));
        let report = sample_report();

        let artifacts = renderer
            .render_all(&report, &[OutputFormat::Json], "Ventas", false)
            .await
            .unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].format, OutputFormat::Json);

        let written = std::fs::read_to_string(&artifacts[0].location).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["tipo_reporte"], "ventas");
        assert!(value.get("archivos_generados").is_none());
    }

    #[tokio::test]
    async fn every_format_produces_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(ReportRenderer::new(dir.path().join("nested"), bakery()));
        let report = sample_report();
        let formats = [OutputFormat::Json, OutputFormat::Spreadsheet, OutputFormat::Document];

        let artifacts = renderer.render_all(&report, &formats, "Ventas", true).await.unwrap();
        assert_eq!(artifacts.len(), 3);
        for artifact in &artifacts {
            let path = Path::new(&artifact.location);
            assert!(path.exists(), "{} missing", artifact.location);
            assert_eq!(path.extension().unwrap(), artifact.format.extension());
            assert!(std::fs::metadata(path).unwrap().len() > 0);
        }
    }
}
