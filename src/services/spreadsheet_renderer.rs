use std::path::Path;

use rust_xlsxwriter::{Chart, ChartType, Color, Format, Workbook, Worksheet, XlsxError};

use crate::config::BakeryProfile;
use crate::errors::AppError;
use crate::models::{FieldValue, MetricGroup, ReportResponse};

const MAX_SHEET_NAME: usize = 31;
const HEADER_GREEN: u32 = 0x1A472A;

/// One workbook: "Resumen", "Analisis", one sheet per metric group and, when
/// requested, a "Graficos" sheet with a column chart per non-empty group.
pub fn write_workbook(
    path: &Path,
    report: &ReportResponse,
    bakery: &BakeryProfile,
    include_charts: bool,
) -> Result<(), AppError> {
    build_workbook(path, report, bakery, include_charts)
        .map_err(|e| AppError::Render(format!("could not write spreadsheet: {}", e)))
}

fn build_workbook(
    path: &Path,
    report: &ReportResponse,
    bakery: &BakeryProfile,
    include_charts: bool,
) -> Result<(), XlsxError> {
    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_GREEN));
    let bold = Format::new().set_bold();

    let mut workbook = Workbook::new();
    workbook.push_worksheet(summary_sheet(report, bakery, &header, &bold)?);
    workbook.push_worksheet(analysis_sheet(report, &bold)?);

    let mut chartable = Vec::new();
    for group in report.datos.groups.iter() {
        let name = sheet_name(&group.name);
        workbook.push_worksheet(group_sheet(&name, group, &header)?);
        if let Some(columns) = chart_columns(group) {
            chartable.push((name, group.records.len() as u32, columns));
        }
    }

    if include_charts {
        let mut sheet = Worksheet::new();
        sheet.set_name("Graficos")?;
        if chartable.is_empty() {
            sheet.write_string(0, 0, "Sin datos para graficar")?;
        }
        for (index, (name, rows, (category_col, value_col))) in chartable.iter().enumerate() {
            let mut chart = Chart::new(ChartType::Column);
            chart
                .add_series()
                .set_categories((name.as_str(), 1, *category_col, *rows, *category_col))
                .set_values((name.as_str(), 1, *value_col, *rows, *value_col));
            chart.title().set_name(name);
            chart.legend().set_hidden();
            sheet.insert_chart(index as u32 * 20, 0, &chart)?;
        }
        workbook.push_worksheet(sheet);
    }

    workbook.save(path)
}

fn summary_sheet(
    report: &ReportResponse,
    bakery: &BakeryProfile,
    header: &Format,
    bold: &Format,
) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name("Resumen")?;

    sheet.write_string_with_format(0, 0, &bakery.name, bold)?;
    sheet.write_string(1, 0, &report.titulo)?;
    sheet.write_string(2, 0, format!("Período: {}", report.periodo))?;
    sheet.write_string(
        3,
        0,
        format!("Generado: {}", report.fecha_generacion.format("%d/%m/%Y %H:%M")),
    )?;

    sheet.write_string_with_format(5, 0, "Métrica", header)?;
    sheet.write_string_with_format(5, 1, "Valor", header)?;
    for (offset, (name, value)) in report.datos.summary.fields().iter().enumerate() {
        let row = 6 + offset as u32;
        sheet.write_string(row, 0, name)?;
        write_value(&mut sheet, row, 1, value)?;
    }

    sheet.autofit();
    Ok(sheet)
}

fn analysis_sheet(report: &ReportResponse, bold: &Format) -> Result<Worksheet, XlsxError> {
    let narrative = &report.analisis_ia;
    let mut sheet = Worksheet::new();
    sheet.set_name("Analisis")?;
    sheet.set_column_width(0, 100)?;

    let mut row = 0u32;
    sheet.write_string_with_format(row, 0, "Análisis", bold)?;
    row += 1;
    sheet.write_string(row, 0, &narrative.analysis)?;
    row += 2;

    for (title, items) in [("Insights", &narrative.insights), ("Recomendaciones", &narrative.recommendations)] {
        sheet.write_string_with_format(row, 0, title, bold)?;
        row += 1;
        for item in items {
            sheet.write_string(row, 0, format!("• {}", item))?;
            row += 1;
        }
        row += 1;
    }

    for (key, value) in &narrative.extra {
        sheet.write_string_with_format(row, 0, key, bold)?;
        sheet.write_string(row + 1, 0, value.to_string())?;
        row += 3;
    }

    Ok(sheet)
}

fn group_sheet(name: &str, group: &MetricGroup, header: &Format) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(name)?;

    let Some(first) = group.records.first() else {
        sheet.write_string(0, 0, "Sin registros en el período")?;
        return Ok(sheet);
    };

    for (col, column) in first.columns().enumerate() {
        sheet.write_string_with_format(0, col as u16, column, header)?;
    }
    for (index, record) in group.records.iter().enumerate() {
        let row = index as u32 + 1;
        for (col, (_, value)) in record.fields().iter().enumerate() {
            write_value(&mut sheet, row, col as u16, value)?;
        }
    }

    sheet.autofit();
    Ok(sheet)
}

fn write_value(sheet: &mut Worksheet, row: u32, col: u16, value: &FieldValue) -> Result<(), XlsxError> {
    match value {
        FieldValue::Int(v) => {
            sheet.write_number(row, col, *v as f64)?;
        }
        FieldValue::Number(v) => {
            sheet.write_number(row, col, *v)?;
        }
        FieldValue::Text(s) => {
            sheet.write_string(row, col, s)?;
        }
    }
    Ok(())
}

/// (category column, value column): the first text column and the first
/// numeric column after it.
fn chart_columns(group: &MetricGroup) -> Option<(u16, u16)> {
    let first = group.records.first()?;
    let fields = first.fields();
    let category = fields.iter().position(|(_, v)| matches!(v, FieldValue::Text(_)))?;
    let value = fields
        .iter()
        .enumerate()
        .skip(category + 1)
        .find(|(_, (_, v))| matches!(v, FieldValue::Int(_) | FieldValue::Number(_)))
        .map(|(i, _)| i)?;
    Some((category as u16, value as u16))
}

fn sheet_name(group: &str) -> String {
    group
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect()
}
