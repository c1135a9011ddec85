use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Rgb,
};

use crate::config::BakeryProfile;
use crate::errors::AppError;
use crate::models::ReportResponse;

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 20.0;
const BOTTOM_LIMIT: f32 = 25.0;
const TOP_ITEM_ROWS: usize = 10;
const TABLE_COLUMNS: usize = 5;

/// Letter-sized PDF: title block, summary table, top-items table and the
/// narrative as bulleted sections.
pub fn write_document(path: &Path, report: &ReportResponse, bakery: &BakeryProfile) -> Result<(), AppError> {
    let (doc, page, layer) = PdfDocument::new(&report.titulo, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;

    {
        let mut writer = PageWriter {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            y: PAGE_HEIGHT - MARGIN,
            page_number: 1,
            footer: bakery.name.clone(),
            regular,
            bold,
        };
        writer.draw_footer();

        title_block(&mut writer, report, bakery);
        summary_table(&mut writer, report);
        top_items_table(&mut writer, report);
        narrative_sections(&mut writer, report);
    }

    let mut out = BufWriter::new(File::create(path)?);
    doc.save(&mut out).map_err(pdf_err)
}

fn pdf_err(e: printpdf::Error) -> AppError {
    AppError::Render(format!("could not write PDF: {}", e))
}

struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    page_number: u32,
    footer: String,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl PageWriter<'_> {
    /// Starts a new page when fewer than `height` mm remain.
    fn ensure_space(&mut self, height: f32) {
        if self.y - height >= BOTTOM_LIMIT {
            return;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page_number += 1;
        self.y = PAGE_HEIGHT - MARGIN;
        self.draw_footer();
    }

    fn draw_footer(&self) {
        self.set_color(0.4, 0.4, 0.4);
        let text = format!("{} - Página {}", self.footer, self.page_number);
        self.layer.use_text(text, 8.0, Mm(MARGIN), Mm(12.0), &self.regular);
        self.set_color(0.0, 0.0, 0.0);
    }

    fn set_color(&self, r: f32, g: f32, b: f32) {
        self.layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        let height = size * 0.5 + 1.5;
        self.ensure_space(height);
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(MARGIN), Mm(self.y), font);
        self.y -= height;
    }

    fn paragraph(&mut self, text: &str, size: f32, indent: &str) {
        let width = chars_per_line(size).saturating_sub(indent.chars().count());
        for (i, chunk) in wrap(text, width).iter().enumerate() {
            let prefix = if i == 0 { indent.to_string() } else { " ".repeat(indent.chars().count()) };
            self.line(&format!("{}{}", prefix, chunk), size, false);
        }
    }

    fn cells(&mut self, cells: &[String], size: f32, bold: bool) {
        let height = size * 0.5 + 2.0;
        self.ensure_space(height);
        let col_width = (PAGE_WIDTH - 2.0 * MARGIN) / cells.len().max(1) as f32;
        let max_chars = ((col_width / (size * 0.2)) as usize).max(4);
        let font = if bold { &self.bold } else { &self.regular };

        for (i, cell) in cells.iter().enumerate() {
            let x = MARGIN + col_width * i as f32;
            self.layer.use_text(truncate(cell, max_chars), size, Mm(x), Mm(self.y), font);
        }
        self.y -= height;
    }

    fn rule(&mut self) {
        self.ensure_space(3.0);
        let y = self.y + 1.0;
        let line = Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(y)), false),
            ],
            is_closed: false,
        };
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(line);
        self.y -= 3.0;
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }
}

fn title_block(w: &mut PageWriter<'_>, report: &ReportResponse, bakery: &BakeryProfile) {
    w.set_color(0.10, 0.28, 0.16);
    w.line(&bakery.name, 20.0, true);
    w.set_color(0.0, 0.0, 0.0);
    w.line(&format!("{} | {} | {}", bakery.location, bakery.phone, bakery.email), 9.0, false);
    w.gap(4.0);
    w.line(&report.titulo, 16.0, true);
    w.line(&format!("Período: {}", report.periodo), 10.0, false);
    w.line(
        &format!("Generado: {}", report.fecha_generacion.format("%d/%m/%Y %H:%M")),
        10.0,
        false,
    );
    w.rule();
}

fn summary_table(w: &mut PageWriter<'_>, report: &ReportResponse) {
    let fields = report.datos.summary.fields();
    if fields.is_empty() {
        return;
    }
    w.gap(2.0);
    w.line("Resumen", 13.0, true);
    w.cells(&["Métrica".to_string(), "Valor".to_string()], 10.0, true);
    for (name, value) in fields {
        w.cells(&[name.clone(), value.display()], 10.0, false);
    }
    w.gap(3.0);
}

fn top_items_table(w: &mut PageWriter<'_>, report: &ReportResponse) {
    let Some(group) = report.datos.groups.iter().find(|g| !g.records.is_empty()) else {
        return;
    };

    w.line(&format!("Detalle: {}", group.name), 13.0, true);
    let columns: Vec<String> = group.records[0]
        .columns()
        .take(TABLE_COLUMNS)
        .map(String::from)
        .collect();
    w.cells(&columns, 9.0, true);

    for record in group.records.iter().take(TOP_ITEM_ROWS) {
        let row: Vec<String> = record
            .fields()
            .iter()
            .take(TABLE_COLUMNS)
            .map(|(_, v)| v.display())
            .collect();
        w.cells(&row, 9.0, false);
    }
    w.gap(3.0);
}

fn narrative_sections(w: &mut PageWriter<'_>, report: &ReportResponse) {
    let narrative = &report.analisis_ia;

    w.line("Análisis", 13.0, true);
    w.paragraph(&narrative.analysis, 10.0, "");
    w.gap(3.0);

    for (title, items) in [("Insights", &narrative.insights), ("Recomendaciones", &narrative.recommendations)] {
        if items.is_empty() {
            continue;
        }
        w.line(title, 13.0, true);
        for item in items {
            w.paragraph(item, 10.0, "• ");
        }
        w.gap(3.0);
    }
}

/// Rough Helvetica capacity of the text column at `size` points.
fn chars_per_line(size: f32) -> usize {
    let usable = PAGE_WIDTH - 2.0 * MARGIN;
    ((usable / (size * 0.19)) as usize).max(20)
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}
