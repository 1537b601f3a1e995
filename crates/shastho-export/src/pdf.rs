//! Fixed-layout report document.
//!
//! Section presence and order are the contract; the document is read by
//! people, not parsed, so layout details stay simple.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rgb};
use tracing::info;

use shastho_core::types::MedicalReport;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 5.0;
/// Rough Helvetica fit for the usable width at 10pt.
const WRAP_COLUMNS: usize = 95;

/// Body of one report section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    Text(String),
    List(Vec<String>),
}

/// The fixed section sequence. Medication and test sections are omitted
/// when empty, matching the exported document users already know.
pub fn report_sections(report: &MedicalReport) -> Vec<(&'static str, SectionBody)> {
    let mut sections = vec![
        (
            "Provisional Diagnosis",
            SectionBody::Text(report.diagnosis.clone()),
        ),
        (
            "Clinical Summary",
            SectionBody::Text(report.summary.clone()),
        ),
    ];

    if !report.medications.is_empty() {
        sections.push((
            "Suggested Medications (OTC)",
            SectionBody::List(report.medications.clone()),
        ));
    }

    sections.push(("Advice & Lifestyle", SectionBody::List(report.advice.clone())));

    if !report.tests.is_empty() {
        sections.push(("Recommended Tests", SectionBody::List(report.tests.clone())));
    }

    sections
}

/// Render the report to `<output_dir>/AmarShastho_Report_<unix-millis>.pdf`
/// and return the written path.
pub fn write_report_pdf(
    report: &MedicalReport,
    consultant_name: &str,
    consultant_specialty: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    let filename = format!(
        "AmarShastho_Report_{}.pdf",
        chrono::Utc::now().timestamp_millis()
    );
    let path = output_dir.join(filename);

    let (doc, page, layer) = PdfDocument::new(
        "Amar Shastho AI Report",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let italic = doc.add_builtin_font(BuiltinFont::HelveticaOblique)?;

    let mut writer = PageWriter {
        doc: &doc,
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_HEIGHT_MM - MARGIN_MM,
    };

    // Header
    writer.layer.set_fill_color(teal());
    writer.text(&bold, 22.0, 60.0, "AMAR SHASTHO AI");
    writer.advance(8.0);
    writer.text(&regular, 12.0, 72.0, "Smart Telemedicine Report");
    writer.advance(14.0);

    // Consultant identity
    writer.layer.set_fill_color(dark());
    writer.text(&bold, 14.0, MARGIN_MM, &format!("Consultant: {consultant_name}"));
    writer.advance(6.0);
    writer.text(&regular, 10.0, MARGIN_MM, consultant_specialty);
    writer.text(
        &regular,
        10.0,
        PAGE_WIDTH_MM - 60.0,
        &format!("Date: {}", chrono::Utc::now().format("%Y-%m-%d")),
    );
    writer.advance(12.0);

    for (title, body) in report_sections(report) {
        writer.ensure_room(3.0 * LINE_HEIGHT_MM);
        writer.layer.set_fill_color(teal());
        writer.text(&bold, 12.0, MARGIN_MM, &title.to_uppercase());
        writer.advance(7.0);

        writer.layer.set_fill_color(black());
        match body {
            SectionBody::Text(text) => {
                for line in wrap_text(&text, WRAP_COLUMNS) {
                    writer.ensure_room(LINE_HEIGHT_MM);
                    writer.text(&regular, 10.0, MARGIN_MM, &line);
                    writer.advance(LINE_HEIGHT_MM);
                }
            }
            SectionBody::List(items) => {
                for item in items {
                    for (index, line) in wrap_text(&item, WRAP_COLUMNS - 2).into_iter().enumerate()
                    {
                        writer.ensure_room(LINE_HEIGHT_MM);
                        let prefix = if index == 0 { "- " } else { "  " };
                        writer.text(&regular, 10.0, MARGIN_MM, &format!("{prefix}{line}"));
                        writer.advance(LINE_HEIGHT_MM);
                    }
                }
            }
        }
        writer.advance(5.0);
    }

    // Disclaimer footer on the last page.
    writer.layer.set_fill_color(gray());
    writer.text_at(
        &italic,
        8.0,
        MARGIN_MM,
        10.0,
        "Disclaimer: This report is generated by AI. It is not a substitute for a physical doctor's consultation.",
    );

    doc.save(&mut BufWriter::new(
        File::create(&path).with_context(|| format!("cannot create {}", path.display()))?,
    ))?;

    info!(path = %path.display(), "report exported");
    Ok(path)
}

struct PageWriter<'a> {
    doc: &'a printpdf::PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl PageWriter<'_> {
    fn text(&self, font: &IndirectFontRef, size: f32, x: f32, text: &str) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn text_at(&self, font: &IndirectFontRef, size: f32, x: f32, y: f32, text: &str) {
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
    }

    fn advance(&mut self, dy: f32) {
        self.y -= dy;
    }

    /// Break onto a fresh page when the current one is nearly full.
    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < MARGIN_MM + 10.0 {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
    }
}

/// Greedy word wrap by column count.
fn wrap_text(text: &str, max_columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= max_columns {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn teal() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.655, 0.655, None))
}

fn dark() -> Color {
    Color::Rgb(Rgb::new(0.2, 0.2, 0.2, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn gray() -> Color {
    Color::Rgb(Rgb::new(0.4, 0.4, 0.4, None))
}
