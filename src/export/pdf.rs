//! PDF export via printpdf's builtin Helvetica fonts.
//!
//! One A4 portrait PDF page per print page: title and generation timestamp at
//! the top, a column-header line, one text line per data row, and a page
//! footer. Long cell text is not wrapped; columns share the printable width
//! evenly.

use crate::error::ExportError;
use crate::print::PrintDocument;
use crate::export::{ExportFormat, ReportExporter};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const TITLE_SIZE: f32 = 16.0;
const META_SIZE: f32 = 8.0;
const BODY_SIZE: f32 = 10.0;
const LINE_HEIGHT: f32 = 6.0;

pub struct PdfExporter;

impl ReportExporter for PdfExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn export(&self, document: &PrintDocument, destination: &Path) -> Result<(), ExportError> {
        if document.pages.is_empty() {
            return Err(ExportError::EmptyDocument);
        }

        let (doc, first_page, first_layer) = PdfDocument::new(
            document.title.as_str(),
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            "page 1",
        );
        let body = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(ExportError::Pdf)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(ExportError::Pdf)?;

        let total_pages = document.pages.len();
        for (idx, page) in document.pages.iter().enumerate() {
            let layer = if idx == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page_idx, layer_idx) = doc.add_page(
                    Mm(PAGE_WIDTH),
                    Mm(PAGE_HEIGHT),
                    format!("page {}", idx + 1),
                );
                doc.get_page(page_idx).get_layer(layer_idx)
            };
            render_page(&layer, document, idx, total_pages, &body, &bold);
        }

        let file = File::create(destination).map_err(|source| ExportError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        doc.save(&mut BufWriter::new(file)).map_err(ExportError::Pdf)
    }
}

fn render_page(
    layer: &PdfLayerReference,
    document: &PrintDocument,
    page_index: usize,
    total_pages: usize,
    body: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    let page = &document.pages[page_index];
    let column_count = document.columns.len().max(1);
    let column_width = (PAGE_WIDTH - 2.0 * MARGIN) / column_count as f32;
    let column_x = |idx: usize| MARGIN + column_width * idx as f32;

    let mut y = PAGE_HEIGHT - MARGIN;
    layer.use_text(document.title.clone(), TITLE_SIZE, Mm(MARGIN), Mm(y), bold);
    y -= LINE_HEIGHT;
    layer.use_text(
        format!(
            "{} · generated {}",
            document.report_name,
            document.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        META_SIZE,
        Mm(MARGIN),
        Mm(y),
        body,
    );
    y -= 2.0 * LINE_HEIGHT;

    for (idx, column) in document.columns.iter().enumerate() {
        layer.use_text(column.label.clone(), BODY_SIZE, Mm(column_x(idx)), Mm(y), bold);
    }
    y -= LINE_HEIGHT;

    for row in &page.rows {
        for (idx, cell) in row.iter().enumerate() {
            layer.use_text(cell.to_string(), BODY_SIZE, Mm(column_x(idx)), Mm(y), body);
        }
        y -= LINE_HEIGHT;
    }

    layer.use_text(
        format!("Page {} / {}", page.number, total_pages),
        META_SIZE,
        Mm(MARGIN),
        Mm(MARGIN / 2.0),
        body,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print::{CellValue, PrintPage};
    use crate::template::ColumnSpec;

    fn sample_document(pages: usize) -> PrintDocument {
        PrintDocument {
            report_name: "employee_report".into(),
            title: "Employee Report".into(),
            columns: vec![
                ColumnSpec {
                    field: "FIRST_NAME".into(),
                    label: "First Name".into(),
                },
                ColumnSpec {
                    field: "SALARY".into(),
                    label: "Salary".into(),
                },
            ],
            pages: (1..=pages)
                .map(|number| PrintPage {
                    number,
                    rows: vec![vec![
                        CellValue::Text("John".into()),
                        CellValue::Number(150_000.0),
                    ]],
                })
                .collect(),
            generated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn writes_a_pdf_with_the_expected_signature() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.pdf");

        PdfExporter.export(&sample_document(2), &path).expect("export");

        let bytes = std::fs::read(&path).expect("read output");
        assert!(bytes.starts_with(b"%PDF"), "PDF magic header expected");
        assert!(bytes.len() > 500, "non-trivial output expected");
    }

    #[test]
    fn empty_document_is_an_export_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.pdf");
        let mut doc = sample_document(1);
        doc.pages.clear();

        let err = PdfExporter.export(&doc, &path).expect_err("must fail");
        assert!(matches!(err, ExportError::EmptyDocument));
        assert!(!path.exists(), "no file on failure");
    }

    #[test]
    fn overwrites_an_existing_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.pdf");
        std::fs::write(&path, b"stale").expect("write stale file");

        PdfExporter.export(&sample_document(1), &path).expect("export");

        let bytes = std::fs::read(&path).expect("read output");
        assert!(bytes.starts_with(b"%PDF"));
    }
}
