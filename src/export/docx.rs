//! DOCX export as a minimal WordprocessingML package.
//!
//! A `.docx` file is a zip archive of XML parts. Four parts are enough for a
//! readable document: `[Content_Types].xml`, the package relationships, the
//! document part, and its (empty) relationship list. The document body holds
//! the title, a generation line, and one bordered table per print page with
//! an explicit page break between pages.

use crate::error::ExportError;
use crate::export::{ExportFormat, ReportExporter};
use crate::print::{PrintDocument, PrintPage};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#;

pub struct DocxExporter;

impl ReportExporter for DocxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Docx
    }

    fn export(&self, document: &PrintDocument, destination: &Path) -> Result<(), ExportError> {
        if document.pages.is_empty() {
            return Err(ExportError::EmptyDocument);
        }

        let file = File::create(destination).map_err(|source| ExportError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        write_part(&mut zip, options, destination, "[Content_Types].xml", CONTENT_TYPES)?;
        write_part(&mut zip, options, destination, "_rels/.rels", PACKAGE_RELS)?;
        write_part(
            &mut zip,
            options,
            destination,
            "word/_rels/document.xml.rels",
            DOCUMENT_RELS,
        )?;
        write_part(
            &mut zip,
            options,
            destination,
            "word/document.xml",
            &document_xml(document),
        )?;

        zip.finish()?;
        Ok(())
    }
}

fn write_part(
    zip: &mut ZipWriter<File>,
    options: FileOptions,
    destination: &Path,
    name: &str,
    content: &str,
) -> Result<(), ExportError> {
    zip.start_file(name, options)?;
    zip.write_all(content.as_bytes())
        .map_err(|source| ExportError::Io {
            path: destination.to_path_buf(),
            source,
        })
}

fn document_xml(document: &PrintDocument) -> String {
    let mut body = String::new();
    body.push_str(&paragraph(&document.title, true, 32));
    body.push_str(&paragraph(
        &format!(
            "{} · generated {}",
            document.report_name,
            document.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        false,
        16,
    ));

    for (idx, page) in document.pages.iter().enumerate() {
        if idx > 0 {
            body.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
        }
        body.push_str(&page_table(document, page));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

fn page_table(document: &PrintDocument, page: &PrintPage) -> String {
    let mut table = String::from(
        r#"<w:tbl><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4"/><w:bottom w:val="single" w:sz="4"/><w:left w:val="single" w:sz="4"/><w:right w:val="single" w:sz="4"/><w:insideH w:val="single" w:sz="4"/><w:insideV w:val="single" w:sz="4"/></w:tblBorders></w:tblPr>"#,
    );

    table.push_str("<w:tr>");
    for column in &document.columns {
        table.push_str(&table_cell(&column.label, true));
    }
    table.push_str("</w:tr>");

    for row in &page.rows {
        table.push_str("<w:tr>");
        for cell in row {
            table.push_str(&table_cell(&cell.to_string(), false));
        }
        table.push_str("</w:tr>");
    }

    table.push_str("</w:tbl>");
    table
}

fn table_cell(text: &str, bold: bool) -> String {
    format!("<w:tc>{}</w:tc>", paragraph(text, bold, 20))
}

/// One paragraph with a single run. `half_points` is the font size in the
/// OOXML half-point unit.
fn paragraph(text: &str, bold: bool, half_points: u32) -> String {
    let props = if bold {
        format!(r#"<w:rPr><w:b/><w:sz w:val="{half_points}"/></w:rPr>"#)
    } else {
        format!(r#"<w:rPr><w:sz w:val="{half_points}"/></w:rPr>"#)
    };
    format!(
        r#"<w:p><w:r>{props}<w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        xml_escape(text)
    )
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print::CellValue;
    use crate::template::ColumnSpec;

    fn sample_document() -> PrintDocument {
        PrintDocument {
            report_name: "employee_report".into(),
            title: "Employee Report".into(),
            columns: vec![
                ColumnSpec {
                    field: "FIRST_NAME".into(),
                    label: "First Name".into(),
                },
                ColumnSpec {
                    field: "LAST_NAME".into(),
                    label: "Last Name".into(),
                },
            ],
            pages: vec![PrintPage {
                number: 1,
                rows: vec![vec![
                    CellValue::Text("John <& Co>".into()),
                    CellValue::Text("Smith".into()),
                ]],
            }],
            generated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn writes_a_zip_with_the_expected_signature() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.docx");

        DocxExporter.export(&sample_document(), &path).expect("export");

        let bytes = std::fs::read(&path).expect("read output");
        assert!(bytes.starts_with(b"PK"), "zip signature expected");
        assert!(bytes.len() > 200, "non-trivial output expected");
    }

    #[test]
    fn document_xml_escapes_cell_text() {
        let xml = document_xml(&sample_document());
        assert!(xml.contains("John &lt;&amp; Co&gt;"));
        assert!(!xml.contains("John <& Co>"));
    }

    #[test]
    fn xml_escape_covers_the_reserved_characters() {
        assert_eq!(
            xml_escape(r#"<a & 'b' "c">"#),
            "&lt;a &amp; &apos;b&apos; &quot;c&quot;&gt;"
        );
    }

    #[test]
    fn page_breaks_separate_pages() {
        let mut doc = sample_document();
        doc.pages.push(PrintPage {
            number: 2,
            rows: vec![],
        });
        let xml = document_xml(&doc);
        assert_eq!(xml.matches(r#"<w:br w:type="page"/>"#).count(), 1);
        assert_eq!(xml.matches("<w:tbl>").count(), 2);
    }
}
