//! Exporters serialize a print document to an output byte format on disk.
//!
//! Exporters are deterministic for a given document at the logical level; the
//! destination file is overwritten if present.

pub mod docx;
pub mod pdf;

pub use docx::DocxExporter;
pub use pdf::PdfExporter;

use crate::error::ExportError;
use crate::print::PrintDocument;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A converter from a print document to one output format.
pub trait ReportExporter {
    fn format(&self) -> ExportFormat;

    /// Write `document` to `destination`, overwriting any existing file.
    fn export(&self, document: &PrintDocument, destination: &Path) -> Result<(), ExportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exporters_report_their_format() {
        assert_eq!(PdfExporter.format(), ExportFormat::Pdf);
        assert_eq!(DocxExporter.format(), ExportFormat::Docx);
        assert_eq!(ExportFormat::Pdf.to_string(), "pdf");
        assert_eq!(ExportFormat::Docx.extension(), "docx");
    }
}
