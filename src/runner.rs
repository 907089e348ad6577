//! Run orchestration.
//!
//! A single linear pass, no branching:
//! `Seed → CompileEmployeeReport → CompileEmailReport → FillEmployeeReport →
//! ExportPdf → ExportDocx`. The first failing step halts the run; nothing is
//! retried and prior side effects are kept.

use crate::config::AppConfig;
use crate::error::ReportError;
use crate::export::{DocxExporter, PdfExporter, ReportExporter};
use crate::fill;
use crate::seed;
use crate::store::RecordStore;
use crate::template;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Template resource names the run loads from the templates directory.
pub const EMPLOYEE_TEMPLATE: &str = "employee_report";
pub const EMAIL_TEMPLATE: &str = "employee_email_report";

/// Output file names, written under the configured output directory.
pub const PDF_OUTPUT: &str = "out.pdf";
pub const DOCX_OUTPUT: &str = "out.docx";

/// The steps of the run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStep {
    Seed,
    CompileEmployeeReport,
    CompileEmailReport,
    FillEmployeeReport,
    ExportPdf,
    ExportDocx,
}

impl fmt::Display for RunStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStep::Seed => "seed",
            RunStep::CompileEmployeeReport => "compile_employee_report",
            RunStep::CompileEmailReport => "compile_email_report",
            RunStep::FillEmployeeReport => "fill_employee_report",
            RunStep::ExportPdf => "export_pdf",
            RunStep::ExportDocx => "export_docx",
        };
        f.write_str(name)
    }
}

/// The terminal failure state: which step failed and why.
#[derive(Debug, Error)]
#[error("step {step} failed")]
pub struct RunError {
    pub step: RunStep,
    #[source]
    pub source: ReportError,
}

fn fail<E: Into<ReportError>>(step: RunStep) -> impl FnOnce(E) -> RunError {
    move |source| RunError {
        step,
        source: source.into(),
    }
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    pub employee_id: i64,
    pub email_id: i64,
    pub artifacts: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub pages: usize,
    pub rows: usize,
}

/// Execute the whole pipeline once.
pub fn run(config: &AppConfig) -> Result<RunReport, RunError> {
    let store = RecordStore::open(&config.database).map_err(fail(RunStep::Seed))?;

    info!(step = %RunStep::Seed, "seeding demo rows");
    let seeded = seed::seed(&store).map_err(fail(RunStep::Seed))?;

    for dir in [&config.artifacts_dir, &config.output_dir] {
        fs::create_dir_all(dir).map_err(|source| RunError {
            step: RunStep::CompileEmployeeReport,
            source: ReportError::Io {
                path: dir.clone(),
                source,
            },
        })?;
    }

    info!(step = %RunStep::CompileEmployeeReport, template = EMPLOYEE_TEMPLATE, "compiling template");
    let employee_report = template::compile_file(&config.template_path(EMPLOYEE_TEMPLATE))
        .map_err(fail(RunStep::CompileEmployeeReport))?;
    let employee_artifact = config.artifact_path(&employee_report.artifact_file_name());
    employee_report
        .save(&employee_artifact)
        .map_err(fail(RunStep::CompileEmployeeReport))?;

    info!(step = %RunStep::CompileEmailReport, template = EMAIL_TEMPLATE, "compiling template");
    let email_report = template::compile_file(&config.template_path(EMAIL_TEMPLATE))
        .map_err(fail(RunStep::CompileEmailReport))?;
    let email_artifact = config.artifact_path(&email_report.artifact_file_name());
    email_report
        .save(&email_artifact)
        .map_err(fail(RunStep::CompileEmailReport))?;

    info!(step = %RunStep::FillEmployeeReport, "filling employee report");
    let document = fill::fill(&employee_report, &config.params(), store.connection())
        .map_err(fail(RunStep::FillEmployeeReport))?;
    info!(
        pages = document.page_count(),
        rows = document.row_count(),
        "report filled"
    );

    let pdf_path = config.output_path(PDF_OUTPUT);
    info!(step = %RunStep::ExportPdf, path = %pdf_path.display(), "exporting");
    PdfExporter
        .export(&document, &pdf_path)
        .map_err(fail(RunStep::ExportPdf))?;

    let docx_path = config.output_path(DOCX_OUTPUT);
    info!(step = %RunStep::ExportDocx, path = %docx_path.display(), "exporting");
    DocxExporter
        .export(&document, &docx_path)
        .map_err(fail(RunStep::ExportDocx))?;

    info!("run complete");
    Ok(RunReport {
        employee_id: seeded.employee.id,
        email_id: seeded.email.id,
        artifacts: vec![employee_artifact, email_artifact],
        outputs: vec![pdf_path, docx_path],
        pages: document.page_count(),
        rows: document.row_count(),
    })
}
