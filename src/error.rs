//! Error taxonomy for the report pipeline.
//!
//! Each subsystem owns its own `thiserror` enum; [`ReportError`] unifies them
//! at the orchestration boundary. Nothing is recovered locally: every failure
//! aborts the run and is surfaced with the failing step attached (see
//! [`crate::runner`]).

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the record store: save/query failures and constraint
/// violations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open database at {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to apply database schema")]
    Schema(#[source] rusqlite::Error),

    #[error("constraint violated while saving {entity}")]
    Constraint {
        entity: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to save {entity}")]
    Save {
        entity: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("query execution failed")]
    Query(#[source] rusqlite::Error),
}

/// Failures raised while compiling a template source into an executable
/// report definition, or while persisting/reloading the compiled artifact.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to read template {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed template: {0}")]
    Malformed(#[from] serde_yaml::Error),

    #[error("template declares no query")]
    EmptyQuery,

    #[error("template declares no columns")]
    NoColumns,

    #[error("placeholder references undeclared parameter `{name}`")]
    UndeclaredParameter { name: String },

    #[error("filter placeholder `{name}` requires a filter-kind parameter")]
    NotAFilter { name: String },

    #[error("parameter `{name}` is filter-kind and cannot be bound as a value")]
    FilterNotBindable { name: String },

    #[error("column field `{field}` is not selected by the query")]
    UnknownField { field: String },

    #[error("failed to write compiled artifact {path:?}")]
    WriteArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read compiled artifact {path:?}")]
    ReadArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed compiled artifact: {0}")]
    MalformedArtifact(#[from] serde_json::Error),
}

/// Failures raised while filling a compiled report with parameters against a
/// live connection.
#[derive(Debug, Error)]
pub enum FillError {
    #[error("missing required parameter `{name}`")]
    MissingParameter { name: String },

    #[error("parameter `{name}` has the wrong kind (expected {expected})")]
    WrongKind { name: String, expected: &'static str },

    #[error("invalid filter expression for `{name}`: {reason}")]
    InvalidFilter { name: String, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures raised while serializing a print document to an output format.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pdf rendering failed")]
    Pdf(#[source] printpdf::Error),

    #[error("docx packaging failed")]
    Zip(#[from] zip::result::ZipError),

    #[error("print document has no pages")]
    EmptyDocument,
}

/// Top-level error for the run orchestrator.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Fill(#[from] FillError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("i/o failure at {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
