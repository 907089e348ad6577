//! report-forge: seed a demo employee database, compile report templates,
//! fill them from the live connection, and export the result to PDF and DOCX.
//!
//! The pipeline is a single linear run (see [`runner::run`]):
//! seed → compile → fill → export. Templates are YAML report definitions
//! ([`template`]), filled against SQLite ([`store`], [`fill`]) into an
//! immutable paginated [`print::PrintDocument`] consumed by the exporters
//! ([`export`]).

pub mod config;
pub mod error;
pub mod export;
pub mod fill;
pub mod logging;
pub mod model;
pub mod print;
pub mod runner;
pub mod seed;
pub mod store;
pub mod template;

pub use config::{AppConfig, CliArgs};
pub use error::{CompileError, ExportError, FillError, ReportError, StorageError};
pub use logging::{init_logging, LoggingConfig};
pub use runner::{run, RunError, RunReport, RunStep};
