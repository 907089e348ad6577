//! The paginated document model produced by the fill step.
//!
//! A [`PrintDocument`] is produced once per fill invocation and is read-only
//! afterwards; any number of exporters may consume the same document.

use crate::template::ColumnSpec;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// One rendered cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Null => Ok(()),
        }
    }
}

/// One page of rendered rows. Page numbers are 1-based.
#[derive(Debug, Clone, Serialize)]
pub struct PrintPage {
    pub number: usize,
    pub rows: Vec<Vec<CellValue>>,
}

/// A rendered, paginated report. Always carries at least one page, even when
/// the query matched no rows.
#[derive(Debug, Clone, Serialize)]
pub struct PrintDocument {
    pub report_name: String,
    pub title: String,
    pub columns: Vec<ColumnSpec>,
    pub pages: Vec<PrintPage>,
    pub generated_at: DateTime<Utc>,
}

impl PrintDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn row_count(&self) -> usize {
        self.pages.iter().map(|page| page.rows.len()).sum()
    }
}
