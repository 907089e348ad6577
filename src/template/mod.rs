//! Report template compilation.
//!
//! A template source is a YAML document declaring a name, a title expression,
//! an embedded SQL query, the parameters the query expects, and the column
//! layout. `compile` validates the source and produces a [`CompiledReport`],
//! the executable form a fill invocation consumes. Compiled reports can be
//! persisted to a `.crpt` JSON artifact and reloaded instead of recompiled.
//!
//! Query placeholders:
//! - `$P{name}` — bound as a true SQL parameter at fill time.
//! - `$F{name}` — a filter-kind parameter validated by the grammar in
//!   [`filter`] and spliced as re-rendered SQL.

pub mod filter;

use crate::error::CompileError;
use crate::model::ParamKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// File extension for persisted compiled artifacts.
pub const ARTIFACT_EXTENSION: &str = "crpt";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(P|F)\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex"));

/// A parameter the template declares it expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// One report column: the query field it reads and the label it prints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub field: String,
    pub label: String,
}

/// The raw YAML shape of a template source.
#[derive(Debug, Deserialize)]
struct TemplateSource {
    name: String,
    #[serde(default)]
    title: String,
    query: String,
    #[serde(default)]
    parameters: Vec<ParameterSpec>,
    columns: Vec<ColumnSpec>,
    #[serde(default = "default_rows_per_page")]
    rows_per_page: usize,
}

fn default_rows_per_page() -> usize {
    40
}

/// One piece of the compiled query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuerySegment {
    /// Literal SQL from the template author.
    Sql(String),
    /// A `$P{name}` placeholder, bound positionally at fill time.
    Bind(String),
    /// A `$F{name}` placeholder, replaced by a validated filter clause.
    Splice(String),
}

/// The executable form of a template. Invariant: only `compile` (or loading
/// an artifact `compile` wrote) produces one, so a `CompiledReport` is always
/// internally consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledReport {
    pub name: String,
    pub title: String,
    pub parameters: Vec<ParameterSpec>,
    pub columns: Vec<ColumnSpec>,
    pub rows_per_page: usize,
    pub query: Vec<QuerySegment>,
}

impl CompiledReport {
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|spec| spec.name == name)
    }

    /// File name of the persisted artifact for this report.
    pub fn artifact_file_name(&self) -> String {
        format!("{}.{ARTIFACT_EXTENSION}", self.name)
    }

    /// Persist the compiled definition as JSON, overwriting `path`.
    pub fn save(&self, path: &Path) -> Result<(), CompileError> {
        let bytes = serde_json::to_vec_pretty(self)?;
        fs::write(path, bytes).map_err(|source| CompileError::WriteArtifact {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reload a previously persisted compiled definition.
    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let bytes = fs::read(path).map_err(|source| CompileError::ReadArtifact {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Compile a YAML template source into an executable report definition.
pub fn compile(source: &str) -> Result<CompiledReport, CompileError> {
    let src: TemplateSource = serde_yaml::from_str(source)?;

    if src.query.trim().is_empty() {
        return Err(CompileError::EmptyQuery);
    }
    if src.columns.is_empty() {
        return Err(CompileError::NoColumns);
    }

    let declared: HashMap<&str, ParamKind> = src
        .parameters
        .iter()
        .map(|spec| (spec.name.as_str(), spec.kind))
        .collect();

    let query = segment_query(&src.query, &declared)?;
    validate_title(&src.title, &declared)?;
    validate_columns(&src.query, &src.columns)?;

    Ok(CompiledReport {
        name: src.name,
        title: src.title,
        parameters: src.parameters,
        columns: src.columns,
        rows_per_page: src.rows_per_page.max(1),
        query,
    })
}

/// Read and compile a template file.
pub fn compile_file(path: &Path) -> Result<CompiledReport, CompileError> {
    let source = fs::read_to_string(path).map_err(|source| CompileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    compile(&source)
}

fn segment_query(
    query: &str,
    declared: &HashMap<&str, ParamKind>,
) -> Result<Vec<QuerySegment>, CompileError> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for caps in PLACEHOLDER.captures_iter(query) {
        let whole = caps.get(0).expect("capture 0 always present");
        let sigil = &caps[1];
        let name = caps[2].to_string();

        let kind = declared
            .get(name.as_str())
            .copied()
            .ok_or_else(|| CompileError::UndeclaredParameter { name: name.clone() })?;

        match sigil {
            "F" if kind != ParamKind::Filter => {
                return Err(CompileError::NotAFilter { name });
            }
            "P" if kind == ParamKind::Filter => {
                return Err(CompileError::FilterNotBindable { name });
            }
            _ => {}
        }

        if whole.start() > cursor {
            segments.push(QuerySegment::Sql(query[cursor..whole.start()].to_string()));
        }
        segments.push(if sigil == "P" {
            QuerySegment::Bind(name)
        } else {
            QuerySegment::Splice(name)
        });
        cursor = whole.end();
    }

    if cursor < query.len() {
        segments.push(QuerySegment::Sql(query[cursor..].to_string()));
    }
    Ok(segments)
}

fn validate_title(title: &str, declared: &HashMap<&str, ParamKind>) -> Result<(), CompileError> {
    for caps in PLACEHOLDER.captures_iter(title) {
        let name = caps[2].to_string();
        let kind = declared
            .get(name.as_str())
            .copied()
            .ok_or_else(|| CompileError::UndeclaredParameter { name: name.clone() })?;
        // filters never interpolate into display text
        if &caps[1] == "F" || kind == ParamKind::Filter {
            return Err(CompileError::FilterNotBindable { name });
        }
    }
    Ok(())
}

/// Every column `field` must name something the SELECT list produces. A `*`
/// projection skips the check, as does a query whose SELECT list cannot be
/// located (placeholders may hide it).
fn validate_columns(query: &str, columns: &[ColumnSpec]) -> Result<(), CompileError> {
    let Some(fields) = selected_fields(query) else {
        return Ok(());
    };
    for column in columns {
        if !fields.contains(&column.field.to_ascii_uppercase()) {
            return Err(CompileError::UnknownField {
                field: column.field.clone(),
            });
        }
    }
    Ok(())
}

/// Extract the output names of the SELECT list, uppercased. Returns `None`
/// when the list cannot be determined (wildcard projection or no clear
/// SELECT/FROM pair).
fn selected_fields(query: &str) -> Option<Vec<String>> {
    let upper = query.to_ascii_uppercase();
    let select = find_word(&upper, "SELECT", 0)?;
    let from = find_word(&upper, "FROM", select + 6)?;
    let list = &query[select + 6..from];

    let mut fields = Vec::new();
    for item in split_top_level(list) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if item == "*" || item.ends_with(".*") {
            return None;
        }
        let upper_item = item.to_ascii_uppercase();
        let name = match upper_item.rfind(" AS ") {
            Some(pos) => item[pos + 4..].trim(),
            None => item.rsplit(|c: char| c.is_whitespace()).next().unwrap_or(item),
        };
        let name = name.rsplit('.').next().unwrap_or(name);
        fields.push(name.to_ascii_uppercase());
    }
    Some(fields)
}

/// Byte offset of `word` as a standalone token at paren depth zero.
fn find_word(haystack: &str, word: &str, start: usize) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut depth = 0usize;
    let mut idx = start;
    while idx + word.len() <= haystack.len() {
        match bytes[idx] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 && haystack[idx..].starts_with(word) {
            let before_ok = idx == 0 || !is_word_byte(bytes[idx - 1]);
            let after = idx + word.len();
            let after_ok = after >= haystack.len() || !is_word_byte(bytes[after]);
            if before_ok && after_ok {
                return Some(idx);
            }
        }
        idx += 1;
    }
    None
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Split on commas outside parentheses.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, c) in list.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}
