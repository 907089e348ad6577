//! Fills a compiled report with parameters against a live connection.
//!
//! Parameter presence and kinds are checked before any SQL runs; a missing
//! required parameter fails the fill rather than substituting a default.
//! `$P{}` placeholders become positional bind parameters, `$F{}` placeholders
//! go through the filter grammar, and the query result is paginated into a
//! [`PrintDocument`].

use crate::error::{FillError, StorageError};
use crate::model::{ParamValue, Params};
use crate::print::{CellValue, PrintDocument, PrintPage};
use crate::template::filter::FilterClause;
use crate::template::{CompiledReport, QuerySegment};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params_from_iter, types::Value as SqlValue, Connection};

static TITLE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$P\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("title regex"));

/// Execute the report's query with `params` bound and render the result into
/// a paginated print document.
pub fn fill(
    report: &CompiledReport,
    params: &Params,
    conn: &Connection,
) -> Result<PrintDocument, FillError> {
    check_parameters(report, params)?;

    let (sql, binds) = assemble_query(report, params)?;
    let title = render_title(&report.title, params)?;

    tracing::debug!(report = %report.name, sql = %sql, binds = binds.len(), "executing report query");

    let mut stmt = conn.prepare(&sql).map_err(StorageError::Query)?;
    let column_indices: Vec<usize> = report
        .columns
        .iter()
        .map(|column| stmt.column_index(&column.field).map_err(StorageError::Query))
        .collect::<Result<_, _>>()?;

    let mut rows = stmt
        .query(params_from_iter(binds))
        .map_err(StorageError::Query)?;

    let mut collected: Vec<Vec<CellValue>> = Vec::new();
    while let Some(row) = rows.next().map_err(StorageError::Query)? {
        let mut cells = Vec::with_capacity(column_indices.len());
        for &idx in &column_indices {
            let value: SqlValue = row.get(idx).map_err(StorageError::Query)?;
            cells.push(to_cell(value));
        }
        collected.push(cells);
    }

    let pages = paginate(collected, report.rows_per_page);
    Ok(PrintDocument {
        report_name: report.name.clone(),
        title,
        columns: report.columns.clone(),
        pages,
        generated_at: chrono::Utc::now(),
    })
}

fn check_parameters(report: &CompiledReport, params: &Params) -> Result<(), FillError> {
    for spec in &report.parameters {
        match params.get(&spec.name) {
            None if spec.required => {
                return Err(FillError::MissingParameter {
                    name: spec.name.clone(),
                });
            }
            Some(value) if value.kind() != spec.kind => {
                return Err(FillError::WrongKind {
                    name: spec.name.clone(),
                    expected: spec.kind.as_str(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn assemble_query(
    report: &CompiledReport,
    params: &Params,
) -> Result<(String, Vec<SqlValue>), FillError> {
    let mut sql = String::new();
    let mut binds: Vec<SqlValue> = Vec::new();

    for segment in &report.query {
        match segment {
            QuerySegment::Sql(text) => sql.push_str(text),
            QuerySegment::Bind(name) => {
                let value = params
                    .get(name)
                    .ok_or_else(|| FillError::MissingParameter { name: name.clone() })?;
                binds.push(match value {
                    ParamValue::Text(s) => SqlValue::Text(s.clone()),
                    ParamValue::Number(n) => SqlValue::Real(*n),
                    // compile guarantees filter kinds never reach a bind slot
                    ParamValue::Filter(_) => {
                        return Err(FillError::WrongKind {
                            name: name.clone(),
                            expected: "text or number",
                        });
                    }
                });
                sql.push('?');
            }
            QuerySegment::Splice(name) => {
                let value = params
                    .get(name)
                    .ok_or_else(|| FillError::MissingParameter { name: name.clone() })?;
                let ParamValue::Filter(text) = value else {
                    return Err(FillError::WrongKind {
                        name: name.clone(),
                        expected: "filter",
                    });
                };
                let clause =
                    FilterClause::parse(text).map_err(|err| FillError::InvalidFilter {
                        name: name.clone(),
                        reason: err.to_string(),
                    })?;
                sql.push_str(&clause.to_sql());
            }
        }
    }
    Ok((sql, binds))
}

fn render_title(template: &str, params: &Params) -> Result<String, FillError> {
    let mut out = String::new();
    let mut cursor = 0;
    for caps in TITLE_PLACEHOLDER.captures_iter(template) {
        let whole = caps.get(0).expect("capture 0 always present");
        let name = &caps[1];
        let value = params
            .get(name)
            .ok_or_else(|| FillError::MissingParameter { name: name.to_string() })?;
        out.push_str(&template[cursor..whole.start()]);
        out.push_str(&value.to_string());
        cursor = whole.end();
    }
    out.push_str(&template[cursor..]);
    Ok(out)
}

fn to_cell(value: SqlValue) -> CellValue {
    match value {
        SqlValue::Null => CellValue::Null,
        SqlValue::Integer(i) => CellValue::Number(i as f64),
        SqlValue::Real(r) => CellValue::Number(r),
        SqlValue::Text(s) => CellValue::Text(s),
        SqlValue::Blob(_) => CellValue::Null,
    }
}

/// Chunk rows into pages. An empty result still yields one (empty) page so
/// exporters always have something to render.
fn paginate(rows: Vec<Vec<CellValue>>, rows_per_page: usize) -> Vec<PrintPage> {
    if rows.is_empty() {
        return vec![PrintPage {
            number: 1,
            rows: Vec::new(),
        }];
    }
    rows.chunks(rows_per_page.max(1))
        .enumerate()
        .map(|(idx, chunk)| PrintPage {
            number: idx + 1,
            rows: chunk.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewEmployee, ParamValue};
    use crate::seed;
    use crate::store::RecordStore;
    use crate::template;
    use assert_matches::assert_matches;

    const TEMPLATE: &str = r#"
name: employee_report
title: "$P{title}"
query: >-
  SELECT FIRST_NAME, LAST_NAME, SALARY
  FROM EMPLOYEE
  WHERE SALARY >= $P{minSalary} AND $F{condition}
parameters:
  - name: title
    kind: text
  - name: minSalary
    kind: number
  - name: condition
    kind: filter
columns:
  - field: FIRST_NAME
    label: First Name
  - field: LAST_NAME
    label: Last Name
  - field: SALARY
    label: Salary
rows_per_page: 2
"#;

    fn reference_params() -> Params {
        Params::new()
            .with("title", ParamValue::Text("Employee Report".into()))
            .with("minSalary", ParamValue::Number(150_000.0))
            .with(
                "condition",
                ParamValue::Filter("LAST_NAME = 'Smith' ORDER BY FIRST_NAME".into()),
            )
    }

    fn seeded_store() -> RecordStore {
        let store = RecordStore::open_in_memory().expect("open store");
        seed::seed(&store).expect("seed");
        store
    }

    #[test]
    fn fill_includes_only_matching_rows() {
        let store = seeded_store();
        store
            .insert_employee(&NewEmployee::new("Jane", "Doe", 200_000.0))
            .expect("insert non-matching employee");

        let report = template::compile(TEMPLATE).expect("compile");
        let doc = fill(&report, &reference_params(), store.connection()).expect("fill");

        assert_eq!(doc.title, "Employee Report");
        assert_eq!(doc.row_count(), 1, "only the Smith row matches");
        assert_eq!(
            doc.pages[0].rows[0][0],
            CellValue::Text("John".to_string())
        );
    }

    #[test]
    fn missing_title_fails_instead_of_defaulting() {
        let store = seeded_store();
        let report = template::compile(TEMPLATE).expect("compile");
        let params = Params::new()
            .with("minSalary", ParamValue::Number(150_000.0))
            .with("condition", ParamValue::Filter("LAST_NAME = 'Smith'".into()));

        let err = fill(&report, &params, store.connection()).expect_err("must fail");
        assert_matches!(err, FillError::MissingParameter { name } if name == "title");
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let store = seeded_store();
        let report = template::compile(TEMPLATE).expect("compile");
        let params = reference_params().with("minSalary", ParamValue::Text("a lot".into()));

        let err = fill(&report, &params, store.connection()).expect_err("must fail");
        assert_matches!(err, FillError::WrongKind { name, expected: "number" } if name == "minSalary");
    }

    #[test]
    fn injection_in_condition_is_rejected_before_execution() {
        let store = seeded_store();
        let report = template::compile(TEMPLATE).expect("compile");
        let params = reference_params().with(
            "condition",
            ParamValue::Filter("LAST_NAME = 'Smith';DROP TABLE EMPLOYEE--".into()),
        );

        let err = fill(&report, &params, store.connection()).expect_err("must fail");
        assert_matches!(err, FillError::InvalidFilter { name, .. } if name == "condition");

        // the table is intact
        assert_eq!(store.employee_count().unwrap(), 1);
    }

    #[test]
    fn pagination_splits_at_rows_per_page() {
        let store = RecordStore::open_in_memory().expect("open store");
        for idx in 0..5 {
            store
                .insert_employee(&NewEmployee::new(format!("E{idx}"), "Smith", 160_000.0))
                .expect("insert");
        }

        let report = template::compile(TEMPLATE).expect("compile");
        let doc = fill(&report, &reference_params(), store.connection()).expect("fill");

        assert_eq!(doc.row_count(), 5);
        assert_eq!(doc.page_count(), 3, "5 rows at 2 per page");
        assert_eq!(doc.pages[2].rows.len(), 1);
        assert_eq!(doc.pages[2].number, 3);
    }

    #[test]
    fn empty_result_still_produces_one_page() {
        let store = RecordStore::open_in_memory().expect("open store");
        let report = template::compile(TEMPLATE).expect("compile");
        let doc = fill(&report, &reference_params(), store.connection()).expect("fill");

        assert_eq!(doc.row_count(), 0);
        assert_eq!(doc.page_count(), 1);
    }
}
