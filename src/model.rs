//! Row records and report parameters.
//!
//! The records map one-to-one onto the `EMPLOYEE` and `EMAIL` tables. The
//! `New*` variants are the pre-persistence shape: the store assigns the
//! surrogate id on save. Plain constructors take the full field set; there is
//! no partial construction.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A persisted employee row. Immutable once seeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub salary: f64,
}

/// An employee waiting to be persisted.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub salary: f64,
}

impl NewEmployee {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        salary: f64,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            salary,
        }
    }
}

/// A persisted email row, referencing exactly one employee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub id: i64,
    pub address: String,
    pub employee_id: i64,
}

/// An email waiting to be persisted. `employee_id` must reference an
/// already-persisted employee.
#[derive(Debug, Clone)]
pub struct NewEmail {
    pub address: String,
    pub employee_id: i64,
}

impl NewEmail {
    pub fn new(address: impl Into<String>, employee_id: i64) -> Self {
        Self {
            address: address.into(),
            employee_id,
        }
    }
}

/// The kind a template declares for a parameter.
///
/// `Filter` parameters are the constrained replacement for the raw
/// condition-splicing the reference behavior performed: their values must
/// parse under the filter-clause grammar before they reach a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Text,
    Number,
    Filter,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Text => "text",
            ParamKind::Number => "number",
            ParamKind::Filter => "filter",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar value supplied to the fill step.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Number(f64),
    Filter(String),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Text(_) => ParamKind::Text,
            ParamValue::Number(_) => ParamKind::Number,
            ParamValue::Filter(_) => ParamKind::Filter,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) | ParamValue::Filter(s) => f.write_str(s),
            ParamValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Ordered name → value mapping passed into the fill step.
#[derive(Debug, Clone, Default)]
pub struct Params(IndexMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_value_kind_matches_variant() {
        assert_eq!(ParamValue::Text("x".into()).kind(), ParamKind::Text);
        assert_eq!(ParamValue::Number(1.0).kind(), ParamKind::Number);
        assert_eq!(ParamValue::Filter("A = 1".into()).kind(), ParamKind::Filter);
    }

    #[test]
    fn number_display_has_no_trailing_fraction_for_integral_values() {
        assert_eq!(ParamValue::Number(150_000.0).to_string(), "150000");
        assert_eq!(ParamValue::Number(0.5).to_string(), "0.5");
    }

    #[test]
    fn params_preserve_insertion_order() {
        let params = Params::new()
            .with("title", ParamValue::Text("t".into()))
            .with("minSalary", ParamValue::Number(1.0))
            .with("condition", ParamValue::Filter("A = 1".into()));

        let names: Vec<&str> = params.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["title", "minSalary", "condition"]);
    }
}
