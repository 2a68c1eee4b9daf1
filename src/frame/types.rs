//! Core data types for the transformation engine
//!
//! This module defines the types flowing through the engine:
//! - `ColumnMeta`, `RawValue`, `RawRow`, `RawResponse`: the upstream result set
//! - `TypeKind`: semantic classification of a column
//! - `Field` and `Frame`: the strongly-typed output tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Column description from the response `meta` block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column name as it appears in each data row
    pub name: String,
    /// Declared type, possibly wrapped (e.g. `Nullable(DateTime)`)
    #[serde(rename = "type")]
    pub declared_type: String,
}

impl ColumnMeta {
    /// Create a column description
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }
}

/// Semantic kind of a column
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Integers, floats and decimals
    Numeric,
    /// Dates and date-times
    Temporal,
    /// Everything else
    Textual,
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeKind::Numeric => write!(f, "numeric"),
            TypeKind::Temporal => write!(f, "temporal"),
            TypeKind::Textual => write!(f, "textual"),
        }
    }
}

/// A single cell of the raw result set
///
/// JSON cells are dynamically typed; this is the explicit discriminated form
/// the field builder works on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum RawValue {
    Number(f64),
    String(String),
    Null,
    /// Booleans, arrays and objects
    Other(serde_json::Value),
}

impl RawValue {
    /// Short name of the JSON shape, used in mismatch errors
    pub fn shape(&self) -> &'static str {
        match self {
            RawValue::Number(_) => "number",
            RawValue::String(_) => "string",
            RawValue::Null => "null",
            RawValue::Other(serde_json::Value::Bool(_)) => "boolean",
            RawValue::Other(serde_json::Value::Array(_)) => "array",
            RawValue::Other(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawValue::Null,
            serde_json::Value::String(s) => RawValue::String(s),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => RawValue::Number(f),
                None => RawValue::Other(serde_json::Value::Number(n)),
            },
            other => RawValue::Other(other),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_string())
    }
}

/// One row of the result set, keyed by column name
pub type RawRow = HashMap<String, RawValue>;

/// Query statistics reported by the upstream API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    #[serde(default)]
    pub elapsed: Option<f64>,
    #[serde(default)]
    pub rows_read: Option<u64>,
    #[serde(default)]
    pub bytes_read: Option<u64>,
}

/// Decoded body of a pipe response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResponse {
    /// Upstream error message; when non-empty, `meta` and `data` are ignored
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub meta: Vec<ColumnMeta>,
    #[serde(default)]
    pub data: Vec<RawRow>,
    #[serde(default)]
    pub rows: Option<u64>,
    #[serde(default)]
    pub rows_before_limit_at_least: Option<u64>,
    #[serde(default)]
    pub statistics: Option<Statistics>,
}

impl RawResponse {
    /// The upstream error, if one was reported
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    /// Find a column description by name
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.meta.iter().find(|m| m.name == name)
    }
}

/// Values of a field, one variant per kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValues {
    Numeric(Vec<Option<f64>>),
    Temporal(Vec<Option<DateTime<Utc>>>),
    Textual(Vec<Option<String>>),
}

impl FieldValues {
    /// Create an empty value vector for the given kind
    pub fn with_capacity(kind: TypeKind, capacity: usize) -> Self {
        match kind {
            TypeKind::Numeric => FieldValues::Numeric(Vec::with_capacity(capacity)),
            TypeKind::Temporal => FieldValues::Temporal(Vec::with_capacity(capacity)),
            TypeKind::Textual => FieldValues::Textual(Vec::with_capacity(capacity)),
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            FieldValues::Numeric(_) => TypeKind::Numeric,
            FieldValues::Temporal(_) => TypeKind::Temporal,
            FieldValues::Textual(_) => TypeKind::Textual,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValues::Numeric(v) => v.len(),
            FieldValues::Temporal(v) => v.len(),
            FieldValues::Textual(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the entry at `index` is null
    pub fn is_null(&self, index: usize) -> bool {
        match self {
            FieldValues::Numeric(v) => v.get(index).map_or(true, Option::is_none),
            FieldValues::Temporal(v) => v.get(index).map_or(true, Option::is_none),
            FieldValues::Textual(v) => v.get(index).map_or(true, Option::is_none),
        }
    }

    /// Reorder values by the given row permutation
    pub fn permute(&self, order: &[usize]) -> Self {
        match self {
            FieldValues::Numeric(v) => FieldValues::Numeric(order.iter().map(|&i| v[i]).collect()),
            FieldValues::Temporal(v) => {
                FieldValues::Temporal(order.iter().map(|&i| v[i]).collect())
            }
            FieldValues::Textual(v) => {
                FieldValues::Textual(order.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// A named, homogeneously-typed column of values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TypeKind,
    /// Series labels, set when a long result is pivoted
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub values: FieldValues,
}

impl Field {
    /// Create a field from its values; the kind follows the values
    pub fn new(name: impl Into<String>, values: FieldValues) -> Self {
        Self {
            name: name.into(),
            kind: values.kind(),
            labels: BTreeMap::new(),
            values,
        }
    }

    /// Builder method: attach labels
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Numeric values, if this is a numeric field
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.values {
            FieldValues::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Temporal values, if this is a temporal field
    pub fn as_temporal(&self) -> Option<&[Option<DateTime<Utc>>]> {
        match &self.values {
            FieldValues::Temporal(v) => Some(v),
            _ => None,
        }
    }

    /// Textual values, if this is a textual field
    pub fn as_textual(&self) -> Option<&[Option<String>]> {
        match &self.values {
            FieldValues::Textual(v) => Some(v),
            _ => None,
        }
    }
}

/// A named table of equal-length fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Frame {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Number of rows (length of the first field)
    pub fn row_count(&self) -> usize {
        self.fields.first().map(Field::len).unwrap_or(0)
    }

    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_from_json() {
        let row: RawRow =
            serde_json::from_str(r#"{"a": 1, "b": "x", "c": null, "d": true, "e": [1]}"#).unwrap();
        assert_eq!(row["a"], RawValue::Number(1.0));
        assert_eq!(row["b"], RawValue::String("x".into()));
        assert!(row["c"].is_null());
        assert_eq!(row["d"].shape(), "boolean");
        assert_eq!(row["e"].shape(), "array");
    }

    #[test]
    fn test_response_decoding() {
        let body = r#"{
            "meta": [{"name": "ts", "type": "DateTime"}, {"name": "v", "type": "Float64"}],
            "data": [{"ts": "2024-01-01 00:00:00", "v": 5.0}],
            "rows": 1,
            "statistics": {"elapsed": 0.001, "rows_read": 10, "bytes_read": 80}
        }"#;
        let response: RawResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.meta[0], ColumnMeta::new("ts", "DateTime"));
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.rows, Some(1));
        assert!(response.error_message().is_none());
        assert_eq!(response.statistics.unwrap().rows_read, Some(10));
    }

    #[test]
    fn test_empty_error_is_not_an_error() {
        let response: RawResponse = serde_json::from_str(r#"{"error": ""}"#).unwrap();
        assert!(response.error_message().is_none());

        let response: RawResponse = serde_json::from_str(r#"{"error": "boom"}"#).unwrap();
        assert_eq!(response.error_message(), Some("boom"));
    }

    #[test]
    fn test_permute() {
        let values = FieldValues::Textual(vec![Some("a".into()), None, Some("c".into())]);
        let permuted = values.permute(&[2, 0, 1]);
        assert_eq!(
            permuted,
            FieldValues::Textual(vec![Some("c".into()), Some("a".into()), None])
        );
    }
}
