//! Field building
//!
//! Turns one column of the raw result set into a typed [`Field`].
//! Missing cells are handled according to a [`NullPolicy`]; cells whose JSON
//! shape does not match the declared type are reported, never coerced.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::classify::classify;
use super::error::{FrameError, FrameResult};
use super::types::{ColumnMeta, Field, FieldValues, RawRow, RawValue, TypeKind};

/// How null or missing cells are materialised
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NullPolicy {
    /// Substitute the kind's zero value: 0.0, empty string, Unix epoch
    #[default]
    Zero,
    /// Keep a null entry for every kind
    Preserve,
}

/// Epoch values below this are seconds, above are milliseconds
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Naive date-time layouts tried in order (interpreted as UTC)
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S%.f",
];

/// Date-only layouts tried in order (midnight UTC)
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%Y%m%d"];

/// Offset-carrying layouts beyond RFC 3339
const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S%.f%:z"];

/// Build a field for a column, classifying it by its declared type
pub fn build_field(column: &ColumnMeta, rows: &[RawRow], policy: NullPolicy) -> FrameResult<Field> {
    build_field_as(&column.name, classify(&column.declared_type), rows, policy)
}

/// Build a field for a column with an explicit kind
pub fn build_field_as(
    name: &str,
    kind: TypeKind,
    rows: &[RawRow],
    policy: NullPolicy,
) -> FrameResult<Field> {
    let mut values = FieldValues::with_capacity(kind, rows.len());

    for (row_idx, row) in rows.iter().enumerate() {
        let cell = row.get(name).unwrap_or(&RawValue::Null);

        match &mut values {
            FieldValues::Numeric(out) => out.push(numeric_cell(name, row_idx, cell, policy)?),
            FieldValues::Temporal(out) => out.push(temporal_cell(name, row_idx, cell, policy)?),
            FieldValues::Textual(out) => out.push(textual_cell(cell, policy)),
        }
    }

    Ok(Field::new(name, values))
}

fn numeric_cell(
    column: &str,
    row: usize,
    cell: &RawValue,
    policy: NullPolicy,
) -> FrameResult<Option<f64>> {
    match cell {
        RawValue::Number(n) => Ok(Some(*n)),
        RawValue::Null => Ok(zero_or_null(policy, 0.0)),
        other => Err(FrameError::TypeMismatch {
            column: column.to_string(),
            row,
            expected: "number",
            found: other.shape(),
        }),
    }
}

fn temporal_cell(
    column: &str,
    row: usize,
    cell: &RawValue,
    policy: NullPolicy,
) -> FrameResult<Option<DateTime<Utc>>> {
    match cell {
        RawValue::String(s) => parse_timestamp(s)
            .map(Some)
            .ok_or_else(|| FrameError::InvalidTimestamp {
                column: column.to_string(),
                row,
                value: s.clone(),
            }),
        RawValue::Number(n) => {
            epoch_to_datetime(*n)
                .map(Some)
                .ok_or_else(|| FrameError::InvalidTimestamp {
                    column: column.to_string(),
                    row,
                    value: n.to_string(),
                })
        }
        RawValue::Null => Ok(zero_or_null(policy, DateTime::<Utc>::default())),
        other => Err(FrameError::TypeMismatch {
            column: column.to_string(),
            row,
            expected: "timestamp",
            found: other.shape(),
        }),
    }
}

fn textual_cell(cell: &RawValue, policy: NullPolicy) -> Option<String> {
    match cell {
        RawValue::String(s) => Some(s.clone()),
        RawValue::Number(n) => Some(n.to_string()),
        RawValue::Other(v) => Some(v.to_string()),
        RawValue::Null => zero_or_null(policy, String::new()),
    }
}

fn zero_or_null<T>(policy: NullPolicy, zero: T) -> Option<T> {
    match policy {
        NullPolicy::Zero => Some(zero),
        NullPolicy::Preserve => None,
    }
}

/// Convert an epoch number to a timestamp, guessing seconds vs milliseconds
pub fn epoch_to_datetime(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }

    let millis = if value.abs() < EPOCH_MILLIS_THRESHOLD {
        value * 1000.0
    } else {
        value
    };

    Utc.timestamp_millis_opt(millis.round() as i64).single()
}

/// Parse a textual timestamp in any of the common layouts.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]` (with space or `T`), offset
/// suffixes, slash and dotted dates, date-only values and epoch digits.
/// Zone-less values are read as UTC.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    // Bare epoch. Eight digits are ambiguous with YYYYMMDD; prefer the date.
    if s.len() != 8 && s.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        if let Ok(n) = s.parse::<f64>() {
            return epoch_to_datetime(n);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}
