//! Time variable expansion
//!
//! Query parameters may reference the requested time range through
//! placeholders such as `${__from}`, `${__to:date}`, `${__from:date:seconds}`
//! or `${__to:date:YYYY-MM-DD}`. They are replaced by literal values before
//! the parameters are sent upstream.

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::error::{QueryError, QueryResult};
use super::model::TimeRange;

/// Marker for the start of the range
pub const FROM_MARKER: &str = "__from";
/// Marker for the end of the range
pub const TO_MARKER: &str = "__to";

fn custom_format() -> &'static Regex {
    static CUSTOM_FORMAT: OnceLock<Regex> = OnceLock::new();
    CUSTOM_FORMAT.get_or_init(|| Regex::new(r"date:(.*)\}").expect("custom format regex is valid"))
}

/// Pattern tokens and their strftime equivalents
const PATTERN_TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("mm", "%M"),
    ("ss", "%S"),
];

/// Expand one placeholder against a range boundary
pub fn expand(placeholder: &str, boundary: DateTime<Utc>) -> QueryResult<String> {
    if !placeholder.contains(':') {
        return Ok(default_layout(boundary));
    }

    if placeholder.ends_with(":date}") || placeholder.ends_with(":date:iso}") {
        return Ok(boundary.to_rfc3339_opts(SecondsFormat::Secs, true));
    }

    if placeholder.ends_with(":date:seconds}") {
        return Ok(boundary.timestamp().to_string());
    }

    let pattern = custom_format()
        .captures(placeholder)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            QueryError::Validation(format!("invalid time variable format: {}", placeholder))
        })?;

    Ok(boundary.format(&translate_pattern(pattern)).to_string())
}

/// `2024-01-15 10:30:00.12 +0000 UTC`: the fraction is omitted when zero and
/// otherwise printed without trailing zeros.
fn default_layout(boundary: DateTime<Utc>) -> String {
    let nanos = boundary.timestamp_subsec_nanos();
    let fraction = if nanos == 0 {
        String::new()
    } else {
        format!(".{:09}", nanos).trim_end_matches('0').to_string()
    };

    format!(
        "{}{} {}",
        boundary.format("%Y-%m-%d %H:%M:%S"),
        fraction,
        boundary.format("%z %Z")
    )
}

/// Translate a `YYYY-MM-DD HH:mm:ss` style pattern to strftime.
///
/// Tokens are matched left to right so neighbouring tokens never merge;
/// everything else is literal.
fn translate_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;

    'scan: while let Some(ch) = rest.chars().next() {
        for (token, strftime) in PATTERN_TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                out.push_str(strftime);
                rest = after;
                continue 'scan;
            }
        }

        if ch == '%' {
            out.push_str("%%");
        } else {
            out.push(ch);
        }
        rest = &rest[ch.len_utf8()..];
    }

    out
}

/// Expand all parameters of a query.
///
/// Values are trimmed and empty ones are dropped. Values mentioning
/// `__from` take the range start, values mentioning `__to` the range end.
/// Output is ordered by parameter name.
pub fn expand_params(
    params: &BTreeMap<String, String>,
    range: &TimeRange,
) -> QueryResult<Vec<(String, String)>> {
    let mut expanded = Vec::with_capacity(params.len());

    for (key, raw) in params {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }

        let value = if value.contains(FROM_MARKER) {
            expand(value, range.from).map_err(|e| param_error(key, e))?
        } else if value.contains(TO_MARKER) {
            expand(value, range.to).map_err(|e| param_error(key, e))?
        } else {
            value.to_string()
        };

        expanded.push((key.clone(), value));
    }

    Ok(expanded)
}

fn param_error(key: &str, err: QueryError) -> QueryError {
    QueryError::Validation(format!("parameter '{}': {}", key, err))
}
