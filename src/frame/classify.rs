//! Type classification
//!
//! Maps a declared column type to a [`TypeKind`]. Wrapper types
//! (`Nullable(..)`, `LowCardinality(..)`) are stripped first.

use super::types::TypeKind;

/// Declared types treated as numeric
pub const NUMERIC_TYPES: &[&str] = &[
    "UInt8",
    "UInt16",
    "UInt32",
    "UInt64",
    "Int8",
    "Int16",
    "Int32",
    "Int64",
    "Float32",
    "Float64",
    "Decimal",
    "Decimal32",
    "Decimal64",
    "Decimal128",
];

/// Declared types treated as temporal
pub const TEMPORAL_TYPES: &[&str] = &[
    "Date",
    "DateTime",
    "DateTime64",
    "DateTime64(3)",
    "DateTime64(6)",
];

const WRAPPERS: &[&str] = &["Nullable(", "LowCardinality("];

/// Strip `Nullable(..)` and `LowCardinality(..)` wrappers, including nested ones
pub fn unwrap_type(declared: &str) -> &str {
    let mut current = declared.trim();

    loop {
        let inner = WRAPPERS.iter().find_map(|prefix| {
            current
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(')'))
        });

        match inner {
            Some(inner) => current = inner.trim(),
            None => return current,
        }
    }
}

/// Classify a declared type
pub fn classify(declared: &str) -> TypeKind {
    let effective = unwrap_type(declared);

    if NUMERIC_TYPES.contains(&effective) {
        TypeKind::Numeric
    } else if TEMPORAL_TYPES.contains(&effective) {
        TypeKind::Temporal
    } else {
        TypeKind::Textual
    }
}
