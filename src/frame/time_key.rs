//! Time key resolution

use super::classify::classify;
use super::types::{ColumnMeta, TypeKind};

/// Pick the column used as the time axis.
///
/// A non-empty explicit key is returned verbatim; the caller checks that it
/// exists. Otherwise the first temporal column wins.
pub fn resolve_time_key(explicit: Option<&str>, meta: &[ColumnMeta]) -> Option<String> {
    if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }

    meta.iter()
        .find(|m| classify(&m.declared_type) == TypeKind::Temporal)
        .map(|m| m.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> Vec<ColumnMeta> {
        vec![
            ColumnMeta::new("host", "LowCardinality(String)"),
            ColumnMeta::new("day", "Nullable(Date)"),
            ColumnMeta::new("ts", "DateTime"),
            ColumnMeta::new("v", "Float64"),
        ]
    }

    #[test]
    fn test_explicit_key_wins() {
        assert_eq!(resolve_time_key(Some("ts"), &meta()), Some("ts".into()));
        // Not checked here
        assert_eq!(
            resolve_time_key(Some("missing"), &meta()),
            Some("missing".into())
        );
    }

    #[test]
    fn test_first_temporal_column() {
        assert_eq!(resolve_time_key(None, &meta()), Some("day".into()));
        assert_eq!(resolve_time_key(Some("  "), &meta()), Some("day".into()));
    }

    #[test]
    fn test_no_temporal_column() {
        let meta = vec![ColumnMeta::new("v", "Float64")];
        assert_eq!(resolve_time_key(None, &meta), None);
        assert_eq!(resolve_time_key(None, &[]), None);
    }
}
