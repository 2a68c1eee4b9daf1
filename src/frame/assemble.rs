//! Frame assembly
//!
//! Combines fields into output frames. Three shapes are supported:
//!
//! - **Per-metric** (`timeseries`): one frame per value column, each holding
//!   the shared time field and that column
//! - **Wide** (`wide`): a single frame, long results pivoted by label columns
//! - **Table** (`table`): every column as-is, no time axis required

use serde::{Deserialize, Serialize};

use super::classify::classify;
use super::error::{FrameError, FrameResult};
use super::field::{build_field, build_field_as, NullPolicy};
use super::pivot::wide_frame;
use super::time_key::resolve_time_key;
use super::types::{ColumnMeta, Frame, RawResponse, TypeKind};

/// Name of the single frame produced by the wide and table shapes
pub const RESPONSE_FRAME: &str = "response";

/// Output shape requested by a query
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One frame per metric paired with the time field
    #[default]
    #[serde(alias = "time_series")]
    TimeSeries,
    /// One frame, long results pivoted to wide
    Wide,
    /// One frame with every column
    Table,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::TimeSeries => write!(f, "timeseries"),
            OutputFormat::Wide => write!(f, "wide"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

/// Options controlling frame assembly
#[derive(Debug, Clone, Default)]
pub struct FrameOptions {
    pub format: OutputFormat,
    /// Explicit time key; resolved from metadata when absent
    pub time_key: Option<String>,
    /// Value columns to keep; empty keeps all
    pub data_keys: Vec<String>,
    /// Label columns used when pivoting; empty uses every textual column
    pub label_keys: Vec<String>,
    pub null_policy: NullPolicy,
}

impl FrameOptions {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Builder method: set the explicit time key
    pub fn time_key(mut self, key: impl Into<String>) -> Self {
        self.time_key = Some(key.into());
        self
    }

    /// Builder method: restrict value columns
    pub fn data_keys(mut self, keys: Vec<String>) -> Self {
        self.data_keys = keys;
        self
    }

    /// Builder method: restrict label columns
    pub fn label_keys(mut self, keys: Vec<String>) -> Self {
        self.label_keys = keys;
        self
    }

    /// Builder method: set the null policy
    pub fn null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = policy;
        self
    }
}

/// Turn a decoded response into frames
pub fn build_frames(response: &RawResponse, options: &FrameOptions) -> FrameResult<Vec<Frame>> {
    if response.data.is_empty() {
        return Err(FrameError::NoData);
    }

    if options.format == OutputFormat::Table {
        return table_frame(response, options.null_policy).map(|frame| vec![frame]);
    }

    let time_key = resolve_time_key(options.time_key.as_deref(), &response.meta)
        .ok_or(FrameError::NoTimeKey)?;

    if response.column(&time_key).is_none() {
        return Err(FrameError::TimeKeyNotFound(time_key));
    }

    match options.format {
        OutputFormat::Wide => wide_frame(response, &time_key, options).map(|frame| vec![frame]),
        _ => per_metric_frames(response, &time_key, options),
    }
}

/// One frame per non-temporal column, each `[time, value]`.
///
/// Temporal columns other than the time key are dropped.
pub fn per_metric_frames(
    response: &RawResponse,
    time_key: &str,
    options: &FrameOptions,
) -> FrameResult<Vec<Frame>> {
    let rows = &response.data;
    let time_field = build_field_as(time_key, TypeKind::Temporal, rows, options.null_policy)?;

    let candidates: Vec<&ColumnMeta> = response
        .meta
        .iter()
        .filter(|m| m.name != time_key && classify(&m.declared_type) != TypeKind::Temporal)
        .collect();

    let mut frames = Vec::with_capacity(candidates.len());
    for column in select_columns(&candidates, &options.data_keys) {
        let value_field = build_field(column, rows, options.null_policy)?;
        frames.push(Frame::new(
            column.name.clone(),
            vec![time_field.clone(), value_field],
        ));
    }

    Ok(frames)
}

/// Every column in metadata order, each built by its own kind
pub fn table_frame(response: &RawResponse, policy: NullPolicy) -> FrameResult<Frame> {
    let fields = response
        .meta
        .iter()
        .map(|column| build_field(column, &response.data, policy))
        .collect::<FrameResult<Vec<_>>>()?;

    Ok(Frame::new(RESPONSE_FRAME, fields))
}

/// Narrow candidate columns to the requested keys.
///
/// Falls back to every candidate when no requested key matches one.
pub(crate) fn select_columns<'a>(
    candidates: &[&'a ColumnMeta],
    requested: &[String],
) -> Vec<&'a ColumnMeta> {
    let selected: Vec<&ColumnMeta> = candidates
        .iter()
        .copied()
        .filter(|c| requested.iter().any(|k| k == &c.name))
        .collect();

    if selected.is_empty() {
        candidates.to_vec()
    } else {
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::types::RawRow;

    fn response(meta: Vec<(&str, &str)>, data: serde_json::Value) -> RawResponse {
        RawResponse {
            meta: meta
                .into_iter()
                .map(|(n, t)| ColumnMeta::new(n, t))
                .collect(),
            data: serde_json::from_value::<Vec<RawRow>>(data).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_per_metric_single_frame() {
        let response = response(
            vec![("ts", "DateTime"), ("v", "Float64")],
            serde_json::json!([
                {"ts": "2024-01-01 00:00:00", "v": 5.0},
                {"ts": "2024-01-02 00:00:00", "v": null}
            ]),
        );

        let frames = build_frames(&response, &FrameOptions::default()).unwrap();
        assert_eq!(frames.len(), 1);

        let frame = &frames[0];
        assert_eq!(frame.name, "v");
        assert_eq!(frame.row_count(), 2);
        assert_eq!(frame.fields[0].name, "ts");
        assert_eq!(frame.fields[0].kind, TypeKind::Temporal);
        assert_eq!(frame.fields[1].as_numeric().unwrap(), &[Some(5.0), Some(0.0)]);
    }

    #[test]
    fn test_per_metric_drops_extra_temporal_columns() {
        let response = response(
            vec![
                ("ts", "DateTime"),
                ("day", "Date"),
                ("host", "LowCardinality(String)"),
                ("cpu", "Float32"),
            ],
            serde_json::json!([
                {"ts": "2024-01-01 00:00:00", "day": "2024-01-01", "host": "a", "cpu": 0.5}
            ]),
        );

        let frames = build_frames(&response, &FrameOptions::default()).unwrap();
        let names: Vec<&str> = frames.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["host", "cpu"]);
        assert!(frames.iter().all(|f| f.fields.len() == 2));
    }

    #[test]
    fn test_data_keys_narrow_frames() {
        let response = response(
            vec![("ts", "DateTime"), ("a", "Int64"), ("b", "Int64")],
            serde_json::json!([{"ts": "2024-01-01 00:00:00", "a": 1, "b": 2}]),
        );

        let options = FrameOptions::default().data_keys(vec!["b".into()]);
        let frames = build_frames(&response, &options).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].name, "b");

        let options = FrameOptions::default().data_keys(vec!["zzz".into()]);
        assert_eq!(build_frames(&response, &options).unwrap().len(), 2);
    }

    #[test]
    fn test_explicit_epoch_time_key() {
        let response = response(
            vec![("t", "UInt64"), ("v", "Float64")],
            serde_json::json!([{"t": 1704067200, "v": 1.0}]),
        );

        let options = FrameOptions::default().time_key("t");
        let frames = build_frames(&response, &options).unwrap();
        assert_eq!(frames.len(), 1);
        let time = frames[0].fields[0].as_temporal().unwrap();
        assert_eq!(time[0].unwrap().timestamp(), 1_704_067_200);
    }

    #[test]
    fn test_empty_data_is_no_data() {
        for format in [OutputFormat::TimeSeries, OutputFormat::Wide, OutputFormat::Table] {
            let response = response(vec![("ts", "DateTime")], serde_json::json!([]));
            assert_eq!(
                build_frames(&response, &FrameOptions::new(format)).unwrap_err(),
                FrameError::NoData
            );
        }
    }

    #[test]
    fn test_no_time_key() {
        let response = response(vec![("v", "Float64")], serde_json::json!([{"v": 1.0}]));
        assert_eq!(
            build_frames(&response, &FrameOptions::default()).unwrap_err(),
            FrameError::NoTimeKey
        );
    }

    #[test]
    fn test_unknown_explicit_time_key() {
        let response = response(
            vec![("ts", "DateTime"), ("v", "Float64")],
            serde_json::json!([{"ts": "2024-01-01 00:00:00", "v": 1.0}]),
        );
        let options = FrameOptions::default().time_key("when");
        assert_eq!(
            build_frames(&response, &options).unwrap_err(),
            FrameError::TimeKeyNotFound("when".into())
        );
    }

    #[test]
    fn test_table_keeps_all_columns() {
        let response = response(
            vec![("name", "String"), ("n", "UInt8"), ("ts", "DateTime")],
            serde_json::json!([{"name": "x", "n": 1, "ts": "2024-01-01 00:00:00"}]),
        );

        let frames = build_frames(&response, &FrameOptions::new(OutputFormat::Table)).unwrap();
        assert_eq!(frames.len(), 1);
        let kinds: Vec<TypeKind> = frames[0].fields.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![TypeKind::Textual, TypeKind::Numeric, TypeKind::Temporal]
        );
    }

    #[test]
    fn test_type_mismatch_aborts() {
        let response = response(
            vec![("ts", "DateTime"), ("v", "Float64")],
            serde_json::json!([{"ts": "2024-01-01 00:00:00", "v": "oops"}]),
        );
        let err = build_frames(&response, &FrameOptions::default()).unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_output_format_serde() {
        let format: OutputFormat = serde_json::from_str(r#""timeseries""#).unwrap();
        assert_eq!(format, OutputFormat::TimeSeries);
        let format: OutputFormat = serde_json::from_str(r#""table""#).unwrap();
        assert_eq!(format, OutputFormat::Table);
        assert_eq!(OutputFormat::Wide.to_string(), "wide");
    }
}
