//! Long-to-wide reshaping
//!
//! A long result has one row per (time, labels, values) and repeats each
//! timestamp once per label set. Pivoting produces one row per distinct
//! timestamp and one field per (value column, label set); cells with no
//! matching source row are null.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use super::assemble::{select_columns, FrameOptions, RESPONSE_FRAME};
use super::classify::classify;
use super::error::{FrameError, FrameResult};
use super::field::{build_field, build_field_as};
use super::types::{ColumnMeta, Field, FieldValues, Frame, RawResponse, TypeKind};

type LabelSet = BTreeMap<String, String>;

/// Build the single wide frame for a response.
///
/// Rows are stable-sorted ascending by time first; ties keep their original
/// order. Without label columns the sorted frame is returned as is.
pub fn wide_frame(
    response: &RawResponse,
    time_key: &str,
    options: &FrameOptions,
) -> FrameResult<Frame> {
    let rows = &response.data;
    let policy = options.null_policy;

    let mut numeric = Vec::new();
    let mut textual = Vec::new();
    for column in response.meta.iter().filter(|m| m.name != time_key) {
        match classify(&column.declared_type) {
            TypeKind::Numeric => numeric.push(column),
            TypeKind::Textual => textual.push(column),
            TypeKind::Temporal => {}
        }
    }

    let value_columns = select_columns(&numeric, &options.data_keys);
    if value_columns.is_empty() {
        return Err(FrameError::NoTimeSeries);
    }
    let label_columns = select_columns(&textual, &options.label_keys);

    let time_field = build_field_as(time_key, TypeKind::Temporal, rows, policy)?;
    let value_fields = build_all(&value_columns, response, options)?;
    let label_fields = build_all(&label_columns, response, options)?;

    let times = time_field.as_temporal().unwrap_or_default();
    let order = sort_order(times);

    if label_fields.is_empty() {
        let fields = std::iter::once(&time_field)
            .chain(value_fields.iter())
            .map(|f| Field::new(f.name.clone(), f.values.permute(&order)))
            .collect();
        return Ok(Frame::new(RESPONSE_FRAME, fields));
    }

    Ok(pivot(times, &order, &value_fields, &label_fields, time_key))
}

fn build_all(
    columns: &[&ColumnMeta],
    response: &RawResponse,
    options: &FrameOptions,
) -> FrameResult<Vec<Field>> {
    columns
        .iter()
        .map(|c| build_field(c, &response.data, options.null_policy))
        .collect()
}

/// Row indices sorted ascending by time, stable on ties; nulls sort first
fn sort_order(times: &[Option<DateTime<Utc>>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by_key(|&i| times[i]);
    order
}

fn pivot(
    times: &[Option<DateTime<Utc>>],
    order: &[usize],
    value_fields: &[Field],
    label_fields: &[Field],
    time_key: &str,
) -> Frame {
    // Distinct timestamps in ascending order, and each source row's output row
    let mut distinct: Vec<Option<DateTime<Utc>>> = Vec::new();
    let mut out_row = vec![0usize; times.len()];
    for &i in order {
        if distinct.last() != Some(&times[i]) {
            distinct.push(times[i]);
        }
        out_row[i] = distinct.len() - 1;
    }

    // Label sets in order of first appearance
    let mut series: Vec<LabelSet> = Vec::new();
    let mut series_index: HashMap<LabelSet, usize> = HashMap::new();
    let mut row_series = vec![0usize; times.len()];
    for &i in order {
        let labels = label_set(label_fields, i);
        let idx = match series_index.get(&labels) {
            Some(&idx) => idx,
            None => {
                series.push(labels.clone());
                series_index.insert(labels, series.len() - 1);
                series.len() - 1
            }
        };
        row_series[i] = idx;
    }

    let mut fields = vec![Field::new(time_key, FieldValues::Temporal(distinct.clone()))];

    for (s_idx, labels) in series.iter().enumerate() {
        for value_field in value_fields {
            let Some(source) = value_field.as_numeric() else {
                continue;
            };
            let mut cells: Vec<Option<f64>> = vec![None; distinct.len()];
            for &i in order {
                if row_series[i] == s_idx {
                    // Later rows for the same cell overwrite earlier ones
                    cells[out_row[i]] = source[i];
                }
            }
            fields.push(
                Field::new(value_field.name.clone(), FieldValues::Numeric(cells))
                    .with_labels(labels.clone()),
            );
        }
    }

    Frame::new(RESPONSE_FRAME, fields)
}

fn label_set(label_fields: &[Field], row: usize) -> LabelSet {
    label_fields
        .iter()
        .map(|f| {
            let value = f
                .as_textual()
                .and_then(|v| v[row].clone())
                .unwrap_or_default();
            (f.name.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::assemble::{build_frames, OutputFormat};
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

    fn wide() -> FrameOptions {
        FrameOptions::new(OutputFormat::Wide)
    }

    #[test]
    fn test_wide_without_labels_sorts_by_time() {
        let response = response(
            vec![("ts", "DateTime"), ("v", "Float64")],
            serde_json::json!([
                {"ts": "2024-01-03 00:00:00", "v": 3.0},
                {"ts": "2024-01-01 00:00:00", "v": 1.0},
                {"ts": "2024-01-02 00:00:00", "v": 2.0}
            ]),
        );

        let frames = build_frames(&response, &wide()).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].name, "response");
        assert_eq!(
            frames[0].field("v").unwrap().as_numeric().unwrap(),
            &[Some(1.0), Some(2.0), Some(3.0)]
        );
    }

    #[test]
    fn test_long_to_wide_pivot() {
        let response = response(
            vec![("ts", "DateTime"), ("host", "String"), ("cpu", "Float64")],
            serde_json::json!([
                {"ts": "2024-01-02 00:00:00", "host": "a", "cpu": 3.0},
                {"ts": "2024-01-01 00:00:00", "host": "a", "cpu": 1.0},
                {"ts": "2024-01-01 00:00:00", "host": "b", "cpu": 2.0}
            ]),
        );

        let frame = &build_frames(&response, &wide()).unwrap()[0];

        // One row per distinct timestamp
        assert_eq!(frame.row_count(), 2);
        assert_eq!(frame.fields.len(), 3);

        let time = frame.fields[0].as_temporal().unwrap();
        assert!(time[0] < time[1]);

        let a = &frame.fields[1];
        assert_eq!(a.name, "cpu");
        assert_eq!(a.labels.get("host").map(String::as_str), Some("a"));
        assert_eq!(a.as_numeric().unwrap(), &[Some(1.0), Some(3.0)]);

        let b = &frame.fields[2];
        assert_eq!(b.labels.get("host").map(String::as_str), Some("b"));
        assert_eq!(b.as_numeric().unwrap(), &[Some(2.0), None]);
    }

    #[test]
    fn test_label_keys_select_labels() {
        let response = response(
            vec![
                ("ts", "DateTime"),
                ("host", "String"),
                ("region", "String"),
                ("cpu", "Float64"),
            ],
            serde_json::json!([
                {"ts": "2024-01-01 00:00:00", "host": "a", "region": "eu", "cpu": 1.0},
                {"ts": "2024-01-01 00:00:00", "host": "b", "region": "eu", "cpu": 2.0}
            ]),
        );

        let options = wide().label_keys(vec!["region".into()]);
        let frame = &build_frames(&response, &options).unwrap()[0];

        // Both rows share one label set; the later row wins
        assert_eq!(frame.fields.len(), 2);
        assert_eq!(frame.fields[1].as_numeric().unwrap(), &[Some(2.0)]);
        assert_eq!(frame.fields[1].labels.len(), 1);
    }

    #[test]
    fn test_no_value_columns_is_not_a_time_series() {
        let response = response(
            vec![("ts", "DateTime"), ("host", "String")],
            serde_json::json!([{"ts": "2024-01-01 00:00:00", "host": "a"}]),
        );
        assert_eq!(
            build_frames(&response, &wide()).unwrap_err(),
            FrameError::NoTimeSeries
        );
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let t = Some(DateTime::<Utc>::default());
        assert_eq!(sort_order(&[t, None, t]), vec![1, 0, 2]);
    }
}
