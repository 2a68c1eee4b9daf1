//! Response-to-frame transformation engine
//!
//! Takes a column-described JSON result set and produces strongly-typed,
//! time-aligned frames.
//!
//! ## Pipeline
//!
//! 1. [`resolve_time_key`] picks the time axis
//! 2. [`classify`] maps each declared type to a [`TypeKind`]
//! 3. [`build_field`] turns a column into a typed [`Field`]
//! 4. [`build_frames`] assembles fields into [`Frame`]s
//!
//! ## Example
//!
//! ```rust
//! use pipeframe::frame::{build_frames, FrameOptions, RawResponse};
//!
//! let body = r#"{
//!     "meta": [{"name": "ts", "type": "DateTime"}, {"name": "v", "type": "Float64"}],
//!     "data": [{"ts": "2024-01-01 00:00:00", "v": 5.0}]
//! }"#;
//! let response: RawResponse = serde_json::from_str(body).unwrap();
//! let frames = build_frames(&response, &FrameOptions::default()).unwrap();
//! assert_eq!(frames[0].name, "v");
//! ```

mod assemble;
mod classify;
mod error;
mod field;
mod pivot;
mod time_key;
mod types;

pub use assemble::{
    build_frames, per_metric_frames, table_frame, FrameOptions, OutputFormat, RESPONSE_FRAME,
};
pub use classify::{classify, unwrap_type, NUMERIC_TYPES, TEMPORAL_TYPES};
pub use error::{FrameError, FrameResult};
pub use field::{build_field, build_field_as, epoch_to_datetime, parse_timestamp, NullPolicy};
pub use pivot::wide_frame;
pub use time_key::resolve_time_key;
pub use types::{
    ColumnMeta, Field, FieldValues, Frame, RawResponse, RawRow, RawValue, Statistics, TypeKind,
};
