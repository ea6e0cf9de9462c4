//! Metric Sources
//!
//! What the dashboard polls and how the answers are read:
//! - response shape parsers
//! - counter series to per-bucket growth for charts
//! - the catalog of built-in and configured metrics

pub mod catalog;
pub mod parse;
pub mod series;

pub use catalog::{
    block_height, block_rate, builtin_metrics, render_endpoint, BaselineSettings, MetricSettings,
    DEFAULT_API_URL,
};
pub use parse::{parse_latest, parse_nested_point, parse_point, parse_series, ResponseShape};
pub use series::{bucket_deltas, fetch_counter_buckets, Bucket, ChartWindow};
