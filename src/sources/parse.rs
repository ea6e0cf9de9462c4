//! Response parsers for the metrics API
//!
//! The service answers with one named field per document, holding either a
//! single `[timestamp, value]` pair, a list with exactly one such pair, or a
//! list of pairs. Timestamps are Unix seconds; both timestamps and values
//! may arrive as JSON strings or numbers. Lengths are checked before any
//! indexing, and every mismatch is a `PollError::Parse`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::poller::{MetricSample, ParseFn, PollError, PollResult};

/// Layout of the field holding a metric's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// `{ field: [ts, value] }`
    #[default]
    Point,
    /// `{ field: [[ts, value]] }`
    NestedPoint,
    /// `{ field: [[ts, value], ...] }`, the last pair is current
    Series,
}

impl ResponseShape {
    /// Parse `body` according to this shape
    pub fn parse(&self, body: &Value, field: &str) -> PollResult<MetricSample> {
        match self {
            ResponseShape::Point => parse_point(body, field),
            ResponseShape::NestedPoint => parse_nested_point(body, field),
            ResponseShape::Series => parse_latest(body, field),
        }
    }

    /// Build a poller parse function for `field`
    pub fn parser(self, field: impl Into<String>) -> ParseFn {
        let field = field.into();
        Arc::new(move |body: &Value| self.parse(body, &field))
    }
}

/// Parse a number that may be encoded as a JSON string
pub fn parse_number(value: &Value) -> PollResult<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(PollError::parse(format!("expected a number, got {}", value))),
    }
}

/// Parse Unix seconds (integer or fractional) into a UTC timestamp
pub fn parse_timestamp(value: &Value) -> PollResult<DateTime<Utc>> {
    let seconds = parse_number(value)?;
    if seconds < 0.0 {
        return Err(PollError::parse(format!("negative timestamp {}", seconds)));
    }

    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * 1e9) as u32;

    DateTime::from_timestamp(whole as i64, nanos)
        .ok_or_else(|| PollError::parse(format!("timestamp out of range: {}", seconds)))
}

/// Parse a `[timestamp, value]` pair
pub fn parse_pair(pair: &Value) -> PollResult<MetricSample> {
    let items = pair
        .as_array()
        .ok_or_else(|| PollError::parse(format!("expected [timestamp, value], got {}", pair)))?;

    if items.len() != 2 {
        return Err(PollError::parse(format!(
            "expected 2 elements in pair, got {}",
            items.len()
        )));
    }

    Ok(MetricSample::new(
        parse_timestamp(&items[0])?,
        parse_number(&items[1])?,
    ))
}

fn field<'a>(body: &'a Value, name: &str) -> PollResult<&'a Value> {
    body.get(name)
        .ok_or_else(|| PollError::parse(format!("missing field '{}'", name)))
}

fn field_array<'a>(body: &'a Value, name: &str) -> PollResult<&'a Vec<Value>> {
    field(body, name)?
        .as_array()
        .ok_or_else(|| PollError::parse(format!("field '{}' is not an array", name)))
}

/// `{ field: [ts, value] }`
pub fn parse_point(body: &Value, name: &str) -> PollResult<MetricSample> {
    parse_pair(field(body, name)?)
}

/// `{ field: [[ts, value]] }`
pub fn parse_nested_point(body: &Value, name: &str) -> PollResult<MetricSample> {
    let items = field_array(body, name)?;
    match items.as_slice() {
        [pair] => parse_pair(pair),
        _ => Err(PollError::parse(format!(
            "field '{}' should hold exactly one pair, got {}",
            name,
            items.len()
        ))),
    }
}

/// `{ field: [[ts, value], ...] }`, in the order the service sent them
pub fn parse_series(body: &Value, name: &str) -> PollResult<Vec<MetricSample>> {
    field_array(body, name)?.iter().map(parse_pair).collect()
}

/// Last pair of a series
pub fn parse_latest(body: &Value, name: &str) -> PollResult<MetricSample> {
    let items = field_array(body, name)?;
    let last = items
        .last()
        .ok_or_else(|| PollError::parse(format!("field '{}' is empty", name)))?;
    parse_pair(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_with_string_values() {
        let body = json!({ "block_height": [1700000000, "9876543"] });
        let sample = parse_point(&body, "block_height").unwrap();

        assert_eq!(sample.value, 9876543.0);
        assert_eq!(sample.timestamp.timestamp(), 1700000000);
    }

    #[test]
    fn test_point_wrong_length() {
        let body = json!({ "block_height": [1700000000] });
        assert!(matches!(
            parse_point(&body, "block_height"),
            Err(PollError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_field() {
        let body = json!({ "other": [1, "2"] });
        let err = parse_point(&body, "block_height").unwrap_err();
        assert_eq!(err.to_string(), "Parse error: missing field 'block_height'");
    }

    #[test]
    fn test_nested_point() {
        let body = json!({ "block_rate": [[1700000000.5, "33.25"]] });
        let sample = parse_nested_point(&body, "block_rate").unwrap();

        assert_eq!(sample.value, 33.25);
        assert_eq!(sample.timestamp.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_nested_point_requires_single_pair() {
        let empty = json!({ "block_rate": [] });
        let two = json!({ "block_rate": [[1, "1"], [2, "2"]] });

        assert!(parse_nested_point(&empty, "block_rate").is_err());
        assert!(parse_nested_point(&two, "block_rate").is_err());
    }

    #[test]
    fn test_series_and_latest() {
        let body = json!({ "data": [["1700000000", "50"], ["1700003600", "80"]] });

        let series = parse_series(&body, "data").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].value, 80.0);

        let latest = parse_latest(&body, "data").unwrap();
        assert_eq!(latest.value, 80.0);
        assert_eq!(latest.timestamp.timestamp(), 1700003600);
    }

    #[test]
    fn test_latest_of_empty_series() {
        let body = json!({ "data": [] });
        assert!(parse_latest(&body, "data").is_err());
    }

    #[test]
    fn test_rejects_non_numeric() {
        assert!(parse_number(&json!("abc")).is_err());
        assert!(parse_number(&json!(null)).is_err());
        assert!(parse_number(&json!(true)).is_err());
        assert!(parse_timestamp(&json!(-5)).is_err());
    }

    #[test]
    fn test_shape_parser() {
        let parse = ResponseShape::NestedPoint.parser("block_rate");
        let sample = parse(&json!({ "block_rate": [[1700000000, "41.5"]] })).unwrap();
        assert_eq!(sample.value, 41.5);

        let parse = ResponseShape::Series.parser("messages_count");
        let sample = parse(&json!({ "messages_count": [[1, "10"], [2, "12"]] })).unwrap();
        assert_eq!(sample.value, 12.0);
    }

    #[test]
    fn test_shape_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            shape: ResponseShape,
        }
        let w: Wrapper = toml::from_str(r#"shape = "nested_point""#).unwrap();
        assert_eq!(w.shape, ResponseShape::NestedPoint);
    }
}
