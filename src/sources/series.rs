//! Counter series for charts
//!
//! The messages chart asks for a cumulative counter sampled hourly over the
//! last day and plots how much it grew in each hour.

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;

use super::parse::parse_series;
use crate::client::MetricsClient;
use crate::poller::{MetricSample, PollResult};

/// Growth of a counter within one bucket, stamped with the bucket's end
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Per-bucket growth of a cumulative counter
///
/// The first sample only provides the starting total. Values are floored
/// and a drop in the counter yields 0 rather than a negative bucket.
pub fn bucket_deltas(samples: &[MetricSample]) -> Vec<Bucket> {
    samples
        .windows(2)
        .map(|pair| Bucket {
            timestamp: pair[1].timestamp,
            value: (pair[1].value.floor() - pair[0].value.floor()).max(0.0),
        })
        .collect()
}

/// Time span and resolution of a chart query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
}

impl ChartWindow {
    /// The 24 hours ending at the last full hour before `now`, hourly
    pub fn last_day_hourly(now: DateTime<Utc>) -> Self {
        let end = round_down_to_hour(now);
        Self {
            start: end - Duration::days(1),
            end,
            step: Duration::hours(1),
        }
    }

    /// Fill `{start}`, `{end}` and `{step}` (Unix seconds) into a URL
    pub fn render(&self, url_template: &str) -> String {
        url_template
            .replace("{start}", &self.start.timestamp().to_string())
            .replace("{end}", &self.end.timestamp().to_string())
            .replace("{step}", &self.step.num_seconds().to_string())
    }
}

/// Truncate to the start of the hour
pub fn round_down_to_hour(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_trunc(Duration::hours(1)).unwrap_or(time)
}

/// Fetch a counter series and turn it into per-bucket growth
pub async fn fetch_counter_buckets(
    client: &dyn MetricsClient,
    url: &str,
    field: &str,
) -> PollResult<Vec<Bucket>> {
    let body = client.get_json(url).await?;
    let samples = parse_series(&body, field)?;
    Ok(bucket_deltas(&samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::ScriptedClient;
    use crate::poller::PollError;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(seconds: i64, value: f64) -> MetricSample {
        MetricSample::new(Utc.timestamp_opt(seconds, 0).unwrap(), value)
    }

    #[test]
    fn test_hourly_deltas() {
        let body = json!({ "data": [["1700000000", "50"], ["1700003600", "80"]] });
        let samples = parse_series(&body, "data").unwrap();

        let buckets = bucket_deltas(&samples);

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].value, 30.0);
        assert_eq!(buckets[0].timestamp.timestamp(), 1700003600);
    }

    #[test]
    fn test_deltas_never_negative() {
        let samples = vec![at(0, 100.0), at(3600, 90.0), at(7200, 95.9)];
        let values: Vec<f64> = bucket_deltas(&samples).iter().map(|b| b.value).collect();
        assert_eq!(values, vec![0.0, 5.0]);
    }

    #[test]
    fn test_deltas_of_short_series() {
        assert!(bucket_deltas(&[]).is_empty());
        assert!(bucket_deltas(&[at(0, 1.0)]).is_empty());
    }

    #[test]
    fn test_last_day_window() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 14, 37, 12).unwrap();
        let window = ChartWindow::last_day_hourly(now);

        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap());
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 3, 9, 14, 0, 0).unwrap());

        let url = window.render("http://m/counts?start={start}&end={end}&step={step}");
        assert_eq!(
            url,
            format!(
                "http://m/counts?start={}&end={}&step=3600",
                window.start.timestamp(),
                window.end.timestamp()
            )
        );
    }

    #[tokio::test]
    async fn test_fetch_counter_buckets() {
        let url = "http://m/counts";
        let client = ScriptedClient::new().route(
            url,
            [json!({ "messages_count": [[1700000000, "1000"], [1700003600, "1500"], [1700007200, "1750"]] })],
        );

        let buckets = fetch_counter_buckets(&client, url, "messages_count").await.unwrap();
        let values: Vec<f64> = buckets.iter().map(|b| b.value).collect();
        assert_eq!(values, vec![500.0, 250.0]);

        let err = fetch_counter_buckets(&client, url, "messages_count").await.unwrap_err();
        assert!(matches!(err, PollError::Network(_)));
    }
}
