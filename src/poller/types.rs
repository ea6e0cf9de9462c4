//! Core data types for the metric poller
//!
//! - `MetricSample`: one parsed reading from the metrics API
//! - `PollState`: the per-poller snapshot handed to the presentation layer
//! - `PollerConfig`: immutable configuration for one poller
//! - `MetricKind` and `BaselineEstimator`: per-metric update policy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::error::{PollError, PollResult};

/// A single metric reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSample {
    /// When the metrics service recorded the value
    pub timestamp: DateTime<Utc>,
    /// The reading itself
    pub value: f64,
}

impl MetricSample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Display state of one poller
///
/// Cloned out to readers; only the owning poller mutates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollState {
    /// Most recently accepted value
    pub last_value: Option<f64>,
    /// Value of `last_value` before the most recent accepted change,
    /// or the estimated baseline after the first sample
    pub previous_value: Option<f64>,
    /// Failed ticks since the last successful one
    pub consecutive_error_count: u32,
    /// True until the first tick completes
    pub is_loading: bool,
    /// Timestamp of the most recently accepted sample
    pub last_sample_at: Option<DateTime<Utc>>,
    /// Message of the most recent failure, cleared on success
    pub last_error: Option<String>,
}

impl PollState {
    /// State of a freshly mounted poller
    pub fn new() -> Self {
        Self {
            last_value: None,
            previous_value: None,
            consecutive_error_count: 0,
            is_loading: true,
            last_sample_at: None,
            last_error: None,
        }
    }

    /// Whether the presentation layer should show an error instead of a value
    pub fn is_error(&self, error_threshold: u32) -> bool {
        self.consecutive_error_count >= error_threshold
    }

    /// Change between the previous and the current value, if both exist
    pub fn delta(&self) -> Option<f64> {
        match (self.previous_value, self.last_value) {
            (Some(prev), Some(last)) => Some(last - prev),
            _ => None,
        }
    }
}

impl Default for PollState {
    fn default() -> Self {
        Self::new()
    }
}

/// How successive samples of a metric relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Cumulative counter; regressions are discarded as glitches
    Monotonic,
    /// Gauge; any different value replaces the current one
    Gauge,
}

impl MetricKind {
    pub fn is_monotonic(&self) -> bool {
        matches!(self, MetricKind::Monotonic)
    }
}

/// Estimates `previous_value` for the very first sample so the first
/// animation starts somewhere sensible
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BaselineEstimator {
    /// The metric grows at roughly this many units per second
    Rate { per_second: f64 },
}

impl BaselineEstimator {
    /// Baseline one poll interval before `value`
    pub fn estimate(&self, value: f64, interval: Duration) -> f64 {
        match self {
            BaselineEstimator::Rate { per_second } => value - per_second * interval.as_secs_f64(),
        }
    }
}

/// Turns a JSON response body into a sample
pub type ParseFn = Arc<dyn Fn(&Value) -> PollResult<MetricSample> + Send + Sync>;

/// Immutable configuration for one poller
#[derive(Clone)]
pub struct PollerConfig {
    /// Metric name, used in logs and lookups
    pub name: String,
    /// Fully rendered endpoint URL
    pub endpoint: String,
    /// Time between ticks
    pub interval: Duration,
    /// Upper bound on a single request; must be shorter than `interval`
    pub request_timeout: Duration,
    /// Response parser
    pub parse: ParseFn,
    /// Optional estimator for the first `previous_value`
    pub baseline: Option<BaselineEstimator>,
    /// Consecutive failures at which the UI switches to an error state
    pub error_threshold: u32,
    /// Update policy
    pub kind: MetricKind,
}

impl PollerConfig {
    /// Create a config with a 2-failure threshold, a gauge policy and a
    /// request timeout of three quarters of the interval
    pub fn new<F>(name: impl Into<String>, endpoint: impl Into<String>, interval: Duration, parse: F) -> Self
    where
        F: Fn(&Value) -> PollResult<MetricSample> + Send + Sync + 'static,
    {
        Self::with_parse_fn(name, endpoint, interval, Arc::new(parse))
    }

    /// Same as [`PollerConfig::new`] for an already shared parser
    pub fn with_parse_fn(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        interval: Duration,
        parse: ParseFn,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            interval,
            request_timeout: interval.mul_f64(0.75),
            parse,
            baseline: None,
            error_threshold: 2,
            kind: MetricKind::Gauge,
        }
    }

    pub fn monotonic(mut self) -> Self {
        self.kind = MetricKind::Monotonic;
        self
    }

    pub fn kind(mut self, kind: MetricKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn baseline(mut self, estimator: BaselineEstimator) -> Self {
        self.baseline = Some(estimator);
        self
    }

    pub fn error_threshold(mut self, threshold: u32) -> Self {
        self.error_threshold = threshold;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check the config before any task is spawned
    pub fn validate(&self) -> PollResult<()> {
        if self.name.trim().is_empty() {
            return Err(PollError::Configuration("metric name must not be empty".into()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(PollError::Configuration(format!(
                "metric '{}' has no endpoint",
                self.name
            )));
        }
        if self.interval.is_zero() {
            return Err(PollError::Configuration(format!(
                "metric '{}' must have a positive poll interval",
                self.name
            )));
        }
        if self.request_timeout.is_zero() || self.request_timeout >= self.interval {
            return Err(PollError::Configuration(format!(
                "metric '{}' request timeout {:?} must be positive and shorter than the poll interval {:?}",
                self.name, self.request_timeout, self.interval
            )));
        }
        if self.error_threshold == 0 {
            return Err(PollError::Configuration(format!(
                "metric '{}' error threshold must be at least 1",
                self.name
            )));
        }
        if let Some(BaselineEstimator::Rate { per_second }) = self.baseline {
            if !per_second.is_finite() || per_second < 0.0 {
                return Err(PollError::Configuration(format!(
                    "metric '{}' baseline rate must be a non-negative number",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PollerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollerConfig")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("interval", &self.interval)
            .field("request_timeout", &self.request_timeout)
            .field("baseline", &self.baseline)
            .field("error_threshold", &self.error_threshold)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
