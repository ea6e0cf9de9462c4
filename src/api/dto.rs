//! Data Transfer Objects
//!
//! Response bodies for the API. Everything the dashboard front end needs
//! to render a card is precomputed here, including the display text.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dashboard::MetricSnapshot;
use crate::display::{format_axis_tick, DisplayValue};
use crate::sources::Bucket;

// ============================================
// Metric DTOs
// ============================================

/// One metric card
#[derive(Debug, Serialize)]
pub struct MetricSnapshotResponse {
    pub name: String,
    pub title: String,
    /// Error, loading or the animated value
    pub display: DisplayValue,
    /// Text to show once the animation has finished
    pub text: String,
    pub last_value: Option<f64>,
    pub previous_value: Option<f64>,
    pub delta: Option<f64>,
    pub consecutive_error_count: u32,
    pub error_threshold: u32,
    pub is_loading: bool,
    pub last_sample_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Suggested count-up animation duration
    pub animation_ms: u64,
}

impl From<MetricSnapshot> for MetricSnapshotResponse {
    fn from(snapshot: MetricSnapshot) -> Self {
        Self {
            text: snapshot.display.text(),
            delta: snapshot.state.delta(),
            name: snapshot.name,
            title: snapshot.title,
            display: snapshot.display,
            last_value: snapshot.state.last_value,
            previous_value: snapshot.state.previous_value,
            consecutive_error_count: snapshot.state.consecutive_error_count,
            error_threshold: snapshot.error_threshold,
            is_loading: snapshot.state.is_loading,
            last_sample_at: snapshot.state.last_sample_at,
            last_error: snapshot.state.last_error,
            animation_ms: snapshot.animation_ms,
        }
    }
}

/// Metric list response
#[derive(Debug, Serialize)]
pub struct MetricListResponse {
    pub metrics: Vec<MetricSnapshotResponse>,
    pub total: usize,
    /// Metrics currently showing an error
    pub errors: usize,
}

// ============================================
// Chart DTOs
// ============================================

/// Bar chart response
#[derive(Debug, Serialize)]
pub struct ChartResponse {
    pub title: String,
    pub error: bool,
    pub buckets: Vec<BucketDto>,
}

/// One chart bar
#[derive(Debug, Serialize)]
pub struct BucketDto {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Compact label, e.g. `1.5k`
    pub label: String,
}

impl From<Bucket> for BucketDto {
    fn from(bucket: Bucket) -> Self {
        Self {
            label: format_axis_tick(bucket.value),
            timestamp: bucket.timestamp,
            value: bucket.value,
        }
    }
}

// ============================================
// Health DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy, degraded, unhealthy
    pub status: String,
    /// Number of mounted pollers
    pub pollers: usize,
    /// Pollers past their error threshold
    pub pollers_in_error: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
