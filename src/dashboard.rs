//! Dashboard
//!
//! Mounts one poller per configured metric and tears them all down
//! together. Pollers are independent; the dashboard only keeps their
//! handles and settings for lookups.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::client::MetricsClient;
use crate::display::{animation_duration, DisplayValue};
use crate::poller::{self, PollResult, PollState, PollerHandle};
use crate::sources::catalog::{MESSAGES_CHART_ENDPOINT, MESSAGES_CHART_FIELD};
use crate::sources::{fetch_counter_buckets, render_endpoint, Bucket, ChartWindow, MetricSettings};

/// A mounted metric
struct MountedMetric {
    settings: MetricSettings,
    handle: PollerHandle,
}

/// Snapshot of one metric for rendering
#[derive(Debug, Clone, Serialize)]
pub struct MetricSnapshot {
    pub name: String,
    pub title: String,
    pub state: PollState,
    pub display: DisplayValue,
    pub error_threshold: u32,
    pub animation_ms: u64,
}

/// Set of running pollers
pub struct Dashboard {
    metrics: Vec<MountedMetric>,
    client: Arc<dyn MetricsClient>,
    api_url: String,
}

impl Dashboard {
    /// Start a poller for every metric in `settings`
    ///
    /// Baselines that need a live rate are fetched first. If any metric is
    /// misconfigured, the pollers already started are stopped and the
    /// error is returned.
    pub async fn mount(
        settings: Vec<MetricSettings>,
        client: Arc<dyn MetricsClient>,
        api_url: impl Into<String>,
    ) -> PollResult<Self> {
        let api_url = api_url.into();
        let mut metrics: Vec<MountedMetric> = Vec::with_capacity(settings.len());

        for metric in settings {
            if metrics.iter().any(|m| m.settings.name == metric.name) {
                tracing::warn!(metric = %metric.name, "Duplicate metric name, skipping");
                continue;
            }

            let baseline = metric.resolve_baseline(client.as_ref(), &api_url).await;
            // On error, `metrics` is dropped and every started handle stops.
            let config = metric.to_poller_config(&api_url, baseline)?;
            let handle = poller::start(config, Arc::clone(&client))?;

            metrics.push(MountedMetric {
                settings: metric,
                handle,
            });
        }

        tracing::info!(count = metrics.len(), api_url = %api_url, "Dashboard mounted");

        Ok(Self {
            metrics,
            client,
            api_url,
        })
    }

    /// Names of the mounted metrics, in mount order
    pub fn names(&self) -> Vec<&str> {
        self.metrics.iter().map(|m| m.settings.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Poller handle for `name`
    pub fn handle(&self, name: &str) -> Option<&PollerHandle> {
        self.find(name).map(|m| &m.handle)
    }

    /// Snapshot of `name`
    pub fn get(&self, name: &str) -> Option<MetricSnapshot> {
        self.find(name).map(snapshot)
    }

    /// Snapshots of every metric, in mount order
    pub fn snapshots(&self) -> Vec<MetricSnapshot> {
        self.metrics.iter().map(snapshot).collect()
    }

    /// Number of metrics currently showing an error
    pub fn error_count(&self) -> usize {
        self.metrics.iter().filter(|m| m.handle.is_error()).count()
    }

    /// Fetch the messages chart for the last 24 hours
    pub async fn messages_chart(&self) -> PollResult<Vec<Bucket>> {
        self.messages_chart_at(Utc::now()).await
    }

    /// Fetch the messages chart for the 24 hours before `now`
    pub async fn messages_chart_at(&self, now: DateTime<Utc>) -> PollResult<Vec<Bucket>> {
        let window = ChartWindow::last_day_hourly(now);
        let url = window.render(&render_endpoint(MESSAGES_CHART_ENDPOINT, &self.api_url));
        fetch_counter_buckets(self.client.as_ref(), &url, MESSAGES_CHART_FIELD).await
    }

    /// Stop every poller. Safe to call more than once.
    pub fn shutdown(&self) {
        for metric in &self.metrics {
            metric.handle.stop();
        }
        tracing::info!("Dashboard shut down");
    }

    fn find(&self, name: &str) -> Option<&MountedMetric> {
        self.metrics.iter().find(|m| m.settings.name == name)
    }
}

fn snapshot(metric: &MountedMetric) -> MetricSnapshot {
    let config = metric.handle.config();
    let state = metric.handle.current_state();

    MetricSnapshot {
        name: metric.settings.name.clone(),
        title: metric.settings.title().to_string(),
        display: DisplayValue::from_state(&state, config.error_threshold),
        state,
        error_threshold: config.error_threshold,
        animation_ms: duration_ms(animation_duration(config.interval)),
    }
}

fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}
