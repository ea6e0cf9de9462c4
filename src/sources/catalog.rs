//! Metric catalog
//!
//! `MetricSettings` is the serializable description of one dashboard
//! metric (it is also what `[[metrics]]` entries in the config file
//! deserialize into). It turns into a `PollerConfig` once its endpoint has
//! been rendered and its baseline resolved.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::parse::ResponseShape;
use crate::client::MetricsClient;
use crate::poller::{BaselineEstimator, MetricKind, PollResult, PollerConfig};

/// Public metrics API
pub const DEFAULT_API_URL: &str = "https://ic-api.internetcomputer.org";

/// Block rate assumed when the live rate cannot be fetched
pub const DEFAULT_BLOCKS_PER_SECOND: f64 = 45.0;

/// Block height card refresh
pub const BLOCK_HEIGHT_POLL_INTERVAL_MS: u64 = 4000;

/// Block rate card refresh
pub const BLOCK_RATE_POLL_INTERVAL_MS: u64 = 10_000;

/// Consecutive failures before a card shows an error
pub const NETWORK_ERROR_THRESHOLD: u32 = 2;

pub const BLOCK_HEIGHT_ENDPOINT: &str = "{api}/api/v3/metrics/block-height";
pub const BLOCK_RATE_ENDPOINT: &str = "{api}/api/v3/metrics/block-rate";
pub const MESSAGES_CHART_ENDPOINT: &str =
    "{api}/api/v3/messages-counts-over-time-deprecated?start={start}&end={end}&step={step}";
pub const MESSAGES_CHART_FIELD: &str = "messages_count";

/// Description of one dashboard metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSettings {
    /// Unique key, e.g. `block_height`
    pub name: String,

    /// Card title; defaults to the name
    #[serde(default)]
    pub title: Option<String>,

    /// Endpoint URL; `{api}` is replaced with the configured API base URL
    pub endpoint: String,

    /// JSON field holding the value
    pub field: String,

    #[serde(default)]
    pub shape: ResponseShape,

    /// Discard samples that do not increase the value
    #[serde(default)]
    pub monotonic: bool,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Per-request timeout; defaults to three quarters of the interval
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    #[serde(default = "default_error_threshold")]
    pub error_threshold: u32,

    #[serde(default)]
    pub baseline: Option<BaselineSettings>,
}

fn default_interval_ms() -> u64 {
    10_000
}

fn default_error_threshold() -> u32 {
    NETWORK_ERROR_THRESHOLD
}

fn default_fallback_rate() -> f64 {
    DEFAULT_BLOCKS_PER_SECOND
}

/// How to estimate the value one interval before the first sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BaselineSettings {
    /// Fixed growth rate in units per second
    Rate { per_second: f64 },
    /// Growth rate read once from another endpoint at mount time
    RateFrom {
        endpoint: String,
        field: String,
        #[serde(default)]
        shape: ResponseShape,
        #[serde(default = "default_fallback_rate")]
        fallback_per_second: f64,
    },
}

impl MetricSettings {
    /// Display title
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    pub fn kind(&self) -> MetricKind {
        if self.monotonic {
            MetricKind::Monotonic
        } else {
            MetricKind::Gauge
        }
    }

    /// Endpoint with `{api}` filled in
    pub fn endpoint_url(&self, api_url: &str) -> String {
        render_endpoint(&self.endpoint, api_url)
    }

    /// Resolve the configured baseline, fetching a live rate if needed
    ///
    /// A failed fetch or a negative rate falls back to the configured
    /// default rate.
    pub async fn resolve_baseline(
        &self,
        client: &dyn MetricsClient,
        api_url: &str,
    ) -> Option<BaselineEstimator> {
        match self.baseline.as_ref()? {
            BaselineSettings::Rate { per_second } => Some(BaselineEstimator::Rate {
                per_second: *per_second,
            }),
            BaselineSettings::RateFrom {
                endpoint,
                field,
                shape,
                fallback_per_second,
            } => {
                let url = render_endpoint(endpoint, api_url);
                let per_second = match fetch_rate(client, &url, field, *shape).await {
                    Ok(rate) if rate.is_finite() && rate >= 0.0 => {
                        tracing::debug!(metric = %self.name, rate, "Fetched baseline rate");
                        rate
                    }
                    Ok(rate) => {
                        tracing::warn!(
                            metric = %self.name,
                            rate,
                            fallback = fallback_per_second,
                            "Baseline rate out of range, using fallback"
                        );
                        *fallback_per_second
                    }
                    Err(e) => {
                        tracing::warn!(
                            metric = %self.name,
                            error = %e,
                            fallback = fallback_per_second,
                            "Baseline rate unavailable, using fallback"
                        );
                        *fallback_per_second
                    }
                };
                Some(BaselineEstimator::Rate { per_second })
            }
        }
    }

    /// Build the poller configuration
    pub fn to_poller_config(
        &self,
        api_url: &str,
        baseline: Option<BaselineEstimator>,
    ) -> PollResult<PollerConfig> {
        let interval = Duration::from_millis(self.interval_ms);
        let mut config = PollerConfig::with_parse_fn(
            self.name.clone(),
            self.endpoint_url(api_url),
            interval,
            self.shape.parser(self.field.clone()),
        )
        .kind(self.kind())
        .error_threshold(self.error_threshold);

        if let Some(ms) = self.request_timeout_ms {
            config = config.request_timeout(Duration::from_millis(ms));
        }
        if let Some(estimator) = baseline {
            config = config.baseline(estimator);
        }

        config.validate()?;
        Ok(config)
    }
}

async fn fetch_rate(
    client: &dyn MetricsClient,
    url: &str,
    field: &str,
    shape: ResponseShape,
) -> PollResult<f64> {
    let body = client.get_json(url).await?;
    Ok(shape.parse(&body, field)?.value)
}

/// Replace `{api}` with the API base URL (without a trailing slash)
pub fn render_endpoint(template: &str, api_url: &str) -> String {
    template.replace("{api}", api_url.trim_end_matches('/'))
}

/// Current block height; monotonic, animated from an estimate on first load
pub fn block_height() -> MetricSettings {
    MetricSettings {
        name: "block_height".to_string(),
        title: Some("Blocks".to_string()),
        endpoint: BLOCK_HEIGHT_ENDPOINT.to_string(),
        field: "block_height".to_string(),
        shape: ResponseShape::Point,
        monotonic: true,
        interval_ms: BLOCK_HEIGHT_POLL_INTERVAL_MS,
        request_timeout_ms: None,
        error_threshold: NETWORK_ERROR_THRESHOLD,
        baseline: Some(BaselineSettings::RateFrom {
            endpoint: BLOCK_RATE_ENDPOINT.to_string(),
            field: "block_rate".to_string(),
            shape: ResponseShape::NestedPoint,
            fallback_per_second: DEFAULT_BLOCKS_PER_SECOND,
        }),
    }
}

/// Blocks per second
pub fn block_rate() -> MetricSettings {
    MetricSettings {
        name: "block_rate".to_string(),
        title: Some("Block Rate".to_string()),
        endpoint: BLOCK_RATE_ENDPOINT.to_string(),
        field: "block_rate".to_string(),
        shape: ResponseShape::NestedPoint,
        monotonic: false,
        interval_ms: BLOCK_RATE_POLL_INTERVAL_MS,
        request_timeout_ms: None,
        error_threshold: NETWORK_ERROR_THRESHOLD,
        baseline: None,
    }
}

/// Metrics mounted when the config names none
pub fn builtin_metrics() -> Vec<MetricSettings> {
    vec![block_height(), block_rate()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::ScriptedClient;
    use crate::poller::PollError;
    use serde_json::json;

    const API: &str = "http://metrics.test";

    #[test]
    fn test_render_endpoint() {
        assert_eq!(
            render_endpoint(BLOCK_HEIGHT_ENDPOINT, "http://metrics.test/"),
            "http://metrics.test/api/v3/metrics/block-height"
        );
    }

    #[test]
    fn test_block_height_config() {
        let settings = block_height();
        let config = settings
            .to_poller_config(API, Some(BaselineEstimator::Rate { per_second: 2.0 }))
            .unwrap();

        assert_eq!(config.endpoint, "http://metrics.test/api/v3/metrics/block-height");
        assert_eq!(config.interval, Duration::from_millis(4000));
        assert!(config.kind.is_monotonic());
        assert_eq!(config.error_threshold, 2);

        let sample = (config.parse)(&json!({ "block_height": [1700000000, "123"] })).unwrap();
        assert_eq!(sample.value, 123.0);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = block_rate();
        settings.interval_ms = 1000;
        settings.request_timeout_ms = Some(5000);

        let err = settings.to_poller_config(API, None).unwrap_err();
        assert!(matches!(err, PollError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_baseline_from_live_rate() {
        let client = ScriptedClient::new().route(
            "http://metrics.test/api/v3/metrics/block-rate",
            [json!({ "block_rate": [[1700000000, "30.5"]] })],
        );

        let baseline = block_height().resolve_baseline(&client, API).await;
        assert_eq!(baseline, Some(BaselineEstimator::Rate { per_second: 30.5 }));
    }

    #[tokio::test]
    async fn test_baseline_falls_back() {
        let client = ScriptedClient::new();

        let baseline = block_height().resolve_baseline(&client, API).await;
        assert_eq!(
            baseline,
            Some(BaselineEstimator::Rate {
                per_second: DEFAULT_BLOCKS_PER_SECOND
            })
        );
        assert_eq!(block_rate().resolve_baseline(&client, API).await, None);
    }

    #[tokio::test]
    async fn test_negative_live_rate_falls_back() {
        let client = ScriptedClient::new().route(
            "http://metrics.test/api/v3/metrics/block-rate",
            [json!({ "block_rate": [[1, "-3"]] })],
        );

        let baseline = block_height().resolve_baseline(&client, API).await;
        assert_eq!(
            baseline,
            Some(BaselineEstimator::Rate {
                per_second: DEFAULT_BLOCKS_PER_SECOND
            })
        );
        assert!(block_height().to_poller_config(API, baseline).is_ok());
    }

    #[test]
    fn test_settings_from_toml() {
        let settings: MetricSettings = toml::from_str(
            r#"
            name = "canisters"
            title = "Canisters"
            endpoint = "{api}/api/v3/metrics/registered-canisters-count"
            field = "running_canisters"
            shape = "nested_point"
            monotonic = true
            interval_ms = 60000
            baseline = { type = "rate", per_second = 0.5 }
            "#,
        )
        .unwrap();

        assert_eq!(settings.title(), "Canisters");
        assert_eq!(settings.kind(), MetricKind::Monotonic);
        assert_eq!(settings.error_threshold, NETWORK_ERROR_THRESHOLD);
        assert_eq!(settings.baseline, Some(BaselineSettings::Rate { per_second: 0.5 }));
    }
}
