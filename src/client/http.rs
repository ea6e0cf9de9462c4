//! reqwest-backed metrics client

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::MetricsClient;
use crate::poller::{PollError, PollResult};

/// HTTP client for the public metrics API
pub struct HttpMetricsClient {
    client: Client,
    config: ClientConfig,
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Transport-level timeout in milliseconds; pollers add their own
    /// per-request timeout on top of this
    pub request_timeout_ms: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            user_agent: format!("icpulse/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpMetricsClient {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> PollResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PollError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn map_error(&self, err: reqwest::Error) -> PollError {
        if err.is_timeout() {
            PollError::Timeout(Duration::from_millis(self.config.request_timeout_ms))
        } else if err.is_decode() {
            PollError::Parse(err.to_string())
        } else {
            PollError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl MetricsClient for HttpMetricsClient {
    async fn get_json(&self, url: &str) -> PollResult<Value> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.json::<Value>().await.map_err(|e| self.map_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout_ms, 10_000);
        assert!(config.user_agent.starts_with("icpulse/"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = HttpMetricsClient::new(ClientConfig {
            request_timeout_ms: 500,
            ..Default::default()
        })
        .unwrap();

        // Port 9 (discard) on localhost is closed on test machines
        let err = client.get_json("http://127.0.0.1:9/metrics").await.unwrap_err();
        assert!(matches!(err, PollError::Network(_) | PollError::Timeout(_)));
    }
}
