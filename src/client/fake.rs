//! Scripted metrics client for tests and demos

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::MetricsClient;
use crate::poller::{PollError, PollResult};

/// One canned response
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    response: PollResult<Value>,
    delay: Option<Duration>,
}

impl ScriptedResponse {
    pub fn immediate(response: PollResult<Value>) -> Self {
        Self {
            response,
            delay: None,
        }
    }

    pub fn with_delay(response: PollResult<Value>, delay: Duration) -> Self {
        Self {
            response,
            delay: Some(delay),
        }
    }
}

impl From<PollResult<Value>> for ScriptedResponse {
    fn from(response: PollResult<Value>) -> Self {
        Self::immediate(response)
    }
}

impl From<Value> for ScriptedResponse {
    fn from(body: Value) -> Self {
        Self::immediate(Ok(body))
    }
}

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<ScriptedResponse>>,
    fallback: HashMap<String, ScriptedResponse>,
    prefixed: Vec<(String, ScriptedResponse)>,
    requests: Vec<String>,
}

/// Client that answers from per-URL scripts
///
/// Queued responses are served first, in order; after that the URL's
/// fallback (if any) is repeated forever, then the first matching prefix
/// fallback. URLs with nothing left answer with a network error.
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<Script>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue responses for `url`
    pub fn route<I, R>(self, url: &str, responses: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ScriptedResponse>,
    {
        self.push(url, responses);
        self
    }

    /// Answer `url` with `response` whenever its queue is empty
    pub fn always(self, url: &str, response: impl Into<ScriptedResponse>) -> Self {
        self.lock()
            .fallback
            .insert(url.to_string(), response.into());
        self
    }

    /// Answer every URL starting with `prefix` that has no exact script
    ///
    /// Useful when the query string depends on the current time.
    pub fn always_prefix(self, prefix: &str, response: impl Into<ScriptedResponse>) -> Self {
        self.lock()
            .prefixed
            .push((prefix.to_string(), response.into()));
        self
    }

    /// Queue more responses on an existing client
    pub fn push<I, R>(&self, url: &str, responses: I)
    where
        I: IntoIterator<Item = R>,
        R: Into<ScriptedResponse>,
    {
        self.lock()
            .queued
            .entry(url.to_string())
            .or_default()
            .extend(responses.into_iter().map(Into::into));
    }

    /// Every URL requested so far, in request order
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    /// Number of requests made to `url`
    pub fn request_count(&self, url: &str) -> usize {
        self.lock().requests.iter().filter(|r| r.as_str() == url).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(&self, url: &str) -> ScriptedResponse {
        let mut script = self.lock();
        script.requests.push(url.to_string());

        if let Some(next) = script.queued.get_mut(url).and_then(VecDeque::pop_front) {
            return next;
        }

        if let Some(fallback) = script.fallback.get(url) {
            return fallback.clone();
        }

        script
            .prefixed
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| {
                ScriptedResponse::immediate(Err(PollError::Network(format!(
                    "no scripted response for {}",
                    url
                ))))
            })
    }
}

#[async_trait]
impl MetricsClient for ScriptedClient {
    async fn get_json(&self, url: &str) -> PollResult<Value> {
        let next = self.next_response(url);
        if let Some(delay) = next.delay {
            tokio::time::sleep(delay).await;
        }
        next.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_queue_then_fallback() {
        let client = ScriptedClient::new()
            .route("http://m/a", [json!({"n": 1}), json!({"n": 2})])
            .always("http://m/a", json!({"n": 0}));

        assert_eq!(client.get_json("http://m/a").await.unwrap(), json!({"n": 1}));
        assert_eq!(client.get_json("http://m/a").await.unwrap(), json!({"n": 2}));
        assert_eq!(client.get_json("http://m/a").await.unwrap(), json!({"n": 0}));
        assert_eq!(client.get_json("http://m/a").await.unwrap(), json!({"n": 0}));
        assert_eq!(client.request_count("http://m/a"), 4);
    }

    #[tokio::test]
    async fn test_unknown_url_is_network_error() {
        let client = ScriptedClient::new();
        let err = client.get_json("http://m/missing").await.unwrap_err();
        assert!(matches!(err, PollError::Network(_)));
        assert_eq!(client.requests(), vec!["http://m/missing".to_string()]);
    }

    #[tokio::test]
    async fn test_prefix_fallback() {
        let client = ScriptedClient::new()
            .always("http://m/chart?start=1", json!("exact"))
            .always_prefix("http://m/chart?", json!("prefix"));

        assert_eq!(client.get_json("http://m/chart?start=1").await.unwrap(), json!("exact"));
        assert_eq!(client.get_json("http://m/chart?start=2").await.unwrap(), json!("prefix"));
        assert!(client.get_json("http://m/other").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_response() {
        let client = ScriptedClient::new().route(
            "http://m/slow",
            [ScriptedResponse::with_delay(Ok(json!(1)), Duration::from_secs(3))],
        );

        let started = tokio::time::Instant::now();
        client.get_json("http://m/slow").await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(3));
    }
}
