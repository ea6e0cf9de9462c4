//! Metrics API clients
//!
//! Pollers never talk to `reqwest` directly; they receive an
//! `Arc<dyn MetricsClient>` so tests can script responses.
//!
//! - [`HttpMetricsClient`]: the real client
//! - [`fake::ScriptedClient`]: canned responses with optional delays

mod http;
pub mod fake;

pub use http::{ClientConfig, HttpMetricsClient};

use async_trait::async_trait;
use serde_json::Value;

use crate::poller::PollResult;

/// Fetches JSON documents from the metrics service
#[async_trait]
pub trait MetricsClient: Send + Sync {
    /// GET `url` and decode the body as JSON
    ///
    /// Non-2xx statuses, transport failures and timeouts map to the
    /// network variants of `PollError`; an undecodable body is a parse error.
    async fn get_json(&self, url: &str) -> PollResult<Value>;
}
