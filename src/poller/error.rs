//! Poller error types
//!
//! Network and parse failures are recovered inside the tick loop and only
//! show up as `PollState::consecutive_error_count`. Configuration errors
//! are returned from `start()`.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while polling a metric
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PollError {
    /// Request could not complete (connection refused, DNS, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Request did not finish within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Server answered with a non-2xx status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid poller configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Coarse classification of a `PollError`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Parse,
    Configuration,
}

impl PollError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PollError::Network(_) | PollError::Timeout(_) | PollError::Status { .. } => {
                ErrorKind::Network
            }
            PollError::Parse(_) => ErrorKind::Parse,
            PollError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        PollError::Parse(msg.into())
    }
}

impl From<serde_json::Error> for PollError {
    fn from(err: serde_json::Error) -> Self {
        PollError::Parse(err.to_string())
    }
}

/// What a completed tick did to the poller state
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The sample became the new `last_value`
    Applied { value: f64 },
    /// The sample was valid but not applied (unchanged value, regression on
    /// a monotonic metric, or older than an already applied sample)
    Discarded { value: f64 },
    /// The tick failed and the error count went up
    Failed { error: PollError },
    /// The poller was stopped before the tick completed
    Cancelled,
}

/// Result type alias for poller operations
pub type PollResult<T> = Result<T, PollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PollError::Status {
            status: 503,
            url: "https://example.org/m".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503 from https://example.org/m");

        let err = PollError::parse("missing field 'block_height'");
        assert_eq!(err.to_string(), "Parse error: missing field 'block_height'");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(PollError::Timeout(Duration::from_secs(1)).kind(), ErrorKind::Network);
        assert_eq!(PollError::Network("refused".into()).kind(), ErrorKind::Network);
        assert_eq!(PollError::parse("bad").kind(), ErrorKind::Parse);
        assert_eq!(
            PollError::Configuration("bad".into()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: PollError = json_err.into();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
