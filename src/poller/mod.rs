//! Metric Poller
//!
//! A generic fetch-parse-update engine, instantiated once per displayed
//! metric.
//!
//! ## Architecture
//!
//! - **types**: `MetricSample`, `PollState`, `PollerConfig`
//! - **state**: `StateTracker`, the rules a completed tick follows
//! - **engine**: scheduling, request timeouts, cancellation
//!
//! ## Data Flow
//!
//! 1. The host calls [`start`] with a config and an injected client
//! 2. Every tick fetches the endpoint and parses a `MetricSample`
//! 3. `StateTracker` accepts, discards or counts the result as a failure
//! 4. The new `PollState` is published on a `watch` channel
//! 5. The host calls [`PollerHandle::stop`] (or drops the handle) on unmount

mod engine;
mod error;
mod state;
mod types;

pub use engine::{start, PollerHandle};
pub use error::{ErrorKind, PollError, PollResult, TickOutcome};
pub use state::StateTracker;
pub use types::{BaselineEstimator, MetricKind, MetricSample, ParseFn, PollState, PollerConfig};
