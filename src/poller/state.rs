//! Tick application rules
//!
//! `StateTracker` owns a `PollState` and decides what each completed tick
//! does to it. It has no I/O and no clock, so the engine wraps it in a mutex
//! and tests drive it directly.

use std::time::Duration;

use super::error::{PollError, PollResult, TickOutcome};
use super::types::{BaselineEstimator, MetricKind, MetricSample, PollState, PollerConfig};

/// Applies tick results to a poller's state
#[derive(Debug, Clone)]
pub struct StateTracker {
    state: PollState,
    kind: MetricKind,
    baseline: Option<BaselineEstimator>,
    interval: Duration,
    /// Sequence number of the newest successful tick
    newest_success_seq: u64,
    stopped: bool,
}

impl StateTracker {
    pub fn new(config: &PollerConfig) -> Self {
        Self::with_policy(config.kind, config.baseline, config.interval)
    }

    pub fn with_policy(
        kind: MetricKind,
        baseline: Option<BaselineEstimator>,
        interval: Duration,
    ) -> Self {
        Self {
            state: PollState::new(),
            kind,
            baseline,
            interval,
            newest_success_seq: 0,
            stopped: false,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Freeze the state. Returns false if it was already stopped.
    pub fn stop(&mut self) -> bool {
        !std::mem::replace(&mut self.stopped, true)
    }

    /// Apply the result of tick `seq`
    pub fn apply(&mut self, seq: u64, result: PollResult<MetricSample>) -> TickOutcome {
        if self.stopped {
            return TickOutcome::Cancelled;
        }

        match result {
            Ok(sample) if sample.value.is_finite() => self.apply_sample(seq, sample),
            Ok(sample) => self.apply_failure(PollError::parse(format!(
                "non-finite value {}",
                sample.value
            ))),
            Err(error) => self.apply_failure(error),
        }
    }

    fn apply_sample(&mut self, seq: u64, sample: MetricSample) -> TickOutcome {
        let value = sample.value;

        // Gauges have no ordering of their own, so a late response from an
        // older tick must not overwrite a newer value. It still proves the
        // service is reachable.
        let stale = !self.kind.is_monotonic() && seq < self.newest_success_seq;

        let outcome = match self.state.last_value {
            _ if stale => TickOutcome::Discarded { value },
            None => {
                self.state.last_value = Some(value);
                self.state.previous_value =
                    self.baseline.map(|estimator| estimator.estimate(value, self.interval));
                self.state.last_sample_at = Some(sample.timestamp);
                TickOutcome::Applied { value }
            }
            Some(last) => {
                let accept = match self.kind {
                    MetricKind::Monotonic => value > last,
                    MetricKind::Gauge => value != last,
                };
                if accept {
                    self.state.previous_value = Some(last);
                    self.state.last_value = Some(value);
                    self.state.last_sample_at = Some(sample.timestamp);
                    TickOutcome::Applied { value }
                } else {
                    TickOutcome::Discarded { value }
                }
            }
        };

        self.newest_success_seq = self.newest_success_seq.max(seq);
        self.state.consecutive_error_count = 0;
        self.state.is_loading = false;
        self.state.last_error = None;

        outcome
    }

    fn apply_failure(&mut self, error: PollError) -> TickOutcome {
        self.state.consecutive_error_count = self.state.consecutive_error_count.saturating_add(1);
        self.state.is_loading = false;
        self.state.last_error = Some(error.to_string());
        TickOutcome::Failed { error }
    }
}
