//! Poller Engine
//!
//! Runs the fetch-parse-update cycle for one metric on a fixed interval.
//!
//! Each poller is one tokio task driving a `tokio::time::interval`. Every
//! tick is spawned into a `JoinSet` owned by that task, so a slow response
//! never delays the schedule, and aborting the task aborts whatever is
//! still in flight. State lives in a `StateTracker` behind a mutex that
//! also carries the stopped flag; `stop()` takes the same mutex, so no
//! completion can mutate state once `stop()` has returned.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};

use super::error::{PollError, PollResult, TickOutcome};
use super::state::StateTracker;
use super::types::{MetricSample, PollState, PollerConfig};
use crate::client::MetricsClient;

/// State shared between a handle, its scheduler and its in-flight ticks
struct Shared {
    config: PollerConfig,
    tracker: Mutex<StateTracker>,
    updates: watch::Sender<PollState>,
}

impl Shared {
    fn tracker(&self) -> MutexGuard<'_, StateTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a finished tick and publish the new snapshot if it changed
    fn complete(&self, seq: u64, result: PollResult<MetricSample>) -> TickOutcome {
        let mut tracker = self.tracker();
        let outcome = tracker.apply(seq, result);
        let name = &self.config.name;

        if outcome == TickOutcome::Cancelled {
            tracing::trace!(metric = %name, seq, "Tick completed after stop, ignored");
            return outcome;
        }

        match &outcome {
            TickOutcome::Applied { value } => {
                tracing::debug!(metric = %name, seq, value, "Metric updated");
            }
            TickOutcome::Discarded { value } => {
                tracing::trace!(metric = %name, seq, value, "Sample discarded");
            }
            TickOutcome::Failed { error } => {
                let errors = tracker.state().consecutive_error_count;
                if errors == self.config.error_threshold {
                    tracing::warn!(
                        metric = %name,
                        errors,
                        error = %error,
                        "Metric poll failing, error threshold reached"
                    );
                } else {
                    tracing::debug!(metric = %name, errors, error = %error, "Metric poll failed");
                }
            }
            TickOutcome::Cancelled => {}
        }

        let state = tracker.state();
        self.updates.send_if_modified(|current| {
            if current != state {
                *current = state.clone();
                true
            } else {
                false
            }
        });

        outcome
    }
}

/// Handle to a running poller
///
/// Dropping the handle stops the poller.
pub struct PollerHandle {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

/// Start polling the metric described by `config`
///
/// The first tick is issued immediately without waiting for it; later
/// ticks follow every `config.interval`. Must be called from within a
/// tokio runtime.
pub fn start(config: PollerConfig, client: Arc<dyn MetricsClient>) -> PollResult<PollerHandle> {
    config.validate()?;

    let tracker = StateTracker::new(&config);
    let (updates, _) = watch::channel(tracker.state().clone());

    tracing::info!(
        metric = %config.name,
        endpoint = %config.endpoint,
        interval_ms = config.interval.as_millis() as u64,
        kind = ?config.kind,
        "Starting metric poller"
    );

    let shared = Arc::new(Shared {
        config,
        tracker: Mutex::new(tracker),
        updates,
    });

    let task = tokio::spawn(run_schedule(Arc::clone(&shared), client));

    Ok(PollerHandle { shared, task })
}

impl PollerHandle {
    /// Metric name
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// The configuration this poller was started with
    pub fn config(&self) -> &PollerConfig {
        &self.shared.config
    }

    /// Stop polling
    ///
    /// Cancels future ticks and guarantees that ticks still in flight
    /// leave the state untouched. Calling it again has no effect.
    pub fn stop(&self) {
        let newly_stopped = self.shared.tracker().stop();
        self.task.abort();

        if newly_stopped {
            tracing::info!(metric = %self.shared.config.name, "Stopped metric poller");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.tracker().is_stopped()
    }

    /// Snapshot of the most recent completed tick
    pub fn current_state(&self) -> PollState {
        self.shared.updates.borrow().clone()
    }

    /// Receiver that is notified whenever the state changes
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.shared.updates.subscribe()
    }

    /// Whether the presentation layer should show an error for this metric
    pub fn is_error(&self) -> bool {
        self.current_state().is_error(self.shared.config.error_threshold)
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PollerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerHandle")
            .field("config", &self.shared.config)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

async fn run_schedule(shared: Arc<Shared>, client: Arc<dyn MetricsClient>) {
    let mut ticker = time::interval(shared.config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut in_flight = JoinSet::new();
    let mut seq: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                seq += 1;
                in_flight.spawn(run_tick(Arc::clone(&shared), Arc::clone(&client), seq));
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!(metric = %shared.config.name, "Metric tick panicked");
                    }
                }
            }
        }
    }
}

async fn run_tick(shared: Arc<Shared>, client: Arc<dyn MetricsClient>, seq: u64) {
    let config = &shared.config;

    let result = match time::timeout(config.request_timeout, client.get_json(&config.endpoint)).await
    {
        Ok(Ok(body)) => (config.parse)(&body),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(PollError::Timeout(config.request_timeout)),
    };

    shared.complete(seq, result);
}
