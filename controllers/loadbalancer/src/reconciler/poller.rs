//! Convergence polling.
//!
//! Every remote call made while converging goes through [`SyncContext`], so a
//! fired cancellation token aborts it, and every asynchronous mutation is
//! followed by [`wait_for_state`] before the next one is issued.

use crate::error::ReconcileError;
use ah_client::{states, AhError, LoadBalancersApi};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default delay between two state fetches
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default bound on one convergence poll
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);

/// Interval and timeout of convergence polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT)
    }
}

/// Run `call` unless `cancel` fires first.
pub async fn cancellable<T, F>(cancel: &CancellationToken, call: F) -> Result<T, ReconcileError>
where
    F: Future<Output = Result<T, AhError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ReconcileError::Cancelled),
        result = call => result.map_err(ReconcileError::Remote),
    }
}

/// Fetch the state of `what` until it equals `target`.
///
/// The first fetch is immediate, later ones are `config.interval` apart.
/// When `target` is [`states::DELETED`] a not-found answer counts as reached.
/// Any other fetch error ends the poll and is returned as is.
pub async fn wait_for_state<F, Fut>(
    cancel: &CancellationToken,
    config: &PollConfig,
    what: &str,
    target: &str,
    mut fetch: F,
) -> Result<(), ReconcileError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, AhError>>,
{
    let deadline = Instant::now() + config.timeout;
    let mut last_state = String::from("unknown");

    let timed_out = |last_state: String| ReconcileError::PollTimeout {
        what: what.to_string(),
        target: target.to_string(),
        last_state,
        timeout: config.timeout,
    };

    loop {
        let observed = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ReconcileError::Cancelled),
            () = sleep_until(deadline) => return Err(timed_out(last_state)),
            result = fetch() => result,
        };

        match observed {
            Ok(state) if state == target => {
                debug!("{} reached {}", what, target);
                return Ok(());
            }
            Ok(state) => {
                debug!("{} is {}, waiting for {}", what, state, target);
                last_state = state;
            }
            Err(e) if e.is_not_found() && target == states::DELETED => {
                debug!("{} is gone", what);
                return Ok(());
            }
            Err(e) => return Err(ReconcileError::Remote(e)),
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ReconcileError::Cancelled),
            () = sleep_until(deadline) => return Err(timed_out(last_state)),
            () = sleep(config.interval) => {}
        }
    }
}

/// Borrowed view of everything one reconciliation needs to talk to the API.
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    pub api: &'a dyn LoadBalancersApi,
    pub poll: &'a PollConfig,
    pub cancel: &'a CancellationToken,
}

impl<'a> SyncContext<'a> {
    pub fn new(api: &'a dyn LoadBalancersApi, poll: &'a PollConfig, cancel: &'a CancellationToken) -> Self {
        Self { api, poll, cancel }
    }

    /// Issue one remote call, aborting on cancellation.
    pub async fn call<T, F>(&self, call: F) -> Result<T, ReconcileError>
    where
        F: Future<Output = Result<T, AhError>>,
    {
        cancellable(self.cancel, call).await
    }

    /// [`wait_for_state`] with this context's token and poll settings.
    pub async fn wait_for<F, Fut>(&self, what: &str, target: &str, fetch: F) -> Result<(), ReconcileError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String, AhError>>,
    {
        wait_for_state(self.cancel, self.poll, what, target, fetch).await
    }
}
