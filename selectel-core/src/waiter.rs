//! Waiter - Poll an object until it settles into a target state
//!
//! Most vendor mutations are asynchronous: the API accepts the request and
//! the object goes through a few transitional states before it is usable
//! (or gone). [`wait_for_state`] turns a single "read current state" call
//! into a bounded wait:
//!
//! - a state in `target` ends the wait successfully,
//! - a state in `pending` keeps polling,
//! - anything else ends the wait with [`WaitError::UnexpectedState`].
//!
//! Refresh errors are returned as-is. Transient transport failures should be
//! retried beneath the refresh closure (see [`crate::retry`]), not here.
//!
//! The waiter holds no locks. Callers that need at-most-one operation per
//! object lock around the wait with [`crate::mutex_kv::MutexKv`].

use std::cmp;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use log::{debug, trace};
use thiserror::Error;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::provider::DEFAULT_OPERATION_TIMEOUT;

/// Default pause between the first polls
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(3);

/// Upper bound for the growing pause between polls
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(10);

/// Shortest pause between polls, whatever `min_interval` says
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Stand-in deadline for timeouts too large to add to an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Describes one wait: which states to accept and how long to try
#[derive(Debug, Clone)]
pub struct StateChangeConf<S> {
    pub pending: Vec<S>,
    pub target: Vec<S>,
    /// Total time budget, initial delay included
    pub timeout: Duration,
    /// Grace period before the first poll
    pub delay: Duration,
    /// First pause between polls, and the floor for every later one.
    /// Values below [`MIN_POLL_INTERVAL`] are raised to it.
    pub min_interval: Duration,
    /// Pauses double after every pending poll up to this bound
    pub max_interval: Duration,
}

impl<S> StateChangeConf<S> {
    pub fn new(pending: impl IntoIterator<Item = S>, target: impl IntoIterator<Item = S>) -> Self {
        Self {
            pending: pending.into_iter().collect(),
            target: target.into_iter().collect(),
            timeout: DEFAULT_OPERATION_TIMEOUT,
            delay: Duration::ZERO,
            min_interval: DEFAULT_MIN_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPhase {
    Succeeded,
    UnexpectedState,
    RefreshFailed,
    TimedOut,
    Cancelled,
}

/// Errors returned by [`wait_for_state`]
#[derive(Debug, Error)]
pub enum WaitError<E> {
    /// The refresh function failed
    #[error("error refreshing state: {0}")]
    Refresh(#[source] E),

    /// The object entered a state that is neither pending nor target
    #[error("unexpected state '{state}', wanted target '{}'", .expected.join(", "))]
    UnexpectedState { state: String, expected: Vec<String> },

    /// The target was not reached within the timeout
    #[error(
        "timeout while waiting for state to become '{}' (last state: '{}', timeout: {timeout:?})",
        .target.join(", "),
        .last_state.as_deref().unwrap_or("none")
    )]
    Timeout {
        target: Vec<String>,
        last_state: Option<String>,
        timeout: Duration,
        elapsed: Duration,
    },

    /// The caller aborted the wait
    #[error("wait cancelled")]
    Cancelled,
}

impl<E> WaitError<E> {
    pub fn phase(&self) -> WaitPhase {
        match self {
            WaitError::Refresh(_) => WaitPhase::RefreshFailed,
            WaitError::UnexpectedState { .. } => WaitPhase::UnexpectedState,
            WaitError::Timeout { .. } => WaitPhase::TimedOut,
            WaitError::Cancelled => WaitPhase::Cancelled,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitError::Cancelled)
    }
}

/// Poll `refresh` until it reports a target state
///
/// Sleeps `conf.delay` first, then polls with a pause that starts at
/// `conf.min_interval` and doubles up to `conf.max_interval`. Gives up with
/// [`WaitError::Timeout`] once `conf.timeout` has elapsed since the call,
/// abandoning a refresh still in flight. `cancel` is honoured at every
/// suspension point.
pub async fn wait_for_state<S, E, F, Fut>(
    conf: &StateChangeConf<S>,
    cancel: &CancellationToken,
    mut refresh: F,
) -> Result<S, WaitError<E>>
where
    S: PartialEq + fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, E>>,
{
    let started = Instant::now();
    let deadline = started
        .checked_add(conf.timeout)
        .unwrap_or_else(|| started + FAR_FUTURE);
    let min_interval = cmp::max(conf.min_interval, MIN_POLL_INTERVAL);
    let max_interval = cmp::max(conf.max_interval, min_interval);

    debug!(
        "waiting for state to become {:?} (timeout: {:?})",
        labels(&conf.target),
        conf.timeout
    );

    if !conf.delay.is_zero() {
        let first_poll = started
            .checked_add(conf.delay)
            .map_or(deadline, |at| cmp::min(at, deadline));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WaitError::Cancelled),
            _ = sleep_until(first_poll) => {}
        }
    }

    let mut interval = min_interval;
    let mut last_state: Option<String> = None;
    let mut polls: u32 = 0;

    loop {
        if Instant::now() >= deadline {
            return Err(timed_out(conf, last_state, started));
        }

        polls += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WaitError::Cancelled),
            _ = sleep_until(deadline) => return Err(timed_out(conf, last_state, started)),
            result = refresh() => result,
        };
        let state = result.map_err(WaitError::Refresh)?;

        if conf.target.contains(&state) {
            debug!(
                "reached state '{}' after {} poll(s) in {:?}",
                state,
                polls,
                started.elapsed()
            );
            return Ok(state);
        }

        if !conf.pending.contains(&state) {
            return Err(WaitError::UnexpectedState {
                state: state.to_string(),
                expected: labels(&conf.target),
            });
        }

        trace!("poll {}: state '{}' is pending", polls, state);
        last_state = Some(state.to_string());

        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out(conf, last_state, started));
        }

        let pause = cmp::min(interval, deadline - now);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WaitError::Cancelled),
            _ = sleep(pause) => {}
        }
        interval = cmp::min(interval.saturating_mul(2), max_interval);
    }
}

fn labels<S: fmt::Display>(states: &[S]) -> Vec<String> {
    states.iter().map(ToString::to_string).collect()
}

fn timed_out<S: fmt::Display, E>(
    conf: &StateChangeConf<S>,
    last_state: Option<String>,
    started: Instant,
) -> WaitError<E> {
    WaitError::Timeout {
        target: labels(&conf.target),
        last_state,
        timeout: conf.timeout,
        elapsed: started.elapsed(),
    }
}
