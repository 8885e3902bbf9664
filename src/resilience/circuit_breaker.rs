//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: testing if dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold
//! Open → Half-Open: on the first call after the open timeout
//! Half-Open → Closed: probe call succeeds
//! Half-Open → Open: probe call fails
//! ```
//!
//! # Design Decisions
//! - One breaker per protected dependency, shared via Arc
//! - Fail fast in Open state (no waiting for timeout)
//! - Single probe in Half-Open (prevents hammering recovering dependency)
//! - Transitions serialized behind a mutex that is never held across an await
//! - Only errors whose `FailureClass` says so are counted

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies errors into dependency-health signals and everything else.
pub trait FailureClass {
    /// True if this error should count towards opening the circuit.
    fn counts_as_failure(&self) -> bool {
        true
    }
}

/// Error returned by [`CircuitBreaker::call`].
#[derive(Debug, PartialEq)]
pub enum BreakerError<E> {
    /// Rejected without invoking the operation.
    Open,
    /// The operation ran and failed.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for BreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerError::Open => write!(f, "circuit breaker is open"),
            BreakerError::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for BreakerError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BreakerError::Open => None,
            BreakerError::Inner(e) => Some(e),
        }
    }
}

/// Point-in-time view of the breaker, for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub open_timeout_secs: u64,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    probe_in_flight: bool,
}

/// Three-state circuit breaker wrapping async operations.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    open_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, failure_threshold: u32, open_timeout: Duration) -> Self {
        let name = name.into();
        metrics::record_breaker_state(&name, CircuitState::Closed);
        Self {
            name,
            failure_threshold: failure_threshold.max(1),
            open_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                probe_in_flight: false,
            }),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &CircuitBreakerConfig) -> Self {
        Self::new(name, config.failure_threshold, config.open_timeout())
    }

    /// Run `operation` under the breaker.
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: FailureClass + fmt::Display,
    {
        let probe = self.admit().ok_or(BreakerError::Open)?;
        let guard = ProbeGuard {
            breaker: self,
            active: probe,
        };

        let result = operation().await;
        match &result {
            Ok(_) => self.on_success(),
            Err(e) if e.counts_as_failure() => self.on_failure(e),
            Err(e) => {
                tracing::debug!(breaker = %self.name, error = %e, "Error ignored by circuit breaker");
            }
        }
        drop(guard);

        result.map_err(BreakerError::Inner)
    }

    /// Current state. Pure read: an expired Open state is reported as Open
    /// until a call moves it to Half-Open.
    pub fn get_state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            failure_threshold: self.failure_threshold,
            open_timeout_secs: self.open_timeout.as_secs(),
        }
    }

    /// Force Closed with a zero failure count.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.probe_in_flight = false;
        drop(inner);
        tracing::info!(breaker = %self.name, "Circuit breaker manually reset");
        metrics::record_breaker_state(&self.name, CircuitState::Closed);
    }

    /// Decide whether a call may proceed. `Some(true)` marks the half-open probe.
    fn admit(&self) -> Option<bool> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Some(false),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed < self.open_timeout {
                    drop(inner);
                    self.reject();
                    return None;
                }
                inner.state = CircuitState::HalfOpen;
                inner.probe_in_flight = true;
                drop(inner);
                tracing::info!(breaker = %self.name, "Circuit breaker transitioning to HALF_OPEN");
                metrics::record_breaker_state(&self.name, CircuitState::HalfOpen);
                Some(true)
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    drop(inner);
                    self.reject();
                    return None;
                }
                inner.probe_in_flight = true;
                Some(true)
            }
        }
    }

    fn reject(&self) {
        tracing::warn!(breaker = %self.name, "Circuit breaker is OPEN, skipping call");
        metrics::record_breaker_rejection(&self.name);
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        let previous = inner.state;
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        drop(inner);

        if previous != CircuitState::Closed {
            tracing::info!(breaker = %self.name, from = %previous, "Circuit breaker reset to CLOSED");
            metrics::record_breaker_state(&self.name, CircuitState::Closed);
        }
    }

    fn on_failure(&self, error: &dyn fmt::Display) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(Instant::now());

        let count = inner.failure_count;
        let opened = match inner.state {
            CircuitState::HalfOpen => true,
            _ => count >= self.failure_threshold,
        };
        let previous = inner.state;
        if opened {
            inner.state = CircuitState::Open;
        }
        drop(inner);

        tracing::debug!(
            breaker = %self.name,
            failures = count,
            threshold = self.failure_threshold,
            error = %error,
            "Circuit breaker recorded failure"
        );
        if opened && previous != CircuitState::Open {
            tracing::warn!(breaker = %self.name, from = %previous, "Circuit breaker state set to OPEN");
            metrics::record_breaker_state(&self.name, CircuitState::Open);
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the half-open probe slot, including when the call is cancelled.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    active: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            self.breaker.lock().probe_in_flight = false;
        }
    }
}
