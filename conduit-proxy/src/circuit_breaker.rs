//! Per-route circuit breaker.

use crate::error::{ErrorKind, ProxyError};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls are rejected until the break duration elapses.
    Open,
    /// A single probe call decides whether to close or reopen.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive counted failures that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before admitting a probe.
    pub break_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            break_duration: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new(failure_threshold: u32, break_duration: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            break_duration,
        }
    }
}

/// Permission to make a call, returned by [`CircuitBreaker::try_acquire`].
///
/// Must be handed back through [`CircuitBreaker::record`] once the call ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Admission {
    /// Normal call through a closed circuit.
    Closed,
    /// The single half-open probe.
    Probe,
}

/// Point-in-time breaker statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerStats {
    pub state: CircuitState,
    /// Current consecutive failure count.
    pub consecutive_failures: u32,
    pub total_successes: u64,
    pub total_failures: u64,
    /// Calls rejected while open or while a probe was in flight.
    pub total_rejections: u64,
    /// Times the circuit has opened.
    pub times_opened: u64,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Circuit breaker for one route.
///
/// All transitions happen under one lock, so concurrent callers observe a
/// consistent state and at most one half-open probe is ever admitted.
#[derive(Debug)]
pub struct CircuitBreaker {
    route: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
    successes: AtomicU64,
    failures: AtomicU64,
    rejections: AtomicU64,
    opened: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(route: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            route: route.into(),
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            opened: AtomicU64::new(0),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state. An open circuit whose break duration has elapsed still
    /// reports `Open` until a caller claims the probe.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Ask to make a call.
    ///
    /// Fails with [`ProxyError::CircuitOpen`] while the circuit is open, or
    /// while it is half-open and another caller holds the probe. Rejections
    /// do not touch the failure counter.
    pub fn try_acquire(&self) -> Result<Admission, ProxyError> {
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => Ok(Admission::Closed),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.break_duration)
                    .unwrap_or(true);

                if elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    debug!(route = %self.route, "Circuit breaker half-open, admitting probe");
                    Ok(Admission::Probe)
                } else {
                    Err(self.reject())
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(self.reject())
                } else {
                    inner.probe_in_flight = true;
                    Ok(Admission::Probe)
                }
            }
        }
    }

    /// Like [`try_acquire`](Self::try_acquire), but the admission is held by
    /// a [`BreakerPermit`] that reports cancellation if it is dropped before
    /// [`BreakerPermit::complete`] runs.
    pub fn acquire(&self) -> Result<BreakerPermit<'_>, ProxyError> {
        let admission = self.try_acquire()?;
        Ok(BreakerPermit {
            breaker: self,
            admission: Some(admission),
        })
    }

    /// Report how an admitted call ended.
    ///
    /// `None` is success. Transient and non-transient failures count;
    /// business failures leave the counter alone (and let a probe close the
    /// circuit, since the route answered); cancellation is ignored apart from
    /// releasing the probe slot.
    pub fn record(&self, admission: Admission, outcome: Option<ErrorKind>) {
        let mut inner = self.inner.lock();

        match (admission, outcome) {
            (Admission::Probe, Some(ErrorKind::Cancelled)) => {
                inner.probe_in_flight = false;
            }
            (Admission::Closed, Some(ErrorKind::Cancelled)) => {}

            (Admission::Probe, None | Some(ErrorKind::Business)) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                info!(route = %self.route, "Circuit breaker closing");
                inner.state = CircuitState::Closed;
                inner.failures = 0;
                inner.opened_at = None;
                inner.probe_in_flight = false;
            }
            (Admission::Probe, Some(_)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(route = %self.route, "Probe failed, circuit breaker reopening");
                inner.probe_in_flight = false;
                self.open(&mut inner);
            }

            (Admission::Closed, None) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                if inner.state == CircuitState::Closed {
                    inner.failures = 0;
                }
            }
            (Admission::Closed, Some(ErrorKind::Business)) => {}
            (Admission::Closed, Some(_)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                // A call admitted while closed may finish after the circuit
                // opened; only a still-closed circuit counts it.
                if inner.state == CircuitState::Closed {
                    inner.failures += 1;
                    if inner.failures >= self.config.failure_threshold {
                        warn!(
                            route = %self.route,
                            failures = inner.failures,
                            "Circuit breaker opening"
                        );
                        self.open(&mut inner);
                    }
                }
            }
        }
    }

    /// Force the circuit closed and clear the failure counter.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    pub fn stats(&self) -> BreakerStats {
        let inner = self.inner.lock();
        BreakerStats {
            state: inner.state,
            consecutive_failures: inner.failures,
            total_successes: self.successes.load(Ordering::Relaxed),
            total_failures: self.failures.load(Ordering::Relaxed),
            total_rejections: self.rejections.load(Ordering::Relaxed),
            times_opened: self.opened.load(Ordering::Relaxed),
        }
    }

    fn open(&self, inner: &mut BreakerState) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        self.opened.fetch_add(1, Ordering::Relaxed);
    }

    fn reject(&self) -> ProxyError {
        self.rejections.fetch_add(1, Ordering::Relaxed);
        ProxyError::CircuitOpen {
            route: self.route.clone(),
        }
    }
}

/// An admission that must be reported back to its breaker.
///
/// Dropping it without calling [`complete`](Self::complete) records the call
/// as cancelled, which frees the half-open slot if this was the trial call.
#[derive(Debug)]
#[must_use]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    admission: Option<Admission>,
}

impl BreakerPermit<'_> {
    pub fn admission(&self) -> Option<Admission> {
        self.admission
    }

    pub fn complete(mut self, outcome: Option<ErrorKind>) {
        if let Some(admission) = self.admission.take() {
            self.breaker.record(admission, outcome);
        }
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if let Some(admission) = self.admission.take() {
            debug!(route = %self.breaker.route, "Admitted call dropped before completing");
            self.breaker.record(admission, Some(ErrorKind::Cancelled));
        }
    }
}
