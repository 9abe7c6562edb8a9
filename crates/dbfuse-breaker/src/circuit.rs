use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::config::BreakerConfig;
use crate::error::FailureKind;
use crate::events::BreakerEvent;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[repr(u8)]
pub enum CircuitState {
    /// Normal operation; calls are admitted.
    Closed = 0,
    /// The circuit is tripped; calls are rejected without touching the
    /// underlying operation.
    Open = 1,
    /// A single trial call is probing whether the resource has recovered.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    #[cfg(feature = "metrics")]
    pub(crate) fn as_label(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

/// The most recent failure observed by a breaker, retained for diagnostics
/// until overwritten by the next failure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LastError {
    /// What class of failure occurred.
    pub kind: FailureKind,
    /// Rendered message of the failure cause.
    pub message: String,
}

/// Snapshot of a breaker's counters and state for observability.
///
/// Taking a snapshot has no side effects and is safe at any time, including
/// concurrently with in-flight calls.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BreakerMetrics {
    /// Current state of the circuit.
    pub state: CircuitState,
    /// Consecutive failures observed since the circuit last settled closed.
    pub failure_count: u32,
    /// Completed calls, admitted and recorded, since construction.
    pub total_requests: u64,
    /// Recorded failures since construction.
    pub total_failures: u64,
    /// Recorded successes since construction.
    pub total_successes: u64,
    /// How many times the circuit has tripped open.
    pub times_opened: u64,
    /// `total_failures / total_requests`, or 0.0 before any call completes.
    pub failure_rate: f64,
    /// Time since the breaker was constructed.
    pub uptime: Duration,
    /// Time since the circuit last opened, while open or half-open.
    pub open_for: Option<Duration>,
    /// Most recent recorded failure.
    pub last_error: Option<LastError>,
}

/// Outcome of an admission check.
pub(crate) enum Admission {
    /// The call may proceed. `trial` marks the single half-open probe.
    Permitted { trial: bool },
    /// The call must fail fast without invoking the operation.
    Rejected { retry_after: Duration },
}

/// Mutable core of a breaker. All access goes through the owning
/// [`CircuitBreaker`](crate::CircuitBreaker)'s lock; critical sections are
/// short and never span the wrapped operation.
pub(crate) struct CircuitCore {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    failure_count: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    trial_started_at: Option<Instant>,
    total_requests: u64,
    total_failures: u64,
    total_successes: u64,
    times_opened: u64,
    last_error: Option<LastError>,
    created_at: Instant,
}

impl CircuitCore {
    pub(crate) fn new(state_atomic: Arc<AtomicU8>) -> Self {
        Self {
            state: CircuitState::Closed,
            state_atomic,
            failure_count: 0,
            opened_at: None,
            trial_in_flight: false,
            trial_started_at: None,
            total_requests: 0,
            total_failures: 0,
            total_successes: 0,
            times_opened: 0,
            last_error: None,
            created_at: Instant::now(),
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn metrics(&self) -> BreakerMetrics {
        let failure_rate = if self.total_requests > 0 {
            self.total_failures as f64 / self.total_requests as f64
        } else {
            0.0
        };

        BreakerMetrics {
            state: self.state,
            failure_count: self.failure_count,
            total_requests: self.total_requests,
            total_failures: self.total_failures,
            total_successes: self.total_successes,
            times_opened: self.times_opened,
            failure_rate,
            uptime: self.created_at.elapsed(),
            open_for: match self.state {
                CircuitState::Closed => None,
                _ => self.opened_at.map(|at| at.elapsed()),
            },
            last_error: self.last_error.clone(),
        }
    }

    /// Decides whether a new call may proceed.
    ///
    /// An open circuit becomes eligible for a single half-open trial once
    /// the reset timeout has elapsed. The check happens here, on call
    /// arrival, never on a timer.
    pub(crate) fn try_acquire(&mut self, config: &BreakerConfig) -> Admission {
        match self.state {
            CircuitState::Closed => {
                self.emit_permitted(config);
                Admission::Permitted { trial: false }
            }
            CircuitState::Open => {
                let elapsed = self.opened_at.map(|at| at.elapsed()).unwrap_or_default();
                if elapsed >= config.reset_timeout {
                    self.transition_to(CircuitState::HalfOpen, config);
                    self.begin_trial();
                    self.emit_permitted(config);
                    Admission::Permitted { trial: true }
                } else {
                    self.emit_rejected(config);
                    Admission::Rejected {
                        retry_after: config.reset_timeout - elapsed,
                    }
                }
            }
            CircuitState::HalfOpen => {
                // A trial that never resolved (its future lost without the
                // drop guard running, e.g. a leaked task) would wedge the
                // circuit half-open; presume it abandoned after a full reset
                // timeout and admit a replacement probe.
                let stale = self
                    .trial_started_at
                    .map(|at| at.elapsed() >= config.reset_timeout)
                    .unwrap_or(true);
                if !self.trial_in_flight || stale {
                    self.begin_trial();
                    self.emit_permitted(config);
                    Admission::Permitted { trial: true }
                } else {
                    self.emit_rejected(config);
                    Admission::Rejected {
                        retry_after: Duration::ZERO,
                    }
                }
            }
        }
    }

    pub(crate) fn record_success(&mut self, config: &BreakerConfig, was_trial: bool) {
        self.total_requests += 1;
        self.total_successes += 1;

        config.event_listeners.emit(&BreakerEvent::SuccessRecorded {
            name: config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
        });

        #[cfg(feature = "metrics")]
        counter!(
            "dbfuse_breaker_calls_total",
            "channel" => config.name.clone(),
            "outcome" => "success"
        )
        .increment(1);

        if was_trial && self.state == CircuitState::HalfOpen {
            self.end_trial();
            self.transition_to(CircuitState::Closed, config);
        } else if self.state == CircuitState::Closed {
            self.failure_count = 0;
        }
        // A success landing after the circuit already opened is bookkeeping
        // only; it does not perturb the open window or the trial.
    }

    pub(crate) fn record_failure(
        &mut self,
        config: &BreakerConfig,
        was_trial: bool,
        kind: FailureKind,
        message: String,
    ) {
        self.total_requests += 1;
        self.total_failures += 1;
        self.last_error = Some(LastError { kind, message });

        config.event_listeners.emit(&BreakerEvent::FailureRecorded {
            name: config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
            kind,
        });

        #[cfg(feature = "metrics")]
        counter!(
            "dbfuse_breaker_calls_total",
            "channel" => config.name.clone(),
            "outcome" => "failure"
        )
        .increment(1);

        if was_trial && self.state == CircuitState::HalfOpen {
            // Trial failed: re-open and re-arm the full reset timeout.
            self.end_trial();
            self.transition_to(CircuitState::Open, config);
        } else if self.state == CircuitState::Closed {
            self.failure_count += 1;
            if self.failure_count >= config.failure_threshold {
                self.transition_to(CircuitState::Open, config);
            }
        }
        // A failure landing while already open counts toward totals only.
    }

    /// The admitted trial was dropped before an outcome was recorded.
    /// Cancellation of the caller's interest does not cancel the breaker's
    /// bookkeeping: the probe is treated as lost and the circuit re-opens.
    pub(crate) fn abandon_trial(&mut self, config: &BreakerConfig) {
        if self.state == CircuitState::HalfOpen && self.trial_in_flight {
            self.end_trial();
            self.transition_to(CircuitState::Open, config);
        }
    }

    pub(crate) fn force_open(&mut self, config: &BreakerConfig) {
        self.transition_to(CircuitState::Open, config);
    }

    pub(crate) fn force_closed(&mut self, config: &BreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
    }

    /// Returns the circuit to a pristine closed state. The monotonic totals
    /// are kept; only the trip bookkeeping and diagnostics are cleared.
    pub(crate) fn reset(&mut self, config: &BreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
        self.failure_count = 0;
        self.last_error = None;
    }

    fn begin_trial(&mut self) {
        self.trial_in_flight = true;
        self.trial_started_at = Some(Instant::now());
    }

    fn end_trial(&mut self) {
        self.trial_in_flight = false;
        self.trial_started_at = None;
    }

    fn emit_permitted(&self, config: &BreakerConfig) {
        config.event_listeners.emit(&BreakerEvent::CallPermitted {
            name: config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
        });
    }

    fn emit_rejected(&self, config: &BreakerConfig) {
        config.event_listeners.emit(&BreakerEvent::CallRejected {
            name: config.name.clone(),
            timestamp: Instant::now(),
        });

        #[cfg(feature = "metrics")]
        counter!(
            "dbfuse_breaker_calls_total",
            "channel" => config.name.clone(),
            "outcome" => "rejected"
        )
        .increment(1);
    }

    fn transition_to(&mut self, to: CircuitState, config: &BreakerConfig) {
        if self.state == to {
            return;
        }

        let from = self.state;

        config.event_listeners.emit(&BreakerEvent::StateTransition {
            name: config.name.clone(),
            timestamp: Instant::now(),
            from,
            to,
        });

        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %config.name, from = ?from, to = ?to, "circuit state transition");

        #[cfg(feature = "metrics")]
        {
            counter!(
                "dbfuse_breaker_transitions_total",
                "channel" => config.name.clone(),
                "from" => from.as_label(),
                "to" => to.as_label()
            )
            .increment(1);

            gauge!(
                "dbfuse_breaker_state",
                "channel" => config.name.clone(),
                "state" => to.as_label()
            )
            .set(1.0);
        }

        self.state = to;
        self.state_atomic.store(to as u8, Ordering::Release);

        match to {
            CircuitState::Open => {
                self.opened_at = Some(Instant::now());
                self.times_opened += 1;
                self.end_trial();
            }
            CircuitState::Closed => {
                self.opened_at = None;
                self.failure_count = 0;
                self.end_trial();
            }
            // Entering half-open keeps opened_at: metrics still report when
            // the circuit tripped until it settles closed.
            CircuitState::HalfOpen => {}
        }
    }
}
