//! Circuit breaker for guarded data access.
//!
//! A circuit breaker prevents cascading failures by tracking the outcomes of
//! calls to a fragile resource and temporarily rejecting new calls after
//! repeated failures.
//!
//! ## States
//! - **Closed**: normal operation, calls are admitted
//! - **Open**: circuit is tripped, calls fail fast without touching the
//!   resource
//! - **Half-Open**: a single trial call probes whether the resource has
//!   recovered
//!
//! Recovery is evaluated lazily: an open circuit is re-examined when the
//! next call arrives, never by a background timer. Given a clock and a call
//! sequence the breaker is fully deterministic.
//!
//! ## Usage
//!
//! ```rust
//! use dbfuse_breaker::{BreakerConfig, CircuitBreaker};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::new(
//!     BreakerConfig::builder()
//!         .failure_threshold(3)
//!         .reset_timeout(Duration::from_secs(5))
//!         .name("read")
//!         .build(),
//! );
//!
//! let result = breaker
//!     .execute(|| async { Ok::<_, std::io::Error>("rows") })
//!     .await;
//! # let _ = result;
//! # }
//! ```
//!
//! ## Error handling
//!
//! ```rust
//! use dbfuse_breaker::{BreakerConfig, BreakerError, CircuitBreaker};
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::new(BreakerConfig::builder().build());
//!
//! match breaker.execute(|| async { Ok::<_, std::io::Error>(()) }).await {
//!     Ok(_) => {}
//!     Err(BreakerError::CircuitOpen { retry_after, .. }) => {
//!         eprintln!("degraded, retry in {retry_after:?}");
//!     }
//!     Err(BreakerError::Timeout { elapsed }) => {
//!         eprintln!("gave up after {elapsed:?}");
//!     }
//!     Err(BreakerError::Operation(e)) => {
//!         eprintln!("database error: {e}");
//!     }
//! }
//! # }
//! ```
//!
//! ## Two-channel registry
//!
//! Read and write traffic carry different risk profiles; the
//! [`BreakerRegistry`] holds one independently configured breaker per
//! [`Channel`] so a burst of write failures never blocks reads.
//!
//! ## Feature flags
//! - `metrics`: call/transition counters and a state gauge via the
//!   `metrics` crate
//! - `tracing`: admission and transition logging via the `tracing` crate
//! - `serde`: `Serialize` for state and metric snapshots

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;

use crate::circuit::{Admission, CircuitCore};

pub use circuit::{BreakerMetrics, CircuitState, LastError};
pub use config::{BreakerConfig, BreakerConfigBuilder};
pub use error::{BreakerError, FailureKind};
pub use events::{BreakerEvent, EventListener, EventListeners, FnListener};
pub use registry::{BreakerRegistry, Channel, RegistryMetrics};

mod circuit;
mod config;
mod error;
mod events;
mod registry;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Internal classification of a completed call that did not succeed.
enum Failure<E> {
    Timeout(Duration),
    Operation(E),
}

/// A circuit breaker guarding calls to a single fragile resource.
///
/// Cloning shares state: all clones observe and drive the same circuit.
/// State transitions are serialized by an internal lock held only for the
/// admission check and the outcome recording, never across the wrapped
/// operation, so unrelated in-flight calls do not contend.
pub struct CircuitBreaker {
    core: Arc<Mutex<CircuitCore>>,
    state_atomic: Arc<AtomicU8>,
    config: Arc<BreakerConfig>,
}

impl CircuitBreaker {
    /// Creates a new breaker in the closed state.
    pub fn new(config: BreakerConfig) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "dbfuse_breaker_calls_total",
                "Completed or rejected calls, labeled by channel and outcome"
            );
            describe_counter!(
                "dbfuse_breaker_transitions_total",
                "Circuit state transitions, labeled by channel"
            );
            describe_gauge!("dbfuse_breaker_state", "Current circuit state per channel");
        });

        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            core: Arc::new(Mutex::new(CircuitCore::new(Arc::clone(&state_atomic)))),
            state_atomic,
            config: Arc::new(config),
        }
    }

    /// The breaker's configured name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Executes `op` under the breaker's protection.
    ///
    /// When the circuit is open and the reset timeout has not elapsed, the
    /// call fails fast with [`BreakerError::CircuitOpen`] and `op` is never
    /// invoked. Otherwise `op` runs (under the configured deadline, if any)
    /// and its outcome is recorded before the result is returned. Failures
    /// are re-raised, never swallowed.
    ///
    /// While half-open, exactly one in-flight trial is admitted; concurrent
    /// callers fail fast until the trial resolves. A trial whose future is
    /// dropped before completion counts as a failed probe and re-opens the
    /// circuit.
    ///
    /// Outcomes are applied in completion order, not issue order: a call
    /// admitted while closed that completes after the circuit opened only
    /// updates the monotonic totals.
    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let admission = self.lock_core().try_acquire(&self.config);
        let trial = match admission {
            Admission::Rejected { retry_after } => {
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    breaker = %self.config.name,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "call rejected, circuit open"
                );
                return Err(BreakerError::CircuitOpen {
                    name: self.config.name.clone(),
                    retry_after,
                });
            }
            Admission::Permitted { trial } => trial,
        };

        let mut guard = TrialGuard::new(trial, Arc::clone(&self.core), Arc::clone(&self.config));

        let outcome: Result<T, Failure<E>> = match self.config.operation_timeout {
            Some(limit) => match tokio::time::timeout(limit, op()).await {
                Ok(result) => result.map_err(Failure::Operation),
                Err(_) => Err(Failure::Timeout(limit)),
            },
            None => op().await.map_err(Failure::Operation),
        };

        guard.disarm();

        let mut core = self.lock_core();
        match outcome {
            Ok(value) => {
                core.record_success(&self.config, trial);
                Ok(value)
            }
            Err(Failure::Timeout(elapsed)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    breaker = %self.config.name,
                    timeout_ms = elapsed.as_millis() as u64,
                    "operation timed out"
                );
                core.record_failure(
                    &self.config,
                    trial,
                    FailureKind::Timeout,
                    format!("timed out after {elapsed:?}"),
                );
                Err(BreakerError::Timeout { elapsed })
            }
            Err(Failure::Operation(err)) => {
                core.record_failure(&self.config, trial, FailureKind::Operation, err.to_string());
                Err(BreakerError::Operation(err))
            }
        }
    }

    /// Returns a snapshot of the breaker's counters and state.
    ///
    /// Idempotent and side-effect-free; safe to call concurrently with
    /// [`execute`](Self::execute).
    pub fn metrics(&self) -> BreakerMetrics {
        self.lock_core().metrics()
    }

    /// Returns the current state, serialized with in-flight transitions.
    pub fn state(&self) -> CircuitState {
        self.lock_core().state()
    }

    /// Returns the current state without taking the lock.
    ///
    /// Safe from any context (metrics collection, health checks); may lag a
    /// transition that is being applied concurrently.
    pub fn state_sync(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    /// Returns whether the circuit is currently open.
    pub fn is_open(&self) -> bool {
        self.state_sync() == CircuitState::Open
    }

    /// Returns "healthy" when closed, "degraded" when half-open,
    /// "unhealthy" when open.
    pub fn health_status(&self) -> &'static str {
        match self.state_sync() {
            CircuitState::Closed => "healthy",
            CircuitState::HalfOpen => "degraded",
            CircuitState::Open => "unhealthy",
        }
    }

    /// Returns an HTTP status code for health endpoints: 503 while open,
    /// 200 otherwise.
    pub fn http_status(&self) -> u16 {
        match self.state_sync() {
            CircuitState::Open => 503,
            _ => 200,
        }
    }

    /// Forces the circuit open.
    pub fn force_open(&self) {
        self.lock_core().force_open(&self.config);
    }

    /// Forces the circuit closed.
    pub fn force_closed(&self) {
        self.lock_core().force_closed(&self.config);
    }

    /// Returns the circuit to a pristine closed state, clearing the
    /// consecutive-failure count and the retained last error. The monotonic
    /// totals are kept.
    pub fn reset(&self) {
        self.lock_core().reset(&self.config);
    }

    fn lock_core(&self) -> MutexGuard<'_, CircuitCore> {
        self.core
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clone for CircuitBreaker {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            state_atomic: Arc::clone(&self.state_atomic),
            config: Arc::clone(&self.config),
        }
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.config.name)
            .field("state", &self.state_sync())
            .finish()
    }
}

/// Re-opens the circuit if an admitted half-open trial is dropped before
/// its outcome is recorded.
struct TrialGuard {
    armed: bool,
    core: Arc<Mutex<CircuitCore>>,
    config: Arc<BreakerConfig>,
}

impl TrialGuard {
    fn new(trial: bool, core: Arc<Mutex<CircuitCore>>, config: Arc<BreakerConfig>) -> Self {
        Self {
            armed: trial,
            core,
            config,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TrialGuard {
    fn drop(&mut self) {
        if self.armed {
            let mut core = self
                .core
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            core.abandon_trial(&self.config);
        }
    }
}
