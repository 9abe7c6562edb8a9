use std::time::Duration;

use crate::circuit::CircuitState;
use crate::events::{BreakerEvent, EventListeners, FnListener};

/// Configuration for a single circuit breaker instance.
///
/// Read once at construction; a breaker's configuration is never
/// hot-reloaded.
pub struct BreakerConfig {
    pub(crate) failure_threshold: u32,
    pub(crate) reset_timeout: Duration,
    pub(crate) operation_timeout: Option<Duration>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners,
}

impl BreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BreakerConfigBuilder {
        BreakerConfigBuilder::new()
    }

    /// Profile for read traffic: trips quickly and probes recovery after a
    /// short cooldown, since a failing read path should fail fast without
    /// holding requests hostage.
    pub fn read_profile() -> BreakerConfigBuilder {
        Self::builder()
            .failure_threshold(3)
            .reset_timeout(Duration::from_secs(3))
            .name("read")
    }

    /// Profile for write traffic: tolerates more consecutive failures but
    /// stays open longer once tripped, reflecting writes' higher blast
    /// radius.
    pub fn write_profile() -> BreakerConfigBuilder {
        Self::builder()
            .failure_threshold(5)
            .reset_timeout(Duration::from_secs(10))
            .name("write")
    }

    /// Applies a per-call deadline after construction. Used by wrappers that
    /// layer one global timeout over independently configured channels.
    pub fn set_operation_timeout(&mut self, limit: Option<Duration>) {
        self.operation_timeout = limit;
    }

    /// The configured name of this breaker.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`BreakerConfig`].
pub struct BreakerConfigBuilder {
    failure_threshold: u32,
    reset_timeout: Duration,
    operation_timeout: Option<Duration>,
    name: String,
    event_listeners: EventListeners,
}

impl BreakerConfigBuilder {
    /// Creates a builder with default values.
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(10),
            operation_timeout: None,
            name: String::from("<unnamed>"),
            event_listeners: EventListeners::new(),
        }
    }

    /// Consecutive failures while closed that trip the circuit.
    ///
    /// Must be at least 1. Default: 5
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// How long the circuit stays open before the next call is admitted as
    /// a half-open trial.
    ///
    /// Default: 10 seconds
    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Per-call deadline applied in front of the wrapped operation. A call
    /// that does not settle within this duration is recorded as a failure
    /// and surfaces as a timeout error.
    ///
    /// Default: no deadline
    pub fn operation_timeout(mut self, limit: Duration) -> Self {
        self.operation_timeout = Some(limit);
        self
    }

    /// Give this breaker a human-readable name for errors, events, logs,
    /// and metric labels.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked whenever the circuit transitions
    /// between states, with the state transitioned from and to.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BreakerEvent| {
                if let BreakerEvent::StateTransition { from, to, .. } = event {
                    f(*from, *to);
                }
            }));
        self
    }

    /// Registers a callback invoked when a call is admitted, with the state
    /// the circuit was in at admission.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BreakerEvent| {
                if let BreakerEvent::CallPermitted { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback invoked when a call is rejected without
    /// reaching the underlying operation.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BreakerEvent| {
                if matches!(event, BreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback invoked when a successful outcome is recorded.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BreakerEvent| {
                if let BreakerEvent::SuccessRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback invoked when a failed outcome is recorded.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BreakerEvent| {
                if let BreakerEvent::FailureRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Builds the configuration.
    ///
    /// # Panics
    ///
    /// Panics if `failure_threshold` is 0.
    pub fn build(self) -> BreakerConfig {
        assert!(
            self.failure_threshold >= 1,
            "failure_threshold must be at least 1"
        );

        BreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: self.reset_timeout,
            operation_timeout: self.operation_timeout,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for BreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
