//! Event system for breaker observability.
//!
//! Every breaker emits events as it admits, rejects, and records calls.
//! Listeners are registered through the configuration builder and receive
//! events synchronously, under the breaker's internal lock. Listeners must
//! not call back into the breaker that emitted the event.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::circuit::CircuitState;
use crate::error::FailureKind;

/// An event emitted by a circuit breaker.
#[derive(Debug, Clone)]
pub enum BreakerEvent {
    /// The circuit moved from one state to another.
    StateTransition {
        name: String,
        timestamp: Instant,
        from: CircuitState,
        to: CircuitState,
    },
    /// A call was admitted to the underlying operation.
    CallPermitted {
        name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call was rejected without touching the underlying operation.
    CallRejected { name: String, timestamp: Instant },
    /// A successful outcome was recorded.
    SuccessRecorded {
        name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A failed outcome was recorded.
    FailureRecorded {
        name: String,
        timestamp: Instant,
        state: CircuitState,
        kind: FailureKind,
    },
}

impl BreakerEvent {
    /// Returns the event kind as a static label.
    pub fn event_type(&self) -> &'static str {
        match self {
            BreakerEvent::StateTransition { .. } => "state_transition",
            BreakerEvent::CallPermitted { .. } => "call_permitted",
            BreakerEvent::CallRejected { .. } => "call_rejected",
            BreakerEvent::SuccessRecorded { .. } => "success_recorded",
            BreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    /// Returns the name of the breaker that emitted this event.
    pub fn breaker_name(&self) -> &str {
        match self {
            BreakerEvent::StateTransition { name, .. }
            | BreakerEvent::CallPermitted { name, .. }
            | BreakerEvent::CallRejected { name, .. }
            | BreakerEvent::SuccessRecorded { name, .. }
            | BreakerEvent::FailureRecorded { name, .. } => name,
        }
    }

    /// Returns when the event occurred.
    pub fn timestamp(&self) -> Instant {
        match self {
            BreakerEvent::StateTransition { timestamp, .. }
            | BreakerEvent::CallPermitted { timestamp, .. }
            | BreakerEvent::CallRejected { timestamp, .. }
            | BreakerEvent::SuccessRecorded { timestamp, .. }
            | BreakerEvent::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }
}

/// Trait for listening to breaker events.
pub trait EventListener: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &BreakerEvent);
}

/// A collection of event listeners.
#[derive(Clone, Default)]
pub struct EventListeners {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl EventListeners {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Adds a listener to the collection.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to all registered listeners.
    ///
    /// A panicking listener is isolated so the remaining listeners still
    /// receive the event and the calling breaker is unaffected.
    pub fn emit(&self, event: &BreakerEvent) {
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// A function-backed event listener.
pub struct FnListener<F>
where
    F: Fn(&BreakerEvent) + Send + Sync,
{
    f: F,
}

impl<F> FnListener<F>
where
    F: Fn(&BreakerEvent) + Send + Sync,
{
    /// Creates a new function-backed listener.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventListener for FnListener<F>
where
    F: Fn(&BreakerEvent) + Send + Sync,
{
    fn on_event(&self, event: &BreakerEvent) {
        (self.f)(event)
    }
}
