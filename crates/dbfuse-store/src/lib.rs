//! Database access guarded by per-channel circuit breakers.
//!
//! This crate wraps an arbitrary asynchronous database driver behind a
//! [`GuardedClient`] that routes every call through one of two
//! independently configured circuit breakers, one for read traffic and one
//! for write traffic, so a burst of write failures never blocks reads and
//! vice versa.
//!
//! - [`read`](GuardedClient::read) / [`write`](GuardedClient::write) guard
//!   single statements on their channel's breaker
//! - [`batch`](GuardedClient::batch) guards a whole batch as one unit on
//!   the write breaker
//! - [`read_with_fallback`](GuardedClient::read_with_fallback) degrades
//!   gracefully when, and only when, the breaker rather than the database
//!   is the reason for failure
//! - [`health`](GuardedClient::health) rolls both channels up into a
//!   monitoring document
//!
//! The driver seam is the [`DatabaseClient`] trait; the wrapper borrows the
//! driver, never owns it, so multiple independently configured wrappers can
//! share one connection (or tests can hand each wrapper its own fake).
//!
//! ## Feature flags
//! - `serde`: `Serialize` for the health report and metric snapshots
//! - `tracing`: guarded-call logging via the `tracing` crate
//! - `metrics`: breaker counters and gauges via the `metrics` facade

pub use client::DatabaseClient;
pub use guard::{execute_with_fallback, GuardConfig, GuardedClient};
pub use health::{ChannelHealth, HealthReport, HealthStatus};
pub use statement::{SqlValue, Statement};

pub use dbfuse_breaker::{
    BreakerConfig, BreakerError, BreakerMetrics, BreakerRegistry, Channel, CircuitBreaker,
    CircuitState, FailureKind, RegistryMetrics,
};

mod client;
mod guard;
mod health;
mod statement;
