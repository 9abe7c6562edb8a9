//! Read-only health rollup over the breaker registry.

use dbfuse_breaker::{BreakerMetrics, BreakerRegistry, Channel, CircuitState};

/// Overall health derived from per-channel circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HealthStatus {
    /// Both circuits closed.
    Healthy,
    /// At least one circuit half-open (probing recovery).
    Degraded,
    /// At least one circuit open (failing fast).
    Unhealthy,
}

/// Per-channel view exposed to monitoring.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ChannelHealth {
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_rate: f64,
    pub total_requests: u64,
    pub total_failures: u64,
    pub total_successes: u64,
    pub uptime_ms: u64,
}

impl From<BreakerMetrics> for ChannelHealth {
    fn from(metrics: BreakerMetrics) -> Self {
        Self {
            state: metrics.state,
            failure_count: metrics.failure_count,
            failure_rate: metrics.failure_rate,
            total_requests: metrics.total_requests,
            total_failures: metrics.total_failures,
            total_successes: metrics.total_successes,
            uptime_ms: metrics.uptime.as_millis() as u64,
        }
    }
}

/// Health document served at the monitoring boundary.
///
/// Taking a report never mutates breaker state. With the `serde` feature it
/// serializes to the JSON shape monitoring expects: a `status` plus one
/// entry per channel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HealthReport {
    pub status: HealthStatus,
    pub read: ChannelHealth,
    pub write: ChannelHealth,
}

impl HealthReport {
    /// Builds a report from the registry's current per-channel state.
    pub fn from_registry(registry: &BreakerRegistry) -> Self {
        let read = registry.get(Channel::Read).metrics();
        let write = registry.get(Channel::Write).metrics();

        let states = [read.state, write.state];
        let status = if states.contains(&CircuitState::Open) {
            HealthStatus::Unhealthy
        } else if states.contains(&CircuitState::HalfOpen) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            read: read.into(),
            write: write.into(),
        }
    }

    /// HTTP status for health endpoints: 503 when unhealthy so operators
    /// and clients can tell "degraded, retry later" apart from a
    /// request-level failure, 200 otherwise.
    pub fn http_status(&self) -> u16 {
        match self.status {
            HealthStatus::Unhealthy => 503,
            _ => 200,
        }
    }
}
