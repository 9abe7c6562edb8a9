//! Two-channel breaker registry isolating read and write traffic.

use std::fmt;

use crate::circuit::BreakerMetrics;
use crate::config::BreakerConfig;
use crate::CircuitBreaker;

/// Logical category of guarded traffic, each with its own breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Channel {
    /// Query traffic.
    Read,
    /// Mutation traffic, including batches.
    Write,
}

impl Channel {
    /// Returns the channel name used in errors, events, and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Read => "read",
            Channel::Write => "write",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Holds one independently configured breaker per channel.
///
/// The two breakers share nothing: write failures never increment the read
/// breaker's counters or force it open, and vice versa. Read-heavy and
/// write-heavy failure modes carry different risk profiles (a write failing
/// on a constraint violation must not halt unrelated reads), which is why
/// two breakers exist rather than one.
///
/// The registry owns its breakers exclusively for the lifetime of the
/// wrapper that constructed it. Cloning shares the underlying breakers.
#[derive(Clone)]
pub struct BreakerRegistry {
    read: CircuitBreaker,
    write: CircuitBreaker,
}

impl BreakerRegistry {
    /// Builds the registry from per-channel configurations.
    ///
    /// Each breaker's name is set to its channel name so that errors and
    /// events identify the channel that produced them.
    pub fn new(mut read: BreakerConfig, mut write: BreakerConfig) -> Self {
        read.name = Channel::Read.as_str().to_string();
        write.name = Channel::Write.as_str().to_string();
        Self {
            read: CircuitBreaker::new(read),
            write: CircuitBreaker::new(write),
        }
    }

    /// Returns the breaker guarding the given channel.
    pub fn get(&self, channel: Channel) -> &CircuitBreaker {
        match channel {
            Channel::Read => &self.read,
            Channel::Write => &self.write,
        }
    }

    /// Returns per-channel metric snapshots.
    pub fn metrics(&self) -> RegistryMetrics {
        RegistryMetrics {
            read: self.read.metrics(),
            write: self.write.metrics(),
        }
    }

    /// Resets both breakers to a pristine closed state.
    pub fn reset(&self) {
        self.read.reset();
        self.write.reset();
    }
}

impl Default for BreakerRegistry {
    /// A registry with the default read and write profiles.
    fn default() -> Self {
        Self::new(
            BreakerConfig::read_profile().build(),
            BreakerConfig::write_profile().build(),
        )
    }
}

impl fmt::Debug for BreakerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakerRegistry")
            .field("read", &self.read.state_sync())
            .field("write", &self.write.state_sync())
            .finish()
    }
}

/// Per-channel metric snapshots for the monitoring boundary.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RegistryMetrics {
    /// Read-channel snapshot.
    pub read: BreakerMetrics,
    /// Write-channel snapshot.
    pub write: BreakerMetrics,
}
