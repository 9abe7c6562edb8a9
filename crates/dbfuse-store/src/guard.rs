//! The guarded data-access wrapper.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dbfuse_breaker::{BreakerConfig, BreakerError, BreakerRegistry, Channel, RegistryMetrics};

use crate::client::DatabaseClient;
use crate::health::HealthReport;
use crate::Statement;

/// Configuration for a [`GuardedClient`], read once at construction.
pub struct GuardConfig {
    /// Breaker configuration for the read channel.
    pub read: BreakerConfig,
    /// Breaker configuration for the write channel.
    pub write: BreakerConfig,
}

impl GuardConfig {
    /// Builds a configuration from explicit per-channel breaker configs.
    pub fn new(read: BreakerConfig, write: BreakerConfig) -> Self {
        Self { read, write }
    }

    /// Applies one per-call deadline to both channels. A call that does not
    /// settle within `limit` is recorded as a failure on its channel and
    /// surfaces as a timeout error.
    pub fn operation_timeout(mut self, limit: Duration) -> Self {
        self.read.set_operation_timeout(Some(limit));
        self.write.set_operation_timeout(Some(limit));
        self
    }
}

impl Default for GuardConfig {
    /// The default read and write profiles: reads trip after 3 consecutive
    /// failures and probe recovery after 3s; writes trip after 5 and wait
    /// 10s.
    fn default() -> Self {
        Self {
            read: BreakerConfig::read_profile().build(),
            write: BreakerConfig::write_profile().build(),
        }
    }
}

/// Database access guarded by per-channel circuit breakers.
///
/// Presents the same call shape as the underlying driver (single statement
/// or batch) while interposing the appropriate breaker. The wrapper is
/// stateless beyond the registry it owns; it is safe to clone and share
/// across concurrent callers because all mutable state lives inside the
/// breakers, which serialize their own transitions.
///
/// ```rust
/// use dbfuse_store::{GuardConfig, GuardedClient, Statement};
/// # use dbfuse_store::DatabaseClient;
/// # use futures::future::BoxFuture;
/// # struct Driver;
/// # impl DatabaseClient for Driver {
/// #     type Rows = u64;
/// #     type Batch = Vec<u64>;
/// #     type Error = std::io::Error;
/// #     fn run<'a>(&'a self, _: &'a Statement) -> BoxFuture<'a, Result<u64, std::io::Error>> {
/// #         Box::pin(async { Ok(1) })
/// #     }
/// #     fn run_batch<'a>(&'a self, _: &'a [Statement]) -> BoxFuture<'a, Result<Vec<u64>, std::io::Error>> {
/// #         Box::pin(async { Ok(vec![]) })
/// #     }
/// # }
/// # async fn example() {
/// let store = GuardedClient::new(std::sync::Arc::new(Driver), GuardConfig::default());
///
/// let rows = store
///     .read(&Statement::new("SELECT id FROM models").bind(10i64))
///     .await;
/// # let _ = rows;
/// # }
/// ```
pub struct GuardedClient<D> {
    client: Arc<D>,
    registry: BreakerRegistry,
}

impl<D> Clone for GuardedClient<D> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            registry: self.registry.clone(),
        }
    }
}

impl<D> GuardedClient<D>
where
    D: DatabaseClient,
{
    /// Wraps a shared driver with a fresh two-channel registry.
    pub fn new(client: Arc<D>, config: GuardConfig) -> Self {
        Self {
            client,
            registry: BreakerRegistry::new(config.read, config.write),
        }
    }

    /// Wraps a shared driver with the default channel profiles.
    pub fn with_defaults(client: Arc<D>) -> Self {
        Self::new(client, GuardConfig::default())
    }

    /// Runs a single statement through the read breaker.
    pub async fn read(&self, statement: &Statement) -> Result<D::Rows, BreakerError<D::Error>> {
        self.registry
            .get(Channel::Read)
            .execute(|| self.client.run(statement))
            .await
    }

    /// Runs a single statement through the write breaker.
    pub async fn write(&self, statement: &Statement) -> Result<D::Rows, BreakerError<D::Error>> {
        self.registry
            .get(Channel::Write)
            .execute(|| self.client.run(statement))
            .await
    }

    /// Runs a batch through the write breaker as a single guarded unit.
    ///
    /// Admission is all-or-nothing for the whole batch, and a failed batch
    /// counts once against the write breaker, not once per statement. The
    /// driver's batch result shape is passed through unmodified.
    pub async fn batch(&self, statements: &[Statement]) -> Result<D::Batch, BreakerError<D::Error>> {
        self.registry
            .get(Channel::Write)
            .execute(|| self.client.run_batch(statements))
            .await
    }

    /// Reads with graceful degradation: when the read circuit rejects the
    /// call, `fallback` supplies the result instead (serving cached data,
    /// say). Driver failures and timeouts propagate unchanged, and with the
    /// circuit closed the fallback is never invoked.
    pub async fn read_with_fallback<F, Fut>(
        &self,
        statement: &Statement,
        fallback: F,
    ) -> Result<D::Rows, BreakerError<D::Error>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<D::Rows, D::Error>>,
    {
        execute_with_fallback(self.read(statement), fallback).await
    }

    /// Writes with graceful degradation; see
    /// [`read_with_fallback`](Self::read_with_fallback).
    pub async fn write_with_fallback<F, Fut>(
        &self,
        statement: &Statement,
        fallback: F,
    ) -> Result<D::Rows, BreakerError<D::Error>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<D::Rows, D::Error>>,
    {
        execute_with_fallback(self.write(statement), fallback).await
    }

    /// The breaker registry guarding this client.
    pub fn registry(&self) -> &BreakerRegistry {
        &self.registry
    }

    /// Per-channel metric snapshots.
    pub fn metrics(&self) -> RegistryMetrics {
        self.registry.metrics()
    }

    /// Health rollup over both channels for the monitoring boundary.
    pub fn health(&self) -> HealthReport {
        HealthReport::from_registry(&self.registry)
    }

    /// Resets both breakers to a pristine closed state.
    pub fn reset_breakers(&self) {
        self.registry.reset();
    }
}

/// Replaces a fail-fast rejection with the fallback's outcome.
///
/// Only [`BreakerError::CircuitOpen`] is intercepted, since it is the one
/// error the breaker synthesizes itself: "service degraded, use the
/// fallback" never masks "the database call failed". Any other outcome,
/// success or failure, passes through unchanged. A failing fallback
/// surfaces as [`BreakerError::Operation`].
pub async fn execute_with_fallback<T, E, Op, F, Fut>(
    operation: Op,
    fallback: F,
) -> Result<T, BreakerError<E>>
where
    Op: Future<Output = Result<T, BreakerError<E>>>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match operation.await {
        Err(err) if err.is_circuit_open() => {
            #[cfg(feature = "tracing")]
            tracing::debug!("circuit open, serving fallback");
            fallback().await.map_err(BreakerError::Operation)
        }
        other => other,
    }
}
