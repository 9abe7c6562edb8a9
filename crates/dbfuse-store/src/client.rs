//! Seam to the underlying database driver.

use futures::future::BoxFuture;

use crate::Statement;

/// The underlying database driver a [`GuardedClient`](crate::GuardedClient)
/// wraps.
///
/// The driver is shared and assumed safe for concurrent in-flight calls; the
/// guard borrows it for the duration of each call and never owns the
/// connection. Implementations hand back their native row and batch result
/// shapes, which the guard passes through untouched; it only interprets a
/// call's overall success or failure.
pub trait DatabaseClient: Send + Sync {
    /// Result of a single statement.
    type Rows: Send;
    /// Result of a batch call. Heterogeneous per-statement outcomes stay in
    /// whatever shape the driver produces.
    type Batch: Send;
    /// Driver error type.
    type Error: std::fmt::Display + Send;

    /// Executes a single statement.
    fn run<'a>(&'a self, statement: &'a Statement)
        -> BoxFuture<'a, Result<Self::Rows, Self::Error>>;

    /// Executes a batch of statements as one unit.
    fn run_batch<'a>(
        &'a self,
        statements: &'a [Statement],
    ) -> BoxFuture<'a, Result<Self::Batch, Self::Error>>;
}
