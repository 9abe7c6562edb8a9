//! Programmable fake driver for the guarded-client tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;

use dbfuse_store::{DatabaseClient, Statement};

#[derive(Debug, Clone, PartialEq)]
pub struct FakeRows {
    pub sql: String,
    pub rows_affected: u64,
}

#[derive(Debug, Clone)]
pub struct FakeDbError(pub String);

impl std::fmt::Display for FakeDbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for FakeDbError {}

#[derive(Default)]
pub struct FakeDb {
    pub run_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    failing: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl FakeDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap() = latency;
    }

    fn latency(&self) -> Option<Duration> {
        *self.latency.lock().unwrap()
    }

    async fn simulate(&self) -> Result<(), FakeDbError> {
        if let Some(latency) = self.latency() {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            Err(FakeDbError("simulated driver failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl DatabaseClient for FakeDb {
    type Rows = FakeRows;
    type Batch = Vec<FakeRows>;
    type Error = FakeDbError;

    fn run<'a>(&'a self, statement: &'a Statement) -> BoxFuture<'a, Result<FakeRows, FakeDbError>> {
        Box::pin(async move {
            self.run_calls.fetch_add(1, Ordering::SeqCst);
            self.simulate().await?;
            Ok(FakeRows {
                sql: statement.sql.clone(),
                rows_affected: 1,
            })
        })
    }

    fn run_batch<'a>(
        &'a self,
        statements: &'a [Statement],
    ) -> BoxFuture<'a, Result<Vec<FakeRows>, FakeDbError>> {
        Box::pin(async move {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            self.simulate().await?;
            Ok(statements
                .iter()
                .map(|statement| FakeRows {
                    sql: statement.sql.clone(),
                    rows_affected: 1,
                })
                .collect())
        })
    }
}
