//! Guarded database access with fallbacks and health reporting.
//!
//! Wraps a simulated driver with per-channel breakers, drives the write
//! channel to open, and shows that reads keep flowing while writes fail
//! fast and degrade through a fallback.
//!
//! Run with:
//! ```sh
//! cargo run --example guarded_store
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use dbfuse_store::{
    BreakerConfig, BreakerError, DatabaseClient, GuardConfig, GuardedClient, Statement,
};

#[derive(Debug, Clone)]
struct DriverError(String);

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for DriverError {}

/// In-memory driver whose writes can be forced to fail.
struct FlakyDriver {
    calls: AtomicUsize,
    writes_failing: AtomicBool,
}

impl FlakyDriver {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            writes_failing: AtomicBool::new(false),
        }
    }
}

impl DatabaseClient for FlakyDriver {
    type Rows = String;
    type Batch = Vec<String>;
    type Error = DriverError;

    fn run<'a>(&'a self, statement: &'a Statement) -> BoxFuture<'a, Result<String, DriverError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let is_write = !statement.sql.trim_start().to_lowercase().starts_with("select");
            if is_write && self.writes_failing.load(Ordering::SeqCst) {
                Err(DriverError("disk full".to_string()))
            } else {
                Ok(format!("result of `{}`", statement.sql))
            }
        })
    }

    fn run_batch<'a>(
        &'a self,
        statements: &'a [Statement],
    ) -> BoxFuture<'a, Result<Vec<String>, DriverError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.writes_failing.load(Ordering::SeqCst) {
                Err(DriverError("disk full".to_string()))
            } else {
                Ok(statements
                    .iter()
                    .map(|s| format!("result of `{}`", s.sql))
                    .collect())
            }
        })
    }
}

#[tokio::main]
async fn main() {
    let driver = Arc::new(FlakyDriver::new());
    let store = GuardedClient::new(
        Arc::clone(&driver),
        GuardConfig::new(
            BreakerConfig::read_profile().build(),
            BreakerConfig::write_profile()
                .failure_threshold(3)
                .reset_timeout(Duration::from_millis(500))
                .build(),
        )
        .operation_timeout(Duration::from_secs(2)),
    );

    println!("--- writes start failing ---");
    driver.writes_failing.store(true, Ordering::SeqCst);

    let insert = Statement::new("INSERT INTO sessions (token) VALUES (?)").bind("abc123");
    for attempt in 1..=4 {
        match store.write(&insert).await {
            Ok(rows) => println!("write {attempt}: ok ({rows})"),
            Err(BreakerError::CircuitOpen { retry_after, .. }) => {
                println!("write {attempt}: fail-fast, retry after {retry_after:?}")
            }
            Err(err) => println!("write {attempt}: {err}"),
        }
    }

    println!("\n--- reads keep flowing while the write circuit is open ---");
    let select = Statement::new("SELECT name FROM models WHERE active = ?").bind(true);
    match store.read(&select).await {
        Ok(rows) => println!("read: ok ({rows})"),
        Err(err) => println!("read: {err}"),
    }

    println!("\n--- degraded write served from a fallback ---");
    let result = store
        .write_with_fallback(&insert, || async {
            Ok("queued for replay when service recovers".to_string())
        })
        .await;
    println!("fallback write: {result:?}");

    let health = store.health();
    println!(
        "\nhealth: {:?} (HTTP {}), read={:?} write={:?}",
        health.status,
        health.http_status(),
        health.read.state,
        health.write.state,
    );

    println!("\n--- driver recovers; trial write closes the circuit ---");
    driver.writes_failing.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(600)).await;

    match store.write(&insert).await {
        Ok(rows) => println!("trial write: ok ({rows})"),
        Err(err) => println!("trial write: {err}"),
    }
    println!("health after recovery: {:?}", store.health().status);
}
