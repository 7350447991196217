//! Tokio runtime implementation.

use std::future::Future;
use std::time::Duration;

use super::{Closed, TimedOut};

/// Counting semaphore backing the per-session concurrency gate.
pub type Semaphore = tokio::sync::Semaphore;

/// Scoped permit; the slot is returned when it is dropped.
pub type SemaphorePermit<'a> = tokio::sync::SemaphorePermit<'a>;

/// Acquire one permit using tokio.
pub async fn acquire_impl(semaphore: &Semaphore) -> Result<SemaphorePermit<'_>, Closed> {
    semaphore.acquire().await.map_err(|_| Closed)
}

/// Run a future with a timeout using tokio.
pub async fn timeout_impl<F, T>(duration: Duration, future: F) -> Result<T, TimedOut>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimedOut)
}
