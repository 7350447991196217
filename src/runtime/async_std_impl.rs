//! async-std runtime implementation.

use std::future::Future;
use std::time::Duration;

use super::{Closed, TimedOut};

/// Counting semaphore backing the per-session concurrency gate.
///
/// async-std ships no semaphore of its own, so this borrows the one from
/// async-lock, which is executor independent.
pub type Semaphore = async_lock::Semaphore;

/// Scoped permit; the slot is returned when it is dropped.
pub type SemaphorePermit<'a> = async_lock::SemaphoreGuard<'a>;

/// Acquire one permit. async-lock semaphores cannot be closed.
pub async fn acquire_impl(semaphore: &Semaphore) -> Result<SemaphorePermit<'_>, Closed> {
    Ok(semaphore.acquire().await)
}

/// Run a future with a timeout using async-std.
pub async fn timeout_impl<F, T>(duration: Duration, future: F) -> Result<T, TimedOut>
where
    F: Future<Output = T>,
{
    async_std::future::timeout(duration, future)
        .await
        .map_err(|_| TimedOut)
}
