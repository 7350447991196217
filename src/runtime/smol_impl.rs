//! smol runtime implementation.

use std::future::Future;
use std::time::Duration;

use super::{Closed, TimedOut};

/// Counting semaphore backing the per-session concurrency gate.
pub type Semaphore = async_lock::Semaphore;

/// Scoped permit; the slot is returned when it is dropped.
pub type SemaphorePermit<'a> = async_lock::SemaphoreGuard<'a>;

/// Acquire one permit. async-lock semaphores cannot be closed.
pub async fn acquire_impl(semaphore: &Semaphore) -> Result<SemaphorePermit<'_>, Closed> {
    Ok(semaphore.acquire().await)
}

/// Run a future with a timeout using smol.
pub async fn timeout_impl<F, T>(duration: Duration, future: F) -> Result<T, TimedOut>
where
    F: Future<Output = T>,
{
    use futures::future::Either;

    let timeout_future = smol::Timer::after(duration);

    futures::pin_mut!(future);
    futures::pin_mut!(timeout_future);

    match futures::future::select(future, timeout_future).await {
        Either::Left((result, _)) => Ok(result),
        Either::Right((_, _)) => Err(TimedOut),
    }
}
