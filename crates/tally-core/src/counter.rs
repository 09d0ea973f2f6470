//! Counter Core
//!
//! A single process-wide integer with two increment paths that perform the
//! same read, delay, write sequence:
//!
//! - `increment_unsafe`: no synchronization. Concurrent callers read the same
//!   stale value during the delay and overwrite each other's writes, so N
//!   concurrent calls usually end well below N. Kept as a separate operation
//!   for side-by-side comparison with the guarded path.
//! - `increment_safe`: the sequence runs inside a critical section on a fair
//!   mutex, so N concurrent calls always end at exactly N.
//!
//! The value lives in an atomic so the racy path is a logical lost update
//! rather than a data race.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{env::Environment, error::CoreError, lock::CriticalSection};

/// Counter tuning.
#[derive(Debug, Clone)]
pub struct CounterConfig {
    /// Simulated work between reading and writing the value.
    pub work_delay: Duration,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self { work_delay: Duration::from_millis(100) }
    }
}

/// Point-in-time view of the counter for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterStatus {
    /// Counter value (lock-free read).
    pub value: u64,
    /// When the value was read.
    pub observed_at: Instant,
}

/// Shared counter guarded by a fair mutex.
///
/// The mutex protects no data of its own: it serializes the
/// read-delay-write sequences of `increment_safe` and `reset`.
pub struct Counter<E>
where
    E: Environment,
{
    value: AtomicU64,
    lock: Mutex<()>,
    config: CounterConfig,
    env: E,
}

impl<E> Counter<E>
where
    E: Environment,
{
    /// Create a counter starting at 0.
    pub fn new(env: E, config: CounterConfig) -> Self {
        Self { value: AtomicU64::new(0), lock: Mutex::new(()), config, env }
    }

    /// Current value without taking the lock.
    ///
    /// This is a reporting view: it may observe a value that an in-flight
    /// unsafe increment is about to overwrite.
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Current value with the time it was observed.
    pub fn status(&self) -> CounterStatus {
        CounterStatus { value: self.get(), observed_at: self.env.now() }
    }

    /// Increment without any synchronization.
    ///
    /// Returns the value this call wrote, which may be lower than the number
    /// of increments that completed before it.
    pub async fn increment_unsafe(&self) -> u64 {
        tracing::debug!(op = "increment_unsafe", "incrementing without lock");

        let current = self.value.load(Ordering::SeqCst);
        self.env.sleep(self.config.work_delay).await;
        let next = current.saturating_add(1);
        self.value.store(next, Ordering::SeqCst);

        tracing::info!(value = next, "incremented (no lock)");
        next
    }

    /// Increment inside the fair critical section.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::OperationCancelled` if `cancel` fires while this
    /// call is queued for the lock or during the simulated delay. The value
    /// is left as it was and the lock is released before the error returns.
    pub async fn increment_safe(&self, cancel: &CancellationToken) -> Result<u64, CoreError> {
        tracing::debug!(op = "increment_safe", "waiting for lock");
        let guard = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::warn!(op = "increment_safe", "cancelled while waiting for lock");
                return Err(CoreError::OperationCancelled);
            },
            guard = self.lock.lock() => guard,
        };
        let _section = CriticalSection::from_guard(guard, &self.env, "increment_safe");

        let current = self.value.load(Ordering::SeqCst);
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::warn!(
                    op = "increment_safe",
                    value = current,
                    "cancelled during work, value unchanged"
                );
                return Err(CoreError::OperationCancelled);
            },
            () = self.env.sleep(self.config.work_delay) => {},
        }
        let next = current.saturating_add(1);
        self.value.store(next, Ordering::SeqCst);

        tracing::info!(value = next, "incremented (with lock)");
        Ok(next)
    }

    /// Set the value back to 0.
    ///
    /// Takes the same lock as `increment_safe`, so it never lands between the
    /// read and write of a guarded increment. Unsafe increments in flight can
    /// still overwrite it.
    pub async fn reset(&self) {
        let _section = CriticalSection::enter(&self.lock, &self.env, "reset").await;
        self.value.store(0, Ordering::SeqCst);
        tracing::info!("counter reset to 0");
    }
}

impl<E> std::fmt::Debug for Counter<E>
where
    E: Environment,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Counter")
            .field("value", &self.get())
            .field("work_delay", &self.config.work_delay)
            .finish_non_exhaustive()
    }
}
