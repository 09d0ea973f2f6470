//! Scoped critical sections over the fair mutex.

use std::{
    ops::{Deref, DerefMut},
    time::Instant,
};

use tokio::sync::{Mutex, MutexGuard};

use crate::env::Environment;

/// A held lock plus the bookkeeping needed to log how long it was held.
///
/// Dropping the section releases the lock, so every exit path of the code
/// holding it (return, `?`, cancellation of the enclosing future) unlocks.
pub(crate) struct CriticalSection<'a, T, E: Environment> {
    guard: MutexGuard<'a, T>,
    env: &'a E,
    op: &'static str,
    acquired_at: Instant,
}

impl<'a, T, E: Environment> CriticalSection<'a, T, E> {
    /// Waits for `mutex` in FIFO order and enters the critical section.
    pub(crate) async fn enter(mutex: &'a Mutex<T>, env: &'a E, op: &'static str) -> Self {
        tracing::debug!(op, "waiting for lock");
        let guard = mutex.lock().await;
        Self::from_guard(guard, env, op)
    }

    /// Wraps a guard that was acquired by the caller.
    pub(crate) fn from_guard(guard: MutexGuard<'a, T>, env: &'a E, op: &'static str) -> Self {
        tracing::debug!(op, "acquired lock");
        Self { guard, env, op, acquired_at: env.now() }
    }
}

impl<T, E: Environment> Deref for CriticalSection<'_, T, E> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T, E: Environment> DerefMut for CriticalSection<'_, T, E> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T, E: Environment> Drop for CriticalSection<'_, T, E> {
    fn drop(&mut self) {
        let held_ms = self.env.elapsed_ms(self.acquired_at);
        tracing::debug!(op = self.op, held_ms, "released lock");
    }
}
