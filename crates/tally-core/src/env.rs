//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples the cores from system time. The only
//! blocking work the cores do besides waiting for a lock is the simulated
//! delay inside a critical section, and it goes through `sleep` so that:
//!
//! - Simulation: a paused tokio clock advances virtual time instantly, which
//!   makes lost updates and lock hand-off order fully reproducible.
//!
//! - Production: the real clock makes contention observable in the logs.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Isolation: Implementations must not share global state

use std::time::{Duration, Instant};

/// Abstract environment providing time and async sleeping.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: Subsequent calls must return times >= previous calls.
    fn now(&self) -> Instant;

    /// Sleeps for the specified duration.
    ///
    /// Used for simulated work while a critical section is held. Callers may
    /// race it against cancellation, so the returned future must be safe to
    /// drop before completion.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Milliseconds elapsed since `since`, saturating at zero.
    fn elapsed_ms(&self, since: Instant) -> u64 {
        let elapsed = self.now().saturating_duration_since(since).as_millis();
        u64::try_from(elapsed).unwrap_or(u64::MAX)
    }
}

/// Environment backed by the tokio clock, for tests that pause time.
#[cfg(test)]
pub(crate) mod testing {
    use std::time::{Duration, Instant};

    use super::Environment;

    #[derive(Clone, Default)]
    pub(crate) struct TokioEnv;

    impl Environment for TokioEnv {
        fn now(&self) -> Instant {
            tokio::time::Instant::now().into_std()
        }

        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            tokio::time::sleep(duration)
        }
    }
}
