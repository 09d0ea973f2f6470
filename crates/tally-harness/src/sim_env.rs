//! Simulation environment on the tokio clock.
//!
//! Under `tokio::time::pause()` (or `#[tokio::test(start_paused = true)]`)
//! the runtime advances virtual time as soon as every task is idle, so
//! simulated work delays cost nothing and interleavings are reproducible.

use std::time::{Duration, Instant};

use tally_core::Environment;

/// Environment backed by tokio's (pausable) clock.
#[derive(Clone, Debug, Default)]
pub struct SimEnv;

impl SimEnv {
    /// Create a simulation environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn paused_sleep_advances_virtual_time() {
        let env = SimEnv::new();

        let start = env.now();
        env.sleep(Duration::from_secs(60)).await;

        assert!(env.elapsed_ms(start) >= 60_000);
    }
}
