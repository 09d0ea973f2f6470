//! Tally runtime.
//!
//! This crate drives the cores the way a service would:
//! - Tokio multi-threaded runtime for the worker pool
//! - System clock for the simulated work delay
//! - A shared shutdown token that cancels in-flight critical sections
//!
//! ## Architecture
//!
//! ```text
//! tally-server
//!   ├─ Runtime         (owns the cores, runs workloads)
//!   ├─ WorkerPool      (one task per request, join deadline)
//!   ├─ DeviceRequest   (decoded device call + actor)
//!   ├─ seed            (startup devices, canned workload)
//!   └─ SystemEnv       (production Environment impl)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod executor;
mod request;
pub mod seed;
mod system_env;

use std::{sync::Arc, time::Duration};

pub use error::ServerError;
pub use executor::{PoolReport, WorkerPool};
pub use request::DeviceRequest;
pub use system_env::SystemEnv;
use tally_core::{
    BatchOutcome, Counter, CounterConfig, CoreError, Device, DeviceManager, StatusSummary,
};
use tokio_util::sync::CancellationToken;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Size of the license pool
    pub license_capacity: usize,
    /// Simulated work inside each counter increment
    pub work_delay: Duration,
    /// Worker threads the binary gives its tokio runtime; must be non-zero
    pub workers: usize,
    /// How long a workload may run before stragglers are aborted
    pub join_timeout: Duration,
    /// Register the startup devices before running device workloads
    pub seed_devices: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            license_capacity: 10,
            work_delay: Duration::from_millis(100),
            workers: 10,
            join_timeout: Duration::from_secs(5),
            seed_devices: true,
        }
    }
}

/// Which increment path a counter race exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementMode {
    /// No lock: expect lost updates.
    Unsafe,
    /// Fair lock: expect an exact count.
    Safe,
}

/// Result of a counter race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceReport {
    /// Increment path used.
    pub mode: IncrementMode,
    /// Increments submitted.
    pub requested: usize,
    /// Increments that finished.
    pub completed: usize,
    /// Increments that failed (cancelled).
    pub failed: usize,
    /// Increments aborted at the join deadline.
    pub unfinished: usize,
    /// Counter value after the race.
    pub final_value: u64,
}

/// Result of a concurrent device workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    /// Summary before the workload.
    pub before: StatusSummary,
    /// Per-request results.
    pub pool: PoolReport<BatchOutcome>,
    /// Summary after the workload.
    pub after: StatusSummary,
    /// Device list after the workload.
    pub devices: Vec<Device>,
}

/// Owns both cores and runs workloads against them.
#[derive(Debug)]
pub struct Runtime {
    counter: Arc<Counter<SystemEnv>>,
    devices: Arc<DeviceManager<SystemEnv>>,
    pool: WorkerPool,
    shutdown: CancellationToken,
    config: RuntimeConfig,
}

impl Runtime {
    /// Build the cores from `config`.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the license capacity is zero or no
    /// workers are configured.
    pub fn new(config: RuntimeConfig) -> Result<Self, ServerError> {
        if config.workers == 0 {
            return Err(ServerError::Config("at least one worker is required".to_string()));
        }

        let env = SystemEnv::new();
        let counter =
            Arc::new(Counter::new(env.clone(), CounterConfig { work_delay: config.work_delay }));
        let devices = Arc::new(DeviceManager::new(env, config.license_capacity)?);

        Ok(Self {
            counter,
            devices,
            pool: WorkerPool::new(config.join_timeout),
            shutdown: CancellationToken::new(),
            config,
        })
    }

    /// The counter core.
    pub fn counter(&self) -> &Counter<SystemEnv> {
        &self.counter
    }

    /// The device/license core.
    pub fn devices(&self) -> &DeviceManager<SystemEnv> {
        &self.devices
    }

    /// Active configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Token that, once cancelled, fails in-flight safe increments.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Register the startup devices.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Core` if the pool is too small for them.
    pub async fn seed(&self) -> Result<BatchOutcome, ServerError> {
        let outcome = self.devices.add_devices(seed::initial_devices(), seed::SEED_USER).await?;
        let summary = self.devices.get_status_summary().await;
        tracing::info!(?summary, "initial devices loaded");
        Ok(outcome)
    }

    /// Reset the counter, then run `threads` concurrent increments.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Worker` if an increment task panicked.
    pub async fn run_counter_race(
        &self,
        mode: IncrementMode,
        threads: usize,
    ) -> Result<RaceReport, ServerError> {
        self.counter.reset().await;

        let jobs = (0..threads).map(|_| {
            let counter = Arc::clone(&self.counter);
            let cancel = self.shutdown.clone();
            async move {
                match mode {
                    IncrementMode::Unsafe => Ok(counter.increment_unsafe().await),
                    IncrementMode::Safe => counter.increment_safe(&cancel).await,
                }
            }
        });
        let pool = self.pool.run(jobs).await?;

        let report = RaceReport {
            mode,
            requested: threads,
            completed: pool.succeeded.len(),
            failed: pool.failed.len(),
            unfinished: pool.unfinished,
            final_value: self.counter.get(),
        };
        tracing::info!(?mode, threads, final_value = report.final_value, "counter race finished");
        Ok(report)
    }

    /// Submit every request at once and wait for all of them.
    ///
    /// Capacity rejections are recorded in the report, not returned.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Worker` if a request task panicked.
    pub async fn run_requests(
        &self,
        requests: Vec<DeviceRequest>,
    ) -> Result<SimulationReport, ServerError> {
        let before = self.devices.get_status_summary().await;

        let jobs = requests.into_iter().map(|request| {
            let devices = Arc::clone(&self.devices);
            async move {
                let user = request.user().to_string();
                let op = request.op();
                let result = request.apply(&*devices).await;
                if let Err(ref err) = result {
                    tracing::warn!(user = %user, op, error = %err, "request rejected");
                }
                result
            }
        });
        let pool = self.pool.run(jobs).await?;

        let after = self.devices.get_status_summary().await;
        let devices = self.devices.get_all_devices().await;
        tracing::info!(?before, ?after, "device workload finished");

        Ok(SimulationReport { before, pool, after, devices })
    }

    /// Seed (if configured) and run the canned concurrent workload.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Core` if seeding fails, `ServerError::Worker`
    /// if a request task panicked.
    pub async fn run_device_simulation(&self) -> Result<SimulationReport, ServerError> {
        if self.config.seed_devices {
            self.seed().await?;
        }
        self.run_requests(seed::concurrent_requests()).await
    }
}

impl RaceReport {
    /// Whether the race lost updates (fewer increments visible than ran).
    pub fn lost_updates(&self) -> bool {
        self.final_value < self.completed as u64
    }
}

impl SimulationReport {
    /// Whether license usage matches the enabled-device count afterwards.
    pub fn is_conserved(&self) -> bool {
        self.after.current_license_usage == self.after.enabled_count
    }

    /// Capacity rejections among the requests.
    pub fn capacity_rejections(&self) -> usize {
        self.pool
            .failed
            .iter()
            .filter(|err| matches!(err, CoreError::InsufficientCapacity { .. }))
            .count()
    }
}
