//! Tally binary.
//!
//! # Usage
//!
//! ```bash
//! # Race 10 unsafe increments, then 10 locked ones
//! tally-server counter-race --threads 10
//!
//! # Seed devices and run the concurrent device workload
//! tally-server --capacity 10 device-sim
//! ```

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tally_server::{IncrementMode, Runtime, RuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Tally lock-discipline demonstrator
#[derive(Parser, Debug)]
#[command(name = "tally-server")]
#[command(about = "Concurrent counter and license-backed device registry")]
#[command(version)]
struct Args {
    /// License pool size
    #[arg(long, default_value = "10")]
    capacity: usize,

    /// Runtime worker threads
    #[arg(long, default_value = "10")]
    workers: usize,

    /// Seconds to wait for a workload before aborting stragglers
    #[arg(long, default_value = "5")]
    join_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run concurrent increments and report the final counter
    CounterRace {
        /// Concurrent increments per race
        #[arg(short, long, default_value = "10")]
        threads: usize,

        /// Simulated work per increment, in milliseconds
        #[arg(long, default_value = "100")]
        delay_ms: u64,

        /// Which increment path to race
        #[arg(long, value_enum, default_value_t = Mode::Both)]
        mode: Mode,
    },

    /// Seed devices and run overlapping add/enable/disable/delete requests
    DeviceSim {
        /// Start from an empty registry
        #[arg(long)]
        no_seed: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Unsafe,
    Safe,
    Both,
}

impl Mode {
    fn paths(self) -> &'static [IncrementMode] {
        match self {
            Self::Unsafe => &[IncrementMode::Unsafe],
            Self::Safe => &[IncrementMode::Safe],
            Self::Both => &[IncrementMode::Unsafe, IncrementMode::Safe],
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_thread_names(true)).with(filter).init();

    let mut config = RuntimeConfig {
        license_capacity: args.capacity,
        workers: args.workers,
        join_timeout: Duration::from_secs(args.join_timeout_secs),
        ..Default::default()
    };
    match &args.command {
        Command::CounterRace { delay_ms, .. } => {
            config.work_delay = Duration::from_millis(*delay_ms);
        },
        Command::DeviceSim { no_seed } => config.seed_devices = !no_seed,
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers.max(1))
        .thread_name("tally-worker")
        .enable_all()
        .build()?;

    rt.block_on(run(config, args.command))
}

async fn run(config: RuntimeConfig, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::new(config)?;
    tracing::info!(
        capacity = runtime.config().license_capacity,
        workers = runtime.config().workers,
        "Tally starting"
    );

    let shutdown = runtime.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling in-flight operations");
            shutdown.cancel();
        }
    });

    match command {
        Command::CounterRace { threads, mode, .. } => {
            for path in mode.paths() {
                let report = runtime.run_counter_race(*path, threads).await?;
                tracing::info!(
                    mode = ?report.mode,
                    requested = report.requested,
                    completed = report.completed,
                    failed = report.failed,
                    unfinished = report.unfinished,
                    final_value = report.final_value,
                    lost_updates = report.lost_updates(),
                    "final counter"
                );
                let status = runtime.counter().status();
                tracing::info!(value = status.value, "counter status");
            }
        },
        Command::DeviceSim { .. } => {
            let report = runtime.run_device_simulation().await?;
            tracing::info!(
                succeeded = report.pool.succeeded.len(),
                rejected = report.capacity_rejections(),
                conserved = report.is_conserved(),
                summary = ?report.after,
                "device simulation finished"
            );
            for device in &report.devices {
                tracing::info!(
                    device_id = %device.device_id,
                    name = %device.name,
                    enabled = device.enabled,
                    "device"
                );
            }
        },
    }

    Ok(())
}
