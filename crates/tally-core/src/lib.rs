//! Concurrency and resource-accounting core for Tally.
//!
//! Two independent cores share one discipline: every read-modify-write of
//! shared state happens inside a critical section guarded by a fair
//! (first-requested, first-served) exclusive lock.
//!
//! ## Architecture
//!
//! ```text
//! tally-core
//!   ├─ Environment        (time + sleep abstraction)
//!   ├─ Counter            (unsafe vs. lock-guarded increments)
//!   ├─ DeviceManager      (registry + ledger behind one lock)
//!   │    └─ LicenseLedger (capacity accounting, caller-locked)
//!   └─ CoreError          (capacity vs. cancellation)
//! ```
//!
//! The lock used throughout is [`tokio::sync::Mutex`]. Its waiters are
//! queued and granted the lock in the order they called `lock()`, so no
//! operation can be starved by a stream of later arrivals.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod counter;
pub mod device;
pub mod env;
pub mod error;
pub mod license;
mod lock;
pub mod registry;

pub use counter::{Counter, CounterConfig, CounterStatus};
pub use device::{Device, DeviceId};
pub use env::Environment;
pub use error::CoreError;
pub use license::LicenseLedger;
pub use registry::{BatchOutcome, DeviceManager, StatusSummary};
