//! License Ledger
//!
//! Fixed-capacity license pool. `current_usage` must equal the number of
//! enabled devices whenever no operation is in flight.
//!
//! # Locking
//!
//! The ledger has no lock of its own. Every mutation must happen while the
//! caller holds the lock that also guards the device registry; the
//! `DeviceManager` enforces this by keeping the ledger inside its
//! mutex-guarded state. A second lock here would introduce a lock-ordering
//! hazard between the two resources.

use crate::error::CoreError;

/// License pool with immutable capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseLedger {
    total_capacity: usize,
    current_usage: usize,
}

impl LicenseLedger {
    /// Create an empty pool.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidCapacity` if `total_capacity` is zero.
    pub fn new(total_capacity: usize) -> Result<Self, CoreError> {
        if total_capacity == 0 {
            return Err(CoreError::InvalidCapacity);
        }
        Ok(Self { total_capacity, current_usage: 0 })
    }

    /// Total licenses in the pool.
    pub fn total_capacity(&self) -> usize {
        self.total_capacity
    }

    /// Licenses currently held by enabled devices.
    pub fn current_usage(&self) -> usize {
        self.current_usage
    }

    /// Licenses still free.
    pub fn available(&self) -> usize {
        self.total_capacity.saturating_sub(self.current_usage)
    }

    /// Check that `count` licenses could be consumed, without consuming them.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InsufficientCapacity` if `count > available()`.
    pub fn ensure_available(&self, count: usize) -> Result<(), CoreError> {
        let available = self.available();
        if count > available {
            return Err(CoreError::InsufficientCapacity { requested: count, available });
        }
        Ok(())
    }

    /// Take `count` licenses from the pool.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InsufficientCapacity` if `count > available()`;
    /// usage is unchanged in that case.
    pub fn consume(&mut self, count: usize, user: &str) -> Result<(), CoreError> {
        if let Err(err) = self.ensure_available(count) {
            let available = self.available();
            tracing::warn!(user, requested = count, available, "not enough licenses");
            return Err(err);
        }
        self.current_usage += count;
        tracing::info!(user, consumed = count, usage = self.current_usage, "consumed licenses");
        Ok(())
    }

    /// Return `count` licenses to the pool.
    ///
    /// Usage is floored at 0. Hitting the floor means the caller's
    /// accounting is off, which is logged but not an error.
    pub fn release(&mut self, count: usize, user: &str) {
        if count > self.current_usage {
            tracing::warn!(
                user,
                released = count,
                usage = self.current_usage,
                "release exceeds usage, clamping to 0"
            );
        }
        self.current_usage = self.current_usage.saturating_sub(count);
        tracing::info!(user, released = count, usage = self.current_usage, "released licenses");
    }
}
