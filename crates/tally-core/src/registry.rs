//! Device Manager
//!
//! Owns the device registry and the license ledger behind a single fair
//! mutex.
//!
//! ## Responsibilities
//!
//! - Registry: add, enable, disable and delete devices keyed by id
//! - Accounting: keep `current_usage` equal to the enabled-device count
//! - Capacity: reject requests that need more licenses than are free
//!
//! ## Design
//!
//! - One lock: every operation runs acquire, validate, mutate registry,
//!   adjust ledger, release. Capacity is checked before the first mutation,
//!   so a rejected request leaves no trace.
//! - No second lock: the ledger is only reachable through the guard.
//! - Silent skip: unknown ids in enable, disable and delete are reported in
//!   the outcome, never raised.
//! - Actor strings are log attribution only.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    device::{Device, DeviceId},
    env::Environment,
    error::CoreError,
    license::LicenseLedger,
    lock::CriticalSection,
};

/// State guarded by the manager's lock.
#[derive(Debug)]
struct DeviceState {
    devices: HashMap<DeviceId, Device>,
    ledger: LicenseLedger,
}

impl DeviceState {
    fn enabled_count(&self) -> usize {
        self.devices.values().filter(|d| d.enabled).count()
    }

    fn summary(&self) -> StatusSummary {
        let enabled_count = self.enabled_count();
        StatusSummary {
            enabled_count,
            disabled_count: self.devices.len() - enabled_count,
            current_license_usage: self.ledger.current_usage(),
            total_capacity: self.ledger.total_capacity(),
        }
    }
}

/// Device and license counts taken at one consistent instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    /// Devices currently enabled.
    pub enabled_count: usize,
    /// Devices currently disabled.
    pub disabled_count: usize,
    /// Licenses in use.
    pub current_license_usage: usize,
    /// Size of the license pool.
    pub total_capacity: usize,
}

/// Result of a batch operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    /// Devices the operation changed, in request order.
    pub applied: Vec<DeviceId>,
    /// Requested ids that were unknown or already in the target state.
    pub skipped: Vec<DeviceId>,
    /// License usage right after the operation.
    pub license_usage: usize,
}

/// Registry of devices backed by a finite license pool.
pub struct DeviceManager<E>
where
    E: Environment,
{
    state: Mutex<DeviceState>,
    env: E,
}

impl<E> DeviceManager<E>
where
    E: Environment,
{
    /// Create an empty registry with a pool of `total_capacity` licenses.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidCapacity` if `total_capacity` is zero.
    pub fn new(env: E, total_capacity: usize) -> Result<Self, CoreError> {
        let ledger = LicenseLedger::new(total_capacity)?;
        Ok(Self { state: Mutex::new(DeviceState { devices: HashMap::new(), ledger }), env })
    }

    async fn enter(
        &self,
        op: &'static str,
        user: &str,
        count: usize,
    ) -> CriticalSection<'_, DeviceState, E> {
        tracing::debug!(user, op, count, "trying to acquire lock");
        CriticalSection::enter(&self.state, &self.env, op).await
    }

    /// Insert devices, consuming one license per enabled device.
    ///
    /// A device whose id is already registered replaces the existing entry;
    /// if the old entry was enabled its license is reused. Within one batch
    /// the last record for an id wins.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InsufficientCapacity` if the batch needs more
    /// licenses than are free. Nothing is inserted in that case.
    pub async fn add_devices(
        &self,
        devices: Vec<Device>,
        user: &str,
    ) -> Result<BatchOutcome, CoreError> {
        let mut section = self.enter("add_devices", user, devices.len()).await;
        let state = &mut *section;

        let mut batch: Vec<Device> = Vec::with_capacity(devices.len());
        let mut positions: HashMap<DeviceId, usize> = HashMap::new();
        for device in devices {
            match positions.get(&device.device_id) {
                Some(&i) => batch[i] = device,
                None => {
                    positions.insert(device.device_id.clone(), batch.len());
                    batch.push(device);
                },
            }
        }

        let acquired = batch.iter().filter(|d| d.enabled).count();
        let reused = batch
            .iter()
            .filter(|d| state.devices.get(&d.device_id).is_some_and(|existing| existing.enabled))
            .count();
        let required = acquired.saturating_sub(reused);

        if let Err(err) = state.ledger.ensure_available(required) {
            tracing::warn!(
                user,
                requested = required,
                available = state.ledger.available(),
                "not enough license slots"
            );
            return Err(err);
        }

        let mut applied = Vec::with_capacity(batch.len());
        for device in batch {
            let status = if device.enabled { "ENABLED" } else { "DISABLED" };
            tracing::info!(user, device_id = %device.device_id, status, "added device");
            applied.push(device.device_id.clone());
            state.devices.insert(device.device_id.clone(), device);
        }

        if required > 0 {
            state.ledger.consume(required, user)?;
        }
        let surplus = reused.saturating_sub(acquired);
        if surplus > 0 {
            state.ledger.release(surplus, user);
        }

        let license_usage = state.ledger.current_usage();
        Ok(BatchOutcome { applied, skipped: Vec::new(), license_usage })
    }

    /// Enable every known, currently disabled device in `ids`.
    ///
    /// Unknown and already enabled ids are skipped. Repeated ids count once.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InsufficientCapacity` if the eligible devices
    /// need more licenses than are free. No device is enabled in that case.
    pub async fn enable_devices(
        &self,
        ids: &[DeviceId],
        user: &str,
    ) -> Result<BatchOutcome, CoreError> {
        let mut section = self.enter("enable_devices", user, ids.len()).await;
        let state = &mut *section;

        let (eligible, skipped) = partition_ids(ids, |id| {
            state.devices.get(id).is_some_and(|d| !d.enabled)
        });

        let required = eligible.len();
        if let Err(err) = state.ledger.ensure_available(required) {
            tracing::warn!(
                user,
                requested = required,
                available = state.ledger.available(),
                "not enough license slots"
            );
            return Err(err);
        }

        for id in &eligible {
            if let Some(device) = state.devices.get_mut(id) {
                device.enabled = true;
            }
        }
        tracing::info!(user, count = required, ?eligible, "enabled devices");

        if required > 0 {
            state.ledger.consume(required, user)?;
        }

        Ok(BatchOutcome { applied: eligible, skipped, license_usage: state.ledger.current_usage() })
    }

    /// Disable every known, currently enabled device in `ids`.
    ///
    /// Never fails: unknown and already disabled ids are skipped.
    pub async fn disable_devices(&self, ids: &[DeviceId], user: &str) -> BatchOutcome {
        let mut section = self.enter("disable_devices", user, ids.len()).await;
        let state = &mut *section;

        let (eligible, skipped) = partition_ids(ids, |id| {
            state.devices.get(id).is_some_and(|d| d.enabled)
        });

        for id in &eligible {
            if let Some(device) = state.devices.get_mut(id) {
                device.enabled = false;
            }
        }
        tracing::info!(user, count = eligible.len(), ?eligible, "disabled devices");

        if !eligible.is_empty() {
            state.ledger.release(eligible.len(), user);
        }

        BatchOutcome { applied: eligible, skipped, license_usage: state.ledger.current_usage() }
    }

    /// Remove every known device in `ids`, releasing licenses held by the
    /// enabled ones.
    ///
    /// Never fails: unknown ids are skipped.
    pub async fn delete_devices(&self, ids: &[DeviceId], user: &str) -> BatchOutcome {
        let mut section = self.enter("delete_devices", user, ids.len()).await;
        let state = &mut *section;

        let mut applied = Vec::new();
        let mut skipped = Vec::new();
        let mut enabled_deleted = 0;

        for id in ids {
            match state.devices.remove(id) {
                Some(device) if device.enabled => {
                    enabled_deleted += 1;
                    tracing::info!(user, device_id = %id, "deleted enabled device");
                    applied.push(device.device_id);
                },
                Some(device) => {
                    tracing::info!(user, device_id = %id, "deleted disabled device");
                    applied.push(device.device_id);
                },
                None => {
                    tracing::warn!(user, device_id = %id, "device not found for deletion");
                    skipped.push(id.clone());
                },
            }
        }

        if enabled_deleted > 0 {
            state.ledger.release(enabled_deleted, user);
        }

        BatchOutcome { applied, skipped, license_usage: state.ledger.current_usage() }
    }

    /// Enabled, disabled and license counts from one critical section.
    pub async fn get_status_summary(&self) -> StatusSummary {
        let section = CriticalSection::enter(&self.state, &self.env, "get_status_summary").await;
        section.summary()
    }

    /// Licenses currently in use.
    pub async fn get_license_usage(&self) -> usize {
        let section = CriticalSection::enter(&self.state, &self.env, "get_license_usage").await;
        section.ledger.current_usage()
    }

    /// Snapshot of every device, sorted by id.
    ///
    /// Taken under the lock, so it never shows a half-applied batch. It is
    /// a copy: later operations do not show up in it.
    pub async fn get_all_devices(&self) -> Vec<Device> {
        let section = CriticalSection::enter(&self.state, &self.env, "get_all_devices").await;
        let mut devices: Vec<Device> = section.devices.values().cloned().collect();
        devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        devices
    }

    /// Snapshot of a single device.
    pub async fn get_device(&self, id: &DeviceId) -> Option<Device> {
        let section = CriticalSection::enter(&self.state, &self.env, "get_device").await;
        section.devices.get(id).cloned()
    }
}

/// Split `ids` into first occurrences that satisfy `eligible` and the rest.
fn partition_ids(
    ids: &[DeviceId],
    eligible: impl Fn(&DeviceId) -> bool,
) -> (Vec<DeviceId>, Vec<DeviceId>) {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    let mut skipped = Vec::new();

    for id in ids {
        if !seen.insert(id) {
            continue;
        }
        if eligible(id) {
            selected.push(id.clone());
        } else {
            skipped.push(id.clone());
        }
    }

    (selected, skipped)
}

impl<E> std::fmt::Debug for DeviceManager<E>
where
    E: Environment,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = f.debug_struct("DeviceManager");
        match self.state.try_lock() {
            Ok(state) => out.field("summary", &state.summary()),
            Err(_) => out.field("summary", &"<locked>"),
        };
        out.finish()
    }
}
