//! Device requests as submitted by adapters.
//!
//! A request is the decoded form of one call into the device core, with
//! the acting user attached for log attribution.

use serde::Deserialize;
use tally_core::{BatchOutcome, CoreError, Device, DeviceId, DeviceManager, Environment};

/// One device operation with its actor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DeviceRequest {
    /// Register devices.
    Add {
        /// Devices to insert.
        devices: Vec<Device>,
        /// Acting user.
        user: String,
    },
    /// Enable known, disabled devices.
    Enable {
        /// Target ids.
        ids: Vec<DeviceId>,
        /// Acting user.
        user: String,
    },
    /// Disable known, enabled devices.
    Disable {
        /// Target ids.
        ids: Vec<DeviceId>,
        /// Acting user.
        user: String,
    },
    /// Remove devices.
    Delete {
        /// Target ids.
        ids: Vec<DeviceId>,
        /// Acting user.
        user: String,
    },
}

impl DeviceRequest {
    /// Acting user.
    pub fn user(&self) -> &str {
        match self {
            Self::Add { user, .. }
            | Self::Enable { user, .. }
            | Self::Disable { user, .. }
            | Self::Delete { user, .. } => user,
        }
    }

    /// Operation name for logs.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Enable { .. } => "enable",
            Self::Disable { .. } => "disable",
            Self::Delete { .. } => "delete",
        }
    }

    /// Run the request against `manager`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InsufficientCapacity` for add and enable requests
    /// that need more licenses than are free.
    pub async fn apply<E>(self, manager: &DeviceManager<E>) -> Result<BatchOutcome, CoreError>
    where
        E: Environment,
    {
        match self {
            Self::Add { devices, user } => manager.add_devices(devices, &user).await,
            Self::Enable { ids, user } => manager.enable_devices(&ids, &user).await,
            Self::Disable { ids, user } => Ok(manager.disable_devices(&ids, &user).await),
            Self::Delete { ids, user } => Ok(manager.delete_devices(&ids, &user).await),
        }
    }
}
