//! Device records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique device identifier (registry key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A device that may hold one license while enabled.
///
/// Once handed to the registry a device is owned by it; callers only ever
/// get snapshots back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Registry key.
    pub device_id: DeviceId,
    /// Display name.
    pub name: String,
    /// Whether the device currently holds a license.
    pub enabled: bool,
}

impl Device {
    /// Create a device record.
    pub fn new(device_id: impl Into<DeviceId>, name: impl Into<String>, enabled: bool) -> Self {
        Self { device_id: device_id.into(), name: name.into(), enabled }
    }
}
