//! Operations for model-based testing.
//!
//! Operations represent every mutation of the device core. They are
//! generated by proptest (or decoded from raw bytes via `arbitrary`) and
//! applied to both the model and the real implementation.

use arbitrary::{Arbitrary, Unstructured};
use tally_core::{Device, DeviceId};

/// Device identifier (u8 keeps collisions between operations likely).
pub type ModelDeviceId = u8;

/// Acting user (log attribution only).
pub type UserId = u8;

/// Operations that can be applied to the device core.
#[derive(Debug, Clone, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Register devices; `(id, enabled)` pairs, last one wins per id.
    Add {
        /// Acting user.
        user: UserId,
        /// Devices to insert.
        devices: Vec<(ModelDeviceId, bool)>,
    },

    /// Enable known, disabled devices.
    Enable {
        /// Acting user.
        user: UserId,
        /// Target ids.
        ids: Vec<ModelDeviceId>,
    },

    /// Disable known, enabled devices.
    Disable {
        /// Acting user.
        user: UserId,
        /// Target ids.
        ids: Vec<ModelDeviceId>,
    },

    /// Remove devices.
    Delete {
        /// Acting user.
        user: UserId,
        /// Target ids.
        ids: Vec<ModelDeviceId>,
    },
}

impl Operation {
    /// Decode as many operations as `bytes` allows.
    ///
    /// Useful for replaying a fuzzer corpus entry as an operation sequence.
    pub fn sequence_from_bytes(bytes: &[u8]) -> Vec<Self> {
        let mut input = Unstructured::new(bytes);
        let mut ops = Vec::new();
        while !input.is_empty() {
            let remaining = input.len();
            match Self::arbitrary(&mut input) {
                Ok(op) => ops.push(op),
                Err(_) => break,
            }
            if input.len() == remaining {
                break;
            }
        }
        ops
    }

    /// Actor name as passed to the real implementation.
    pub fn user_name(&self) -> String {
        let user = match self {
            Self::Add { user, .. }
            | Self::Enable { user, .. }
            | Self::Disable { user, .. }
            | Self::Delete { user, .. } => user,
        };
        format!("user-{user}")
    }
}

/// Map a model id to a real device id.
pub fn device_id(id: ModelDeviceId) -> DeviceId {
    DeviceId::new(format!("D{id:03}"))
}

/// Map a model `(id, enabled)` pair to a real device record.
pub fn device(id: ModelDeviceId, enabled: bool) -> Device {
    Device::new(device_id(id), format!("device-{id}"), enabled)
}

/// Result of applying an operation.
///
/// Used to compare model and real system behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation succeeded.
    Ok {
        /// Devices changed, in request order.
        applied: Vec<ModelDeviceId>,
        /// License usage afterwards.
        usage: usize,
    },

    /// Operation failed with expected error.
    Error(OperationError),
}

/// Expected errors that can occur during operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// Not enough free licenses.
    InsufficientCapacity {
        /// Licenses the request needed.
        requested: usize,
        /// Licenses free at the time.
        available: usize,
    },
}

impl OperationResult {
    /// Check if operation succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, OperationResult::Ok { .. })
    }

    /// Check if operation failed.
    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_ids_are_zero_padded() {
        assert_eq!(device_id(7).as_str(), "D007");
    }

    #[test]
    fn empty_bytes_decode_to_no_operations() {
        assert!(Operation::sequence_from_bytes(&[]).is_empty());
    }

    #[test]
    fn bytes_decode_to_operations() {
        let bytes: Vec<u8> = (0..=255).collect();
        assert!(!Operation::sequence_from_bytes(&bytes).is_empty());
    }
}
