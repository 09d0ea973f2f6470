//! Reference model for model-based testing.
//!
//! The model is a deliberately naive registry: license usage is not tracked
//! at all, it is recomputed from the enabled devices on every query. That
//! makes conservation hold by construction, so any divergence from the real
//! `DeviceManager` points at the real accounting.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Sequential: No locks, operations apply one at a time
//! - Deterministic: Same inputs produce same outputs

pub mod operation;
mod registry;

pub use operation::{ModelDeviceId, Operation, OperationError, OperationResult, UserId};
pub use registry::{ModelRegistry, ObservableState};
