//! Deterministic test harness for Tally.
//!
//! Tokio-clock implementation of the Environment trait plus a reference
//! model of the device/license core.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the real
//! `DeviceManager`, and their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_env;

pub use model::{
    ModelDeviceId, ModelRegistry, ObservableState, Operation, OperationError, OperationResult,
    UserId,
};
pub use sim_env::SimEnv;
