//! Startup data and the canned concurrent workload.

use tally_core::{Device, DeviceId};

use crate::request::DeviceRequest;

/// Actor used for startup seeding.
pub const SEED_USER: &str = "System";

/// Devices registered at startup.
pub fn initial_devices() -> Vec<Device> {
    vec![
        Device::new("D001", "Switch-1", true),
        Device::new("D002", "Router-1", false),
        Device::new("D003", "Camera-1", true),
    ]
}

/// Eight overlapping requests from seven users, submitted together.
///
/// Several ids (`D1`..`D4`) are not registered, which exercises the silent
/// skip on enable, disable and delete.
pub fn concurrent_requests() -> Vec<DeviceRequest> {
    let ids =
        |raw: &[&str]| -> Vec<DeviceId> { raw.iter().map(|id| DeviceId::from(*id)).collect() };

    vec![
        DeviceRequest::Add {
            devices: vec![
                Device::new("D10", "NewDevice-1", true),
                Device::new("D11", "NewDevice-2", false),
            ],
            user: "UserF".into(),
        },
        DeviceRequest::Enable { ids: ids(&["D1", "D2"]), user: "UserA".into() },
        DeviceRequest::Disable { ids: ids(&["D2"]), user: "UserB".into() },
        DeviceRequest::Delete { ids: ids(&["D3"]), user: "UserC".into() },
        DeviceRequest::Enable { ids: ids(&["D4"]), user: "UserD".into() },
        DeviceRequest::Disable { ids: ids(&["D1"]), user: "UserE".into() },
        DeviceRequest::Disable { ids: ids(&["D1"]), user: "UserE".into() },
        DeviceRequest::Add {
            devices: vec![
                Device::new("D12", "NewDevice-3", true),
                Device::new("D13", "NewDevice-4", false),
                Device::new("D14", "NewDevice-5", true),
            ],
            user: "UserG".into(),
        },
    ]
}
