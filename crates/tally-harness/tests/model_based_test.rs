//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! `DeviceManager` behaves identically to the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!    ModelRegistry   DeviceManager    Compare
//!     (reference)       (real)        Results
//! ```

use proptest::prelude::*;
use tally_core::{CoreError, DeviceManager};
use tally_harness::{
    ModelDeviceId, ModelRegistry, ObservableState, Operation, OperationError, OperationResult,
    SimEnv,
    model::operation::{device, device_id},
};
use tokio::runtime::Runtime;

/// Real system wrapper that mirrors ModelRegistry's interface.
struct RealWorld {
    manager: DeviceManager<SimEnv>,
    runtime: Runtime,
}

impl RealWorld {
    fn new(capacity: usize) -> Self {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime");
        let manager = DeviceManager::new(SimEnv::new(), capacity).expect("positive capacity");
        Self { manager, runtime }
    }

    fn apply(&self, op: &Operation) -> OperationResult {
        let user = op.user_name();
        let result = self.runtime.block_on(async {
            match op {
                Operation::Add { devices, .. } => {
                    let devices =
                        devices.iter().map(|(id, enabled)| device(*id, *enabled)).collect();
                    self.manager.add_devices(devices, &user).await
                },
                Operation::Enable { ids, .. } => {
                    self.manager.enable_devices(&real_ids(ids), &user).await
                },
                Operation::Disable { ids, .. } => {
                    Ok(self.manager.disable_devices(&real_ids(ids), &user).await)
                },
                Operation::Delete { ids, .. } => {
                    Ok(self.manager.delete_devices(&real_ids(ids), &user).await)
                },
            }
        });

        match result {
            Ok(outcome) => OperationResult::Ok {
                applied: outcome.applied.iter().map(model_id).collect(),
                usage: outcome.license_usage,
            },
            Err(CoreError::InsufficientCapacity { requested, available }) => {
                let err = OperationError::InsufficientCapacity { requested, available };
                OperationResult::Error(err)
            },
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    fn observable_state(&self) -> ObservableState {
        self.runtime.block_on(async {
            let devices = self
                .manager
                .get_all_devices()
                .await
                .iter()
                .map(|d| (model_id(&d.device_id), d.enabled))
                .collect();
            ObservableState { devices, usage: self.manager.get_license_usage().await }
        })
    }
}

fn real_ids(ids: &[ModelDeviceId]) -> Vec<tally_core::DeviceId> {
    ids.iter().copied().map(device_id).collect()
}

fn model_id(id: &tally_core::DeviceId) -> ModelDeviceId {
    id.as_str().trim_start_matches('D').parse().expect("ids come from the model")
}

/// Strategy for generating device ids from a small space so operations collide.
fn id_strategy() -> impl Strategy<Value = ModelDeviceId> + Clone {
    0..12u8
}

/// Strategy for generating operations.
fn operation_strategy() -> impl Strategy<Value = Operation> {
    let user = any::<u8>();
    let ids = prop::collection::vec(id_strategy(), 0..6);
    let devices = prop::collection::vec((id_strategy(), any::<bool>()), 0..6);

    prop_oneof![
        // Weight towards operations that move licenses
        3 => (user.clone(), devices).prop_map(|(user, devices)| Operation::Add { user, devices }),
        4 => (user.clone(), ids.clone()).prop_map(|(user, ids)| Operation::Enable { user, ids }),
        2 => (user.clone(), ids.clone()).prop_map(|(user, ids)| Operation::Disable { user, ids }),
        1 => (user, ids).prop_map(|(user, ids)| Operation::Delete { user, ids }),
    ]
}

proptest! {
    /// Verify that operation results match between model and real implementation.
    ///
    /// This is the core model-based test. It generates random operation sequences
    /// and asserts that both implementations return the same results and expose
    /// the same state after every step.
    #[test]
    fn prop_model_matches_real(
        capacity in 1..8usize,
        ops in prop::collection::vec(operation_strategy(), 0..60)
    ) {
        let mut model = ModelRegistry::new(capacity);
        let real = RealWorld::new(capacity);

        for (i, op) in ops.iter().enumerate() {
            let model_result = model.apply(op);
            let real_result = real.apply(op);

            prop_assert_eq!(
                &model_result,
                &real_result,
                "Divergence at operation {}: {:?}",
                i, op
            );
            prop_assert_eq!(model.observable_state(), real.observable_state());
        }
    }

    /// License usage equals the enabled-device count after every operation.
    #[test]
    fn prop_license_conservation(
        capacity in 1..8usize,
        ops in prop::collection::vec(operation_strategy(), 0..80)
    ) {
        let real = RealWorld::new(capacity);

        for op in &ops {
            let _ = real.apply(op);
            let state = real.observable_state();

            // PROPERTY: Conservation
            prop_assert_eq!(state.usage, state.enabled_count(), "after {:?}", op);
            // PROPERTY: Capacity is never exceeded
            prop_assert!(state.usage <= capacity);
        }
    }

    /// A rejected request leaves state untouched.
    #[test]
    fn prop_rejection_is_all_or_nothing(
        capacity in 1..8usize,
        ops in prop::collection::vec(operation_strategy(), 0..60)
    ) {
        let real = RealWorld::new(capacity);

        for op in &ops {
            let before = real.observable_state();
            if real.apply(op).is_err() {
                prop_assert_eq!(before, real.observable_state(), "rejected {:?} mutated state", op);
            }
        }
    }

    /// Disable and delete of ids never registered are silent no-ops.
    #[test]
    fn prop_unknown_ids_are_skipped(
        known in prop::collection::vec((0..6u8, any::<bool>()), 0..6),
        unknown in prop::collection::vec(6..12u8, 1..6)
    ) {
        let real = RealWorld::new(8);
        let _ = real.apply(&Operation::Add { user: 0, devices: known });
        let before = real.observable_state();

        let disabled = real.apply(&Operation::Disable { user: 1, ids: unknown.clone() });
        let deleted = real.apply(&Operation::Delete { user: 1, ids: unknown });

        prop_assert_eq!(disabled, OperationResult::Ok { applied: vec![], usage: before.usage });
        prop_assert_eq!(deleted, OperationResult::Ok { applied: vec![], usage: before.usage });
        prop_assert_eq!(before, real.observable_state());
    }
}

#[test]
fn byte_driven_sequences_match_model() {
    let corpus: [&[u8]; 3] = [
        b"tally",
        &[0, 3, 1, 7, 1, 0, 4, 2, 9, 9, 1, 2, 3, 0, 0, 0, 1, 5],
        &[255; 64],
    ];

    for bytes in corpus {
        let mut model = ModelRegistry::new(4);
        let real = RealWorld::new(4);

        for op in Operation::sequence_from_bytes(bytes) {
            assert_eq!(model.apply(&op), real.apply(&op), "divergence on {op:?}");
        }
        assert_eq!(model.observable_state(), real.observable_state());
    }
}

#[cfg(test)]
mod smoke_tests {
    use super::*;

    /// Capacity 10; two enabled from the first batch; a nine-device enable
    /// against eight free licenses fails in full; disabling and deleting
    /// everything returns usage to zero.
    #[test]
    fn model_and_real_walk_the_lifecycle() {
        let mut model = ModelRegistry::new(10);
        let real = RealWorld::new(10);
        let mut both = |op: Operation| {
            let expected = model.apply(&op);
            assert_eq!(expected, real.apply(&op));
            expected
        };

        let seeded =
            both(Operation::Add { user: 0, devices: vec![(1, true), (2, true), (3, false)] });
        assert_eq!(seeded, OperationResult::Ok { applied: vec![1, 2, 3], usage: 2 });

        both(Operation::Add { user: 0, devices: (4..=11).map(|id| (id, false)).collect() });

        let rejected = both(Operation::Enable { user: 1, ids: (3..=11).collect() });
        assert_eq!(
            rejected,
            OperationResult::Error(OperationError::InsufficientCapacity {
                requested: 9,
                available: 8
            })
        );

        let disabled = both(Operation::Disable { user: 2, ids: vec![1, 2] });
        assert_eq!(disabled, OperationResult::Ok { applied: vec![1, 2], usage: 0 });

        let deleted = both(Operation::Delete { user: 3, ids: (1..=11).collect() });
        assert_eq!(deleted, OperationResult::Ok { applied: (1..=11).collect(), usage: 0 });

        assert!(model.observable_state().devices.is_empty());
    }
}
