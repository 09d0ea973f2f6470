//! Model registry - the oracle.
//!
//! Applies operations sequentially to a plain map. It is the oracle against
//! which the real `DeviceManager` is verified.

use std::collections::{BTreeMap, HashSet};

use super::operation::{ModelDeviceId, Operation, OperationError, OperationResult};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// `(id, enabled)` for every registered device, sorted by id.
    pub devices: Vec<(ModelDeviceId, bool)>,
    /// License usage.
    pub usage: usize,
}

impl ObservableState {
    /// Number of enabled devices.
    pub fn enabled_count(&self) -> usize {
        self.devices.iter().filter(|(_, enabled)| *enabled).count()
    }
}

/// Reference device registry with a license capacity.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    capacity: usize,
    devices: BTreeMap<ModelDeviceId, bool>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new(capacity: usize) -> Self {
        Self { capacity, devices: BTreeMap::new() }
    }

    /// License capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Usage, derived from the enabled devices.
    pub fn usage(&self) -> usize {
        self.devices.values().filter(|enabled| **enabled).count()
    }

    /// Apply an operation and return the result.
    ///
    /// The result should match the real implementation's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::Add { devices, .. } => self.apply_add(devices),
            Operation::Enable { ids, .. } => self.apply_enable(ids),
            Operation::Disable { ids, .. } => self.apply_disable(ids),
            Operation::Delete { ids, .. } => self.apply_delete(ids),
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            devices: self.devices.iter().map(|(id, enabled)| (*id, *enabled)).collect(),
            usage: self.usage(),
        }
    }

    fn ok(&self, applied: Vec<ModelDeviceId>) -> OperationResult {
        OperationResult::Ok { applied, usage: self.usage() }
    }

    fn capacity_error(&self, requested: usize) -> OperationResult {
        OperationResult::Error(OperationError::InsufficientCapacity {
            requested,
            available: self.capacity - self.usage(),
        })
    }

    /// Try the insert on a copy; keep it only if it fits.
    fn apply_add(&mut self, devices: &[(ModelDeviceId, bool)]) -> OperationResult {
        let mut next = self.devices.clone();
        let mut applied = Vec::new();
        for (id, enabled) in devices {
            next.insert(*id, *enabled);
            if !applied.contains(id) {
                applied.push(*id);
            }
        }

        let next_usage = next.values().filter(|enabled| **enabled).count();
        if next_usage > self.capacity {
            return self.capacity_error(next_usage - self.usage());
        }

        self.devices = next;
        self.ok(applied)
    }

    fn apply_enable(&mut self, ids: &[ModelDeviceId]) -> OperationResult {
        let eligible = first_occurrences(ids, |id| self.devices.get(id) == Some(&false));

        if self.usage() + eligible.len() > self.capacity {
            return self.capacity_error(eligible.len());
        }

        for id in &eligible {
            self.devices.insert(*id, true);
        }
        self.ok(eligible)
    }

    fn apply_disable(&mut self, ids: &[ModelDeviceId]) -> OperationResult {
        let eligible = first_occurrences(ids, |id| self.devices.get(id) == Some(&true));

        for id in &eligible {
            self.devices.insert(*id, false);
        }
        self.ok(eligible)
    }

    fn apply_delete(&mut self, ids: &[ModelDeviceId]) -> OperationResult {
        let mut applied = Vec::new();
        for id in ids {
            if self.devices.remove(id).is_some() {
                applied.push(*id);
            }
        }
        self.ok(applied)
    }
}

fn first_occurrences(
    ids: &[ModelDeviceId],
    eligible: impl Fn(&ModelDeviceId) -> bool,
) -> Vec<ModelDeviceId> {
    let mut seen = HashSet::new();
    ids.iter().filter(|id| seen.insert(**id)).filter(|id| eligible(*id)).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(devices: &[(ModelDeviceId, bool)]) -> Operation {
        Operation::Add { user: 0, devices: devices.to_vec() }
    }

    #[test]
    fn add_beyond_capacity_changes_nothing() {
        let mut model = ModelRegistry::new(1);

        let result = model.apply(&add(&[(1, true), (2, true)]));

        assert_eq!(
            result,
            OperationResult::Error(OperationError::InsufficientCapacity {
                requested: 2,
                available: 1
            })
        );
        assert!(model.observable_state().devices.is_empty());
    }

    #[test]
    fn enable_counts_repeated_ids_once() {
        let mut model = ModelRegistry::new(1);
        model.apply(&add(&[(1, false)]));

        let result = model.apply(&Operation::Enable { user: 0, ids: vec![1, 1] });

        assert_eq!(result, OperationResult::Ok { applied: vec![1], usage: 1 });
    }

    #[test]
    fn delete_unknown_is_ok() {
        let mut model = ModelRegistry::new(3);

        let result = model.apply(&Operation::Delete { user: 0, ids: vec![9] });

        assert_eq!(result, OperationResult::Ok { applied: vec![], usage: 0 });
    }
}
