use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use venuectl_commons::{DeviceFamily, RawConfig};

use crate::error::{RegistryError, RegistryResult};
use crate::loader::build_snapshot;
use crate::model::{Device, Group};

struct Snapshot {
    devices: HashMap<String, Device>,
    groups: HashMap<String, Group>,
}

/// In-memory device/group catalogue (spec §4.D). `reload` swaps the whole
/// snapshot atomically via `ArcSwap` — a lookup in flight against the old
/// snapshot completes entirely against the old snapshot, never a mix of
/// old and new (the registry-atomicity invariant in spec §8).
pub struct Registry {
    snapshot: ArcSwap<Snapshot>,
}

impl Registry {
    pub fn from_config(raw: &RawConfig) -> Self {
        let (devices, groups) = build_snapshot(raw);
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot { devices, groups }),
        }
    }

    /// Atomically replaces the snapshot with one parsed from `raw`.
    pub fn reload(&self, raw: &RawConfig) {
        let (devices, groups) = build_snapshot(raw);
        self.snapshot.store(Arc::new(Snapshot { devices, groups }));
    }

    pub fn get_device(&self, id: &str) -> Option<Device> {
        self.snapshot.load().devices.get(id).cloned()
    }

    /// Same lookup as `get_device`, but for callers that want the
    /// structured `RegistryError::DeviceNotFound` instead of plain `None`
    /// (spec §4.D).
    pub fn require_device(&self, id: &str) -> RegistryResult<Device> {
        self.get_device(id).ok_or_else(|| RegistryError::DeviceNotFound(id.to_string()))
    }

    /// Same lookup as `group`, but for callers that want the structured
    /// `RegistryError::GroupNotFound` instead of plain `None`.
    pub fn require_group(&self, group_id: &str) -> RegistryResult<Group> {
        self.group(group_id).ok_or_else(|| RegistryError::GroupNotFound(group_id.to_string()))
    }

    pub fn list(&self, enabled_only: bool) -> Vec<Device> {
        self.snapshot
            .load()
            .devices
            .values()
            .filter(|d| !enabled_only || d.enabled)
            .cloned()
            .collect()
    }

    pub fn by_group(&self, group_id: &str, enabled_only: bool) -> Vec<Device> {
        self.snapshot
            .load()
            .devices
            .values()
            .filter(|d| d.group == group_id)
            .filter(|d| !enabled_only || d.enabled)
            .cloned()
            .collect()
    }

    pub fn by_family(&self, family: DeviceFamily, enabled_only: bool) -> Vec<Device> {
        self.snapshot
            .load()
            .devices
            .values()
            .filter(|d| d.family == family)
            .filter(|d| !enabled_only || d.enabled)
            .cloned()
            .collect()
    }

    pub fn group(&self, group_id: &str) -> Option<Group> {
        self.snapshot.load().groups.get(group_id).cloned()
    }

    /// Every group, ascending by priority (lower fires first, spec §3/§4.E).
    pub fn groups_sorted_by_priority(&self) -> Vec<Group> {
        let snapshot = self.snapshot.load();
        let mut groups: Vec<Group> = snapshot.groups.values().cloned().collect();
        groups.sort_by_key(|g| g.priority);
        groups
    }

    pub fn device_count(&self) -> usize {
        self.snapshot.load().devices.len()
    }
}
