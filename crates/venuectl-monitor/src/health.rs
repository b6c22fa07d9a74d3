use chrono::Utc;
use dashmap::DashMap;

use crate::types::{HealthRecord, HealthState};

/// Health Records are monitor-owned (spec §3): single writer (the sweep
/// driver), many readers. A `DashMap` gives every reader a consistent
/// per-device record without a single global lock serialising all lookups.
#[derive(Default)]
pub struct HealthStore {
    records: DashMap<String, HealthRecord>,
}

impl HealthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, device_id: &str) -> Option<HealthRecord> {
        self.records.get(device_id).map(|r| r.clone())
    }

    pub fn snapshot(&self) -> Vec<(String, HealthRecord)> {
        self.records.iter().map(|e| (e.key().clone(), e.value().clone())).collect()
    }

    /// Records a probe outcome for `device_id`, creating the record on first
    /// probe. `last_online` is only ever moved forward on success — a
    /// failure preserves whatever the device's last confirmed online time
    /// was (spec §4.F).
    pub fn record(&self, device_id: &str, state: HealthState, error: Option<String>) {
        let now = Utc::now();
        self.records
            .entry(device_id.to_string())
            .and_modify(|record| {
                if state == HealthState::Online {
                    record.consecutive_failures = 0;
                    record.last_online = Some(now);
                    record.last_error = None;
                } else {
                    record.consecutive_failures += 1;
                    record.last_error = error.clone();
                }
                record.state = state;
                record.last_check = now;
            })
            .or_insert_with(|| HealthRecord {
                state,
                consecutive_failures: if state == HealthState::Online { 0 } else { 1 },
                last_online: if state == HealthState::Online { Some(now) } else { None },
                last_error: if state == HealthState::Online { None } else { error },
                last_check: now,
            });
    }

    /// Drops health records for devices no longer present in the registry's
    /// current snapshot (spec §3: "invalidated on registry reload"). Records
    /// for devices still present survive the reload untouched.
    pub fn retain_known(&self, known_device_ids: &[String]) {
        let known: std::collections::HashSet<&str> = known_device_ids.iter().map(String::as_str).collect();
        self.records.retain(|id, _| known.contains(id.as_str()));
    }

    pub fn online_device_ids(&self) -> std::collections::HashSet<String> {
        self.records
            .iter()
            .filter(|e| e.value().state.counts_as_online())
            .map(|e| e.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_probe_creates_record() {
        let store = HealthStore::new();
        store.record("d1", HealthState::Online, None);
        let record = store.get("d1").unwrap();
        assert_eq!(record.state, HealthState::Online);
        assert_eq!(record.consecutive_failures, 0);
        assert!(record.last_online.is_some());
    }

    #[test]
    fn failure_increments_consecutive_failures_and_preserves_last_online() {
        let store = HealthStore::new();
        store.record("d1", HealthState::Online, None);
        let last_online = store.get("d1").unwrap().last_online;

        store.record("d1", HealthState::Offline, Some("timeout".to_string()));
        let record = store.get("d1").unwrap();
        assert_eq!(record.state, HealthState::Offline);
        assert_eq!(record.consecutive_failures, 1);
        assert_eq!(record.last_online, last_online);
        assert_eq!(record.last_error.as_deref(), Some("timeout"));
    }

    #[test]
    fn success_after_failures_resets_streak() {
        let store = HealthStore::new();
        store.record("d1", HealthState::Offline, Some("x".to_string()));
        store.record("d1", HealthState::Offline, Some("x".to_string()));
        store.record("d1", HealthState::Online, None);
        let record = store.get("d1").unwrap();
        assert_eq!(record.consecutive_failures, 0);
        assert!(record.last_error.is_none());
    }

    #[test]
    fn retain_known_drops_stale_records() {
        let store = HealthStore::new();
        store.record("keep", HealthState::Online, None);
        store.record("drop", HealthState::Online, None);
        store.retain_known(&["keep".to_string()]);
        assert!(store.get("keep").is_some());
        assert!(store.get("drop").is_none());
    }
}
