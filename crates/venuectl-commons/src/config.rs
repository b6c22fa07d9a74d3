use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config_error::{ConfigError, ConfigResult};

fn default_true() -> bool {
    true
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_status_check_interval() -> u64 {
    300
}

fn default_alert_threshold() -> f64 {
    0.8
}

fn default_consecutive_failures_alert() -> u32 {
    2
}

fn default_multi_device_alert_count() -> usize {
    2
}

fn default_network_issue_threshold() -> usize {
    5
}

fn default_misfire_grace_sec() -> u64 {
    3600
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_timeout_sec() -> u64 {
    10
}

fn default_days() -> Vec<String> {
    vec![
        "mon".into(),
        "tue".into(),
        "wed".into(),
        "thu".into(),
        "fri".into(),
        "sat".into(),
        "sun".into(),
    ]
}

/// Raw JSON shape of the schedule block as read from disk, before it is
/// turned into a `ScheduleState` by the scheduler crate.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSchedule {
    pub on_time: String,
    pub off_time: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_days")]
    pub days: Vec<String>,
    #[serde(default)]
    pub exclude_dates: Vec<String>,
    #[serde(default = "default_misfire_grace_sec")]
    pub misfire_grace_sec: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRetryPolicy {
    pub max_attempts: u32,
    pub base_interval_sec: f64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    pub max_delay_sec: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMonitoring {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_status_check_interval")]
    pub status_check_interval_sec: u64,
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
    #[serde(default = "default_consecutive_failures_alert")]
    pub consecutive_failures_alert: u32,
    #[serde(default = "default_multi_device_alert_count")]
    pub multi_device_alert_count: usize,
    #[serde(default = "default_network_issue_threshold")]
    pub network_issue_threshold: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGroup {
    pub id: String,
    pub name: String,
    pub priority: i32,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDevice {
    pub id: String,
    pub name: String,
    pub group: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub ip: String,
    pub port: Option<u16>,
    pub mac: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,
}

/// The document shape of the on-disk JSON config file (spec §6), prior to
/// validation/normalisation. `RawDevice` entries that fail validation are
/// dropped individually by the registry loader, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    pub schedule: RawSchedule,
    pub retry_policy: RawRetryPolicy,
    #[serde(default = "default_monitoring")]
    pub monitoring: RawMonitoring,
    #[serde(default)]
    pub groups: Vec<RawGroup>,
    #[serde(default)]
    pub devices: Vec<RawDevice>,
}

fn default_monitoring() -> RawMonitoring {
    RawMonitoring {
        enabled: true,
        status_check_interval_sec: default_status_check_interval(),
        alert_threshold: default_alert_threshold(),
        consecutive_failures_alert: default_consecutive_failures_alert(),
        multi_device_alert_count: default_multi_device_alert_count(),
        network_issue_threshold: default_network_issue_threshold(),
    }
}

/// Reads and parses the config file at `path`. Does not validate individual
/// devices/groups; that happens when the registry builds its snapshot from
/// this document.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<RawConfig> {
    let path_ref = path.as_ref();
    let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
        path: path_ref.display().to_string(),
        source,
    })?;

    serde_json::from_str(&text).map_err(|source| ConfigError::InvalidJson {
        path: path_ref.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"
    {
        "schedule": {"on_time": "09:00", "off_time": "18:00"},
        "retry_policy": {"max_attempts": 3, "base_interval_sec": 30, "backoff_multiplier": 2},
        "monitoring": {"enabled": true},
        "groups": [{"id": "g1", "name": "Main Hall", "priority": 1, "parallel": true}],
        "devices": [
            {"id": "d1", "name": "Proj 1", "group": "g1", "type": "optoma_telnet", "ip": "192.168.1.10"}
        ]
    }
    "#;

    #[test]
    fn loads_and_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.schedule.timezone, "UTC");
        assert_eq!(config.schedule.days.len(), 7);
        assert_eq!(config.retry_policy.backoff_multiplier, 2.0);
        assert!(config.monitoring.enabled);
        assert_eq!(config.devices.len(), 1);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_config("/nonexistent/path/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_json_is_invalid_json_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson { .. }));
    }
}
