use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Online,
    Offline,
    Degraded,
}

impl HealthState {
    /// Degraded still counts as "up" for edge detection: the device answers
    /// ping, it has simply lost the service on its control port.
    pub fn counts_as_online(self) -> bool {
        !matches!(self, HealthState::Offline)
    }
}

#[derive(Debug, Clone)]
pub struct HealthRecord {
    pub state: HealthState,
    pub consecutive_failures: u32,
    pub last_online: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_check: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    DeviceRecovered,
    DeviceDown,
    MassFailure,
    NetworkIncident,
    ThresholdBreach,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub level: AlertLevel,
    pub kind: AlertKind,
    pub device_ids: Vec<String>,
    pub message: String,
}

/// Thresholds named in the config document's `monitoring` object (spec §6).
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub sweep_interval: Duration,
    pub alert_threshold: f64,
    pub consecutive_failures_alert: u32,
    pub multi_device_alert_count: u32,
    pub network_issue_threshold: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(300),
            alert_threshold: 0.8,
            consecutive_failures_alert: 2,
            multi_device_alert_count: 2,
            network_issue_threshold: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SweepReport {
    pub timestamp: DateTime<Utc>,
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub degraded: usize,
    pub online_rate: f64,
    pub newly_online: Vec<String>,
    pub newly_offline: Vec<String>,
    pub alerts: Vec<Alert>,
}
