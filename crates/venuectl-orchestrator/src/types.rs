use async_trait::async_trait;
use chrono::{DateTime, Utc};
use venuectl_commons::{Action, DeviceFamily, ErrorKind, Trigger};
use venuectl_retry::AttemptRecord;

/// Outcome of acting on a single device (spec §3). `family` is `None` only
/// when the device id didn't resolve against the registry at all.
#[derive(Debug, Clone)]
pub struct DeviceResult {
    pub device_id: String,
    pub device_name: String,
    pub ip: String,
    pub family: Option<DeviceFamily>,
    pub action: Action,
    pub success: bool,
    pub attempts: Vec<AttemptRecord>,
    pub total_elapsed_ms: u64,
    pub terminal_error: Option<ErrorKind>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl DeviceResult {
    pub fn not_found(device_id: impl Into<String>, action: Action) -> Self {
        let now = Utc::now();
        let device_id = device_id.into();
        Self {
            device_name: device_id.clone(),
            device_id,
            ip: String::new(),
            family: None,
            action,
            success: false,
            attempts: Vec::new(),
            total_elapsed_ms: 0,
            terminal_error: Some(ErrorKind::NotFound),
            start_time: now,
            end_time: now,
        }
    }

    pub fn retried(&self) -> bool {
        self.attempts.len() > 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Success,
    Partial,
    Failed,
}

impl ReportStatus {
    /// `success` at 100%, `partial` at >= 80%, `failed` otherwise (spec §3).
    pub fn from_success_rate(successful: usize, total: usize) -> Self {
        if total == 0 {
            return ReportStatus::Success;
        }
        let rate = successful as f64 / total as f64;
        if rate >= 1.0 {
            ReportStatus::Success
        } else if rate >= 0.8 {
            ReportStatus::Partial
        } else {
            ReportStatus::Failed
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub trigger: Trigger,
    pub results: Vec<DeviceResult>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub devices_with_retries: Vec<String>,
    pub retry_total: u32,
    pub status: ReportStatus,
}

impl ExecutionReport {
    pub fn aggregate(action: Action, trigger: Trigger, results: Vec<DeviceResult>) -> Self {
        let total = results.len();
        let successful = results.iter().filter(|r| r.success).count();
        let failed = total - successful;
        let devices_with_retries: Vec<String> = results
            .iter()
            .filter(|r| r.retried())
            .map(|r| r.device_id.clone())
            .collect();
        let retry_total: u32 = results
            .iter()
            .map(|r| r.attempts.len().saturating_sub(1) as u32)
            .sum();
        let status = ReportStatus::from_success_rate(successful, total);

        Self {
            timestamp: Utc::now(),
            action,
            trigger,
            results,
            total,
            successful,
            failed,
            devices_with_retries,
            retry_total,
            status,
        }
    }
}

/// One record per device attempt (spec §6 persisted state). The core treats
/// the sink abstractly — no concrete file/db-backed implementation ships
/// with this crate.
#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
    pub action: Action,
    pub trigger: Trigger,
    pub success: bool,
    pub attempt_number: u32,
    pub elapsed_ms: u64,
    pub error_message: Option<String>,
}

#[async_trait]
pub trait ActionLogSink: Send + Sync {
    async fn append(&self, entry: ActionLogEntry);
}
