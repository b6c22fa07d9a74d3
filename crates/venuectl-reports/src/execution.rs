use std::fmt::Write as _;

use venuectl_commons::ErrorKind;
use venuectl_orchestrator::{DeviceResult, ExecutionReport, ReportStatus};

/// A structured view of an `ExecutionReport`, the parallel form to
/// `ExecutionRender::to_text` (spec §4.H). Plain data, easy to hand to a
/// `serde_json::to_string` caller or a template engine without this crate
/// depending on either.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    pub action: String,
    pub trigger: String,
    pub status: ReportStatus,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub retry_total: u32,
    pub devices_with_retries: Vec<String>,
    pub failed_device_ids: Vec<String>,
}

/// Renders an `ExecutionReport` to a text form and a structured summary.
/// Implemented as an extension trait rather than a wrapper type so callers
/// can keep passing around the plain `ExecutionReport` the Orchestrator
/// already hands them.
pub trait ExecutionRender {
    fn to_text(&self) -> String;
    fn to_summary(&self) -> ExecutionSummary;
}

impl ExecutionRender for ExecutionReport {
    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "execution report: {} / {} at {}",
            self.action,
            self.trigger,
            self.timestamp.to_rfc3339()
        );
        let _ = writeln!(out, "status: {:?} ({}/{} succeeded, {} retried)", self.status, self.successful, self.total, self.retry_total);
        out.push_str("devices:\n");
        for result in &self.results {
            let _ = writeln!(
                out,
                "  {} ({}) [{}]: {} in {}ms{}",
                result.device_name,
                result.device_id,
                result.ip,
                if result.success { "ok" } else { "failed" },
                result.total_elapsed_ms,
                device_error_suffix(result),
            );
        }

        let failed: Vec<&DeviceResult> = self.results.iter().filter(|r| !r.success).collect();
        if !failed.is_empty() {
            out.push_str("recovery actions:\n");
            for result in failed {
                let _ = writeln!(
                    out,
                    "  check '{}' ({}) — {}",
                    result.device_name,
                    result.device_id,
                    result.terminal_error.as_ref().map(describe_error).unwrap_or("unknown failure"),
                );
            }
        }
        out
    }

    fn to_summary(&self) -> ExecutionSummary {
        ExecutionSummary {
            action: self.action.to_string(),
            trigger: self.trigger.to_string(),
            status: self.status,
            total: self.total,
            successful: self.successful,
            failed: self.failed,
            retry_total: self.retry_total,
            devices_with_retries: self.devices_with_retries.clone(),
            failed_device_ids: self.results.iter().filter(|r| !r.success).map(|r| r.device_id.clone()).collect(),
        }
    }
}

fn device_error_suffix(result: &DeviceResult) -> String {
    match &result.terminal_error {
        Some(kind) => format!(" ({})", describe_error(kind)),
        None => String::new(),
    }
}

fn describe_error(kind: &ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "device not found in registry",
        ErrorKind::Timeout => "timed out",
        ErrorKind::ConnectionRefused => "connection refused",
        ErrorKind::NetworkUnreachable => "network unreachable",
        ErrorKind::EmptyResponse => "empty response",
        ErrorKind::ProtocolError => "protocol error",
        ErrorKind::RemoteError { .. } => "remote error",
        ErrorKind::Cancelled => "cancelled",
        ErrorKind::Internal => "internal error",
        ErrorKind::Unknown => "unknown error",
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use venuectl_commons::{Action, Trigger};

    use super::*;

    fn ok_result(id: &str) -> DeviceResult {
        let now = Utc::now();
        DeviceResult {
            device_id: id.to_string(),
            device_name: format!("device-{id}"),
            ip: "10.0.0.1".to_string(),
            family: None,
            action: Action::TurnOn,
            success: true,
            attempts: Vec::new(),
            total_elapsed_ms: 12,
            terminal_error: None,
            start_time: now,
            end_time: now,
        }
    }

    fn failed_result(id: &str) -> DeviceResult {
        let mut result = ok_result(id);
        result.success = false;
        result.terminal_error = Some(ErrorKind::Timeout);
        result
    }

    #[test]
    fn to_text_includes_recovery_actions_only_for_failures() {
        let report = ExecutionReport::aggregate(Action::TurnOn, Trigger::Manual, vec![ok_result("a"), failed_result("b")]);
        let text = report.to_text();
        assert!(text.contains("recovery actions:"));
        assert!(text.contains("device-b"));
        assert!(!text.contains("check 'device-a'"));
    }

    #[test]
    fn to_text_omits_recovery_section_when_all_succeed() {
        let report = ExecutionReport::aggregate(Action::TurnOn, Trigger::Manual, vec![ok_result("a"), ok_result("b")]);
        assert!(!report.to_text().contains("recovery actions:"));
    }

    #[test]
    fn to_summary_collects_failed_device_ids() {
        let report = ExecutionReport::aggregate(Action::TurnOn, Trigger::Scheduled, vec![ok_result("a"), failed_result("b"), failed_result("c")]);
        let summary = report.to_summary();
        assert_eq!(summary.failed_device_ids, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(summary.failed, 2);
    }
}
