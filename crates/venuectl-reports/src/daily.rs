use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::NaiveDate;
use venuectl_monitor::{Alert, AlertLevel, SweepReport};
use venuectl_orchestrator::ExecutionReport;

use crate::execution::ExecutionRender;
use crate::types::{AlertCounts, DayStatus, MonitoringSummary};

/// One calendar day's roll-up: the morning/evening executions (if any ran),
/// the day's monitoring samples, alert counts by level, and the union of
/// devices that failed either execution (spec §4.H).
#[derive(Debug, Clone)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub morning_execution: Option<ExecutionReport>,
    pub evening_execution: Option<ExecutionReport>,
    pub monitoring: MonitoringSummary,
    pub alert_counts: AlertCounts,
    pub failed_device_ids: Vec<String>,
    pub status: DayStatus,
}

impl DailyReport {
    /// Assembles a `DailyReport` from the day's raw inputs. `sweeps` and
    /// `alerts` should already be filtered to the calendar day being
    /// assembled — this function performs no date filtering of its own.
    pub fn assemble(
        date: NaiveDate,
        morning_execution: Option<ExecutionReport>,
        evening_execution: Option<ExecutionReport>,
        sweeps: &[SweepReport],
        alerts: &[Alert],
    ) -> Self {
        let mut failed: BTreeSet<String> = BTreeSet::new();
        if let Some(report) = &morning_execution {
            failed.extend(report.results.iter().filter(|r| !r.success).map(|r| r.device_id.clone()));
        }
        if let Some(report) = &evening_execution {
            failed.extend(report.results.iter().filter(|r| !r.success).map(|r| r.device_id.clone()));
        }
        let failed_device_ids: Vec<String> = failed.into_iter().collect();

        let rates: Vec<f64> = sweeps.iter().map(|s| s.online_rate).collect();
        let monitoring = MonitoringSummary::from_rates(&rates);

        let mut alert_counts = AlertCounts::default();
        for alert in alerts {
            match alert.level {
                AlertLevel::Info => alert_counts.info += 1,
                AlertLevel::Warning => alert_counts.warning += 1,
                AlertLevel::Critical => alert_counts.critical += 1,
                AlertLevel::Red => alert_counts.red += 1,
            }
        }

        let status = DayStatus::from_day(failed_device_ids.is_empty(), monitoring.min_online_rate);

        Self { date, morning_execution, evening_execution, monitoring, alert_counts, failed_device_ids, status }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "daily report for {}: {:?}", self.date, self.status);

        match &self.monitoring.min_online_rate {
            Some(min) => {
                let mean = self.monitoring.mean_online_rate.unwrap_or(*min);
                let _ = writeln!(out, "monitoring: {} sweeps, online rate min {:.0}% / mean {:.0}%", self.monitoring.sweep_count, min * 100.0, mean * 100.0);
            }
            None => out.push_str("monitoring: no sweeps recorded\n"),
        }

        let _ = writeln!(
            out,
            "alerts: info {} warning {} critical {} red {}",
            self.alert_counts.info, self.alert_counts.warning, self.alert_counts.critical, self.alert_counts.red
        );

        if self.failed_device_ids.is_empty() {
            out.push_str("no device failures today\n");
        } else {
            let _ = writeln!(out, "devices with failures: {}", self.failed_device_ids.join(", "));
        }

        if let Some(report) = &self.morning_execution {
            out.push_str("--- morning execution ---\n");
            out.push_str(&report.to_text());
        }
        if let Some(report) = &self.evening_execution {
            out.push_str("--- evening execution ---\n");
            out.push_str(&report.to_text());
        }
        out
    }
}
