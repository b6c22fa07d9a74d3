use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate};
use log::{info, warn};
use venuectl_commons::{Action, RawConfig, Trigger};
use venuectl_monitor::{Monitor, MonitorConfig};
use venuectl_net::{Prober, ProberConfig};
use venuectl_orchestrator::{Adapters, Orchestrator, ReportStatus};
use venuectl_protocols::AdapterCapabilities;
use venuectl_registry::Registry;
use venuectl_reports::ExecutionRender;
use venuectl_retry::RetryPolicy;
use venuectl_scheduler::{parse_weekday, LoggingListener, ScheduleState, Scheduler, SchedulerActions};

/// Orchestrator batches default to this many concurrent devices unless a
/// group overrides it serially (spec §5). Not presently a config-file knob.
const DEFAULT_PARALLEL_LIMIT: usize = 10;

/// Every long-lived component, constructed once and owned by `main` (spec
/// §9 "global singletons -> explicit construction"). No part of this crate
/// reaches for a process-wide static.
pub struct System {
    pub registry: Arc<Registry>,
    pub orchestrator: Arc<Orchestrator>,
    pub monitor: Arc<Monitor>,
    pub scheduler: Arc<Scheduler<CoreActions>>,
}

impl System {
    pub fn build(raw: &RawConfig) -> anyhow::Result<Self> {
        let registry = Arc::new(Registry::from_config(raw));

        let prober = Arc::new(Prober::new(ProberConfig::default()));
        let adapters = Adapters::new(prober.clone());
        let retry_policy = build_retry_policy(raw);
        let orchestrator = Arc::new(Orchestrator::new(
            registry.clone(),
            adapters,
            AdapterCapabilities::default(),
            retry_policy,
            DEFAULT_PARALLEL_LIMIT,
            None,
        ));

        let monitor_config = build_monitor_config(raw);
        let monitor = Arc::new(Monitor::new(registry.clone(), prober, monitor_config));

        let schedule_state = build_schedule_state(raw).context("building schedule from config")?;
        let misfire_grace = ChronoDuration::seconds(raw.schedule.misfire_grace_sec as i64);
        let status_interval = std::time::Duration::from_secs(raw.monitoring.status_check_interval_sec);
        let actions = Arc::new(CoreActions { orchestrator: orchestrator.clone(), monitor: monitor.clone() });
        let scheduler = Arc::new(Scheduler::new(
            schedule_state,
            raw.monitoring.enabled,
            status_interval,
            misfire_grace,
            actions,
            Arc::new(LoggingListener),
        ));

        Ok(Self { registry, orchestrator, monitor, scheduler })
    }
}

fn build_retry_policy(raw: &RawConfig) -> RetryPolicy {
    let base_delay_ms = (raw.retry_policy.base_interval_sec * 1000.0).round() as u64;
    let max_delay_ms = raw
        .retry_policy
        .max_delay_sec
        .map(|secs| (secs * 1000.0).round() as u64)
        .unwrap_or_else(|| RetryPolicy::default().max_delay_ms);
    RetryPolicy::new(raw.retry_policy.max_attempts, base_delay_ms, raw.retry_policy.backoff_multiplier, max_delay_ms)
}

fn build_monitor_config(raw: &RawConfig) -> MonitorConfig {
    MonitorConfig {
        sweep_interval: std::time::Duration::from_secs(raw.monitoring.status_check_interval_sec),
        alert_threshold: raw.monitoring.alert_threshold,
        consecutive_failures_alert: raw.monitoring.consecutive_failures_alert,
        multi_device_alert_count: raw.monitoring.multi_device_alert_count as u32,
        network_issue_threshold: raw.monitoring.network_issue_threshold as u32,
    }
}

fn build_schedule_state(raw: &RawConfig) -> anyhow::Result<ScheduleState> {
    let timezone: chrono_tz::Tz = raw
        .schedule
        .timezone
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown IANA timezone '{}'", raw.schedule.timezone))?;

    let mut allowed_days = HashSet::new();
    for raw_day in &raw.schedule.days {
        match parse_weekday(raw_day) {
            Some(day) => {
                allowed_days.insert(day);
            }
            None => warn!("ignoring unrecognised schedule day '{raw_day}'"),
        }
    }

    let mut excluded_dates = HashSet::new();
    for raw_date in &raw.schedule.exclude_dates {
        match NaiveDate::parse_from_str(raw_date, "%Y-%m-%d") {
            Ok(date) => {
                excluded_dates.insert(date);
            }
            Err(_) => warn!("ignoring unparseable exclude_dates entry '{raw_date}'"),
        }
    }

    Ok(ScheduleState {
        on_time: raw.schedule.on_time.clone(),
        off_time: raw.schedule.off_time.clone(),
        timezone,
        allowed_days,
        excluded_dates,
    })
}

/// Binds the scheduler's three named jobs to the orchestrator/monitor (spec
/// §4.G/§4.H). The `status_check` job is the sole driver of monitor sweeps
/// in this composition root — `Monitor::run`'s own internal ticker stays
/// available as a library entry point but isn't started here, so sweeps
/// never come from two independent cadences at once.
pub struct CoreActions {
    orchestrator: Arc<Orchestrator>,
    monitor: Arc<Monitor>,
}

#[async_trait]
impl SchedulerActions for CoreActions {
    async fn turn_on_all(&self) -> Result<(), String> {
        let cancel = tokio_util::sync::CancellationToken::new();
        let report = self.orchestrator.act_on_all(Action::TurnOn, Trigger::Scheduled, &cancel).await;
        info!("{}", report.to_text());
        if report.status == ReportStatus::Failed {
            Err(format!("{}/{} devices failed to turn on", report.failed, report.total))
        } else {
            Ok(())
        }
    }

    async fn turn_off_all(&self) -> Result<(), String> {
        let cancel = tokio_util::sync::CancellationToken::new();
        let report = self.orchestrator.act_on_all(Action::TurnOff, Trigger::Scheduled, &cancel).await;
        info!("{}", report.to_text());
        if report.status == ReportStatus::Failed {
            Err(format!("{}/{} devices failed to turn off", report.failed, report.total))
        } else {
            Ok(())
        }
    }

    async fn status_check(&self) -> Result<(), String> {
        self.monitor.sweep().await;
        Ok(())
    }
}
