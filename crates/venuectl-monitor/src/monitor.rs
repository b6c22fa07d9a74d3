use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use log::info;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use venuectl_net::Prober;
use venuectl_registry::Registry;

use crate::alerts::AlertRing;
use crate::health::HealthStore;
use crate::types::{Alert, AlertKind, AlertLevel, HealthState, MonitorConfig, SweepReport};

/// Periodic reachability sweep over the registry (spec §4.F). Owns the
/// Health Records and the Alert ring exclusively — nothing else is allowed
/// to write either.
pub struct Monitor {
    registry: Arc<Registry>,
    prober: Arc<Prober>,
    config: MonitorConfig,
    health: HealthStore,
    alerts: AlertRing,
    prior_online: Mutex<Option<HashSet<String>>>,
}

impl Monitor {
    pub fn new(registry: Arc<Registry>, prober: Arc<Prober>, config: MonitorConfig) -> Self {
        Self {
            registry,
            prober,
            config,
            health: HealthStore::new(),
            alerts: AlertRing::new(),
            prior_online: Mutex::new(None),
        }
    }

    pub fn health(&self) -> &HealthStore {
        &self.health
    }

    pub fn alerts(&self) -> &AlertRing {
        &self.alerts
    }

    /// One pass over every enabled device. Probes run concurrently; the
    /// first sweep after construction establishes the online-set baseline
    /// without emitting edge alerts (spec §4.F / §9 — avoids the
    /// spurious `device_recovered` burst a naive empty-prior-set would
    /// otherwise cause on cold start).
    pub async fn sweep(&self) -> SweepReport {
        let devices = self.registry.list(true);
        self.health.retain_known(&devices.iter().map(|d| d.id.clone()).collect::<Vec<_>>());

        let mut futs: FuturesUnordered<_> = devices
            .iter()
            .map(|device| {
                let prober = self.prober.clone();
                let id = device.id.clone();
                let ip = device.ip.clone();
                let port = device.port;
                async move {
                    let (state, message) = probe_device(&prober, &ip, port).await;
                    (id, state, message)
                }
            })
            .collect();

        let mut online = 0usize;
        let mut degraded = 0usize;
        let mut offline = 0usize;
        let mut current_online_set = HashSet::new();

        while let Some((device_id, state, message)) = futs.next().await {
            match state {
                HealthState::Online => online += 1,
                HealthState::Degraded => degraded += 1,
                HealthState::Offline => offline += 1,
            }
            if state.counts_as_online() {
                current_online_set.insert(device_id.clone());
            }
            let error = if state == HealthState::Online { None } else { Some(message) };
            self.health.record(&device_id, state, error);
        }

        let total = devices.len();
        let online_rate = if total == 0 { 1.0 } else { (online + degraded) as f64 / total as f64 };

        let mut prior_guard = self.prior_online.lock().await;
        let is_baseline_sweep = prior_guard.is_none();
        let prior = prior_guard.clone().unwrap_or_default();

        let (newly_online, newly_offline) = if is_baseline_sweep {
            (Vec::new(), Vec::new())
        } else {
            let newly_online: Vec<String> = current_online_set.difference(&prior).cloned().collect();
            let newly_offline: Vec<String> = prior.difference(&current_online_set).cloned().collect();
            (newly_online, newly_offline)
        };

        let alerts = self.build_alerts(&newly_online, &newly_offline, online_rate, total);
        self.alerts.push_all(alerts.clone()).await;

        *prior_guard = Some(current_online_set);
        drop(prior_guard);

        if is_baseline_sweep {
            info!("monitor: baseline sweep established ({online} online, {degraded} degraded, {offline} offline)");
        }

        SweepReport {
            timestamp: Utc::now(),
            total,
            online,
            offline,
            degraded,
            online_rate,
            newly_online,
            newly_offline,
            alerts,
        }
    }

    fn build_alerts(&self, newly_online: &[String], newly_offline: &[String], online_rate: f64, total: usize) -> Vec<Alert> {
        if total == 0 {
            return Vec::new();
        }

        let now = Utc::now();
        let mut alerts = Vec::new();

        for id in newly_online {
            alerts.push(Alert {
                timestamp: now,
                level: AlertLevel::Info,
                kind: AlertKind::DeviceRecovered,
                device_ids: vec![id.clone()],
                message: format!("device '{id}' recovered"),
            });
        }

        let mut down_with_enough_failures = Vec::new();
        for id in newly_offline {
            let failures = self.health.get(id).map(|r| r.consecutive_failures).unwrap_or(0);
            if failures >= self.config.consecutive_failures_alert {
                down_with_enough_failures.push(id.clone());
            }
        }
        for id in &down_with_enough_failures {
            alerts.push(Alert {
                timestamp: now,
                level: AlertLevel::Warning,
                kind: AlertKind::DeviceDown,
                device_ids: vec![id.clone()],
                message: format!("device '{id}' is down"),
            });
        }

        let offline_count = newly_offline.len() as u32;
        if offline_count >= self.config.network_issue_threshold {
            // network_incident supersedes mass_failure (spec §4.F table).
            alerts.push(Alert {
                timestamp: now,
                level: AlertLevel::Red,
                kind: AlertKind::NetworkIncident,
                device_ids: newly_offline.to_vec(),
                message: format!("{offline_count} devices went offline in one sweep - possible network incident"),
            });
        } else if offline_count >= self.config.multi_device_alert_count {
            alerts.push(Alert {
                timestamp: now,
                level: AlertLevel::Critical,
                kind: AlertKind::MassFailure,
                device_ids: newly_offline.to_vec(),
                message: format!("{offline_count} devices went offline in one sweep"),
            });
        }

        if online_rate < self.config.alert_threshold {
            alerts.push(Alert {
                timestamp: now,
                level: AlertLevel::Critical,
                kind: AlertKind::ThresholdBreach,
                device_ids: Vec::new(),
                message: format!("online rate {:.0}% below threshold {:.0}%", online_rate * 100.0, self.config.alert_threshold * 100.0),
            });
        }

        alerts
    }

    /// Sweeps forever on `config.sweep_interval` until `cancel` fires.
    /// Overlapping ticks never happen — each tick awaits the previous
    /// sweep's completion before sleeping again (spec §4.G names
    /// `status_check` coalescing; the monitor's own loop is the thing the
    /// scheduler's job body calls into).
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("monitor: stopping sweep loop");
                    return;
                }
                _ = self.sweep() => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("monitor: stopping sweep loop");
                    return;
                }
                _ = tokio::time::sleep(self.config.sweep_interval) => {}
            }
        }
    }
}

async fn probe_device(prober: &Prober, ip: &str, port: Option<u16>) -> (HealthState, String) {
    let ping = prober.ping(ip).await;
    if !ping.success {
        return (HealthState::Offline, ping.message);
    }

    match port {
        Some(port) => {
            let tcp = prober.tcp_probe(ip, port).await;
            if tcp.success {
                (HealthState::Online, tcp.message)
            } else {
                (HealthState::Degraded, tcp.message)
            }
        }
        None => (HealthState::Online, ping.message),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use venuectl_commons::config::{RawMonitoring, RawRetryPolicy, RawSchedule};
    use venuectl_commons::RawConfig;
    use venuectl_net::ProberConfig;

    use super::*;

    fn config_with_devices(devices: Vec<venuectl_commons::config::RawDevice>) -> RawConfig {
        RawConfig {
            schedule: RawSchedule {
                on_time: "09:00".to_string(),
                off_time: "18:00".to_string(),
                timezone: "UTC".to_string(),
                days: vec![],
                exclude_dates: vec![],
                misfire_grace_sec: 3600,
            },
            retry_policy: RawRetryPolicy {
                max_attempts: 1,
                base_interval_sec: 1.0,
                backoff_multiplier: 1.0,
                max_delay_sec: None,
            },
            monitoring: RawMonitoring {
                enabled: true,
                status_check_interval_sec: 300,
                alert_threshold: 0.8,
                consecutive_failures_alert: 1,
                multi_device_alert_count: 2,
                network_issue_threshold: 5,
            },
            groups: vec![],
            devices,
        }
    }

    fn raw_device(id: &str, ip: &str) -> venuectl_commons::config::RawDevice {
        venuectl_commons::config::RawDevice {
            id: id.to_string(),
            name: id.to_string(),
            group: "g1".to_string(),
            device_type: "exposition_pc".to_string(),
            ip: ip.to_string(),
            port: None,
            mac: None,
            enabled: true,
            timeout_sec: 1,
        }
    }

    #[tokio::test]
    async fn first_sweep_establishes_baseline_without_alerts() {
        let raw = config_with_devices(vec![raw_device("d1", "127.0.0.1")]);
        let registry = Arc::new(Registry::from_config(&raw));
        let prober = Arc::new(Prober::new(ProberConfig {
            ping_timeout: Duration::from_millis(200),
            tcp_timeout: Duration::from_millis(200),
            http_timeout: Duration::from_millis(200),
        }));
        let monitor = Monitor::new(registry, prober, MonitorConfig::default());
        let report = monitor.sweep().await;
        assert!(report.newly_online.is_empty());
        assert!(report.newly_offline.is_empty());
    }

    #[tokio::test]
    async fn threshold_breach_alert_when_online_rate_low() {
        let raw = config_with_devices(vec![raw_device("d1", "198.51.100.1"), raw_device("d2", "198.51.100.2")]);
        let registry = Arc::new(Registry::from_config(&raw));
        let prober = Arc::new(Prober::new(ProberConfig {
            ping_timeout: Duration::from_millis(50),
            tcp_timeout: Duration::from_millis(50),
            http_timeout: Duration::from_millis(50),
        }));
        let monitor = Monitor::new(registry, prober, MonitorConfig::default());
        monitor.sweep().await;
        let report = monitor.sweep().await;
        assert!(report.online_rate < 0.8);
        assert!(report.alerts.iter().any(|a| matches!(a.kind, AlertKind::ThresholdBreach)));
    }
}
