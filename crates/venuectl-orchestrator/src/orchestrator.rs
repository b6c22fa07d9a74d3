use std::sync::Arc;

use log::warn;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use venuectl_commons::{Action, DeviceFamily, ErrorKind, Trigger};
use venuectl_protocols::AdapterCapabilities;
use venuectl_registry::{Device, Registry};
use venuectl_retry::RetryPolicy;

use crate::dispatch::Adapters;
use crate::types::{ActionLogEntry, ActionLogSink, DeviceResult, ExecutionReport};

/// Fans out `turn_on`/`turn_off` across one device, one group, one family, or
/// the whole registry, isolating per-device failures so one bad device never
/// takes the batch down (spec §4.E).
pub struct Orchestrator {
    registry: Arc<Registry>,
    adapters: Adapters,
    capabilities: AdapterCapabilities,
    retry_policy: RetryPolicy,
    parallel_limit: usize,
    action_log: Option<Arc<dyn ActionLogSink>>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<Registry>,
        adapters: Adapters,
        capabilities: AdapterCapabilities,
        retry_policy: RetryPolicy,
        parallel_limit: usize,
        action_log: Option<Arc<dyn ActionLogSink>>,
    ) -> Self {
        Self {
            registry,
            adapters,
            capabilities,
            retry_policy,
            parallel_limit: parallel_limit.max(1),
            action_log,
        }
    }

    pub async fn act_on_device(&self, device_id: &str, action: Action, trigger: Trigger, cancel: &CancellationToken) -> DeviceResult {
        match self.registry.get_device(device_id) {
            Some(device) => self.execute_on_device(&device, action, trigger, cancel).await,
            None => DeviceResult::not_found(device_id, action),
        }
    }

    pub async fn act_on_group(
        &self,
        group_id: &str,
        action: Action,
        trigger: Trigger,
        parallel_override: Option<bool>,
        cancel: &CancellationToken,
    ) -> ExecutionReport {
        let devices = self.registry.by_group(group_id, true);
        let parallel = parallel_override.unwrap_or_else(|| self.registry.group(group_id).map(|g| g.parallel).unwrap_or(false));
        let results = self.run_batch(devices, action, trigger, parallel, cancel).await;
        ExecutionReport::aggregate(action, trigger, results)
    }

    /// Runs every enabled device, one group at a time in ascending priority
    /// order, waiting for a group's batch to fully settle before starting
    /// the next (spec §3/§4.E). Devices whose `group` doesn't match any
    /// registered group id are still run, as a final lowest-priority batch,
    /// rather than silently dropped.
    pub async fn act_on_all(&self, action: Action, trigger: Trigger, cancel: &CancellationToken) -> ExecutionReport {
        let groups = self.registry.groups_sorted_by_priority();
        let mut results = Vec::new();
        let mut seen_ids = std::collections::HashSet::new();

        for group in &groups {
            let devices = self.registry.by_group(&group.id, true);
            for d in &devices {
                seen_ids.insert(d.id.clone());
            }
            let batch = self.run_batch(devices, action, trigger, group.parallel, cancel).await;
            results.extend(batch);
        }

        let orphaned: Vec<Device> = self
            .registry
            .list(true)
            .into_iter()
            .filter(|d| !seen_ids.contains(&d.id))
            .collect();
        if !orphaned.is_empty() {
            warn!(
                "{} device(s) belong to no registered group; running them last",
                orphaned.len()
            );
            let batch = self.run_batch(orphaned, action, trigger, false, cancel).await;
            results.extend(batch);
        }

        ExecutionReport::aggregate(action, trigger, results)
    }

    pub async fn act_on_all_by_family(
        &self,
        action: Action,
        trigger: Trigger,
        families: &[DeviceFamily],
        cancel: &CancellationToken,
    ) -> ExecutionReport {
        let mut devices = Vec::new();
        for family in families {
            devices.extend(self.registry.by_family(*family, true));
        }
        let results = self.run_batch(devices, action, trigger, true, cancel).await;
        ExecutionReport::aggregate(action, trigger, results)
    }

    async fn run_batch(
        &self,
        devices: Vec<Device>,
        action: Action,
        trigger: Trigger,
        parallel: bool,
        cancel: &CancellationToken,
    ) -> Vec<DeviceResult> {
        if !parallel {
            let mut results = Vec::with_capacity(devices.len());
            for device in &devices {
                results.push(self.execute_on_device(device, action, trigger, cancel).await);
            }
            return results;
        }

        let semaphore = Arc::new(Semaphore::new(self.parallel_limit));
        let mut set = JoinSet::new();

        for device in devices {
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");
            let adapters = self.adapters.clone();
            let capabilities = self.capabilities;
            let retry_policy = self.retry_policy;
            let action_log = self.action_log.clone();
            let cancel = cancel.clone();

            set.spawn(async move {
                let _permit = permit;
                execute(&device, action, trigger, &adapters, capabilities, &retry_policy, &action_log, &cancel).await
            });
        }

        let mut results = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(join_error) => {
                    warn!("device task panicked: {join_error}");
                    results.push(DeviceResult {
                        device_id: "unknown".to_string(),
                        device_name: "unknown".to_string(),
                        ip: String::new(),
                        family: None,
                        action,
                        success: false,
                        attempts: Vec::new(),
                        total_elapsed_ms: 0,
                        terminal_error: Some(ErrorKind::Internal),
                        start_time: chrono::Utc::now(),
                        end_time: chrono::Utc::now(),
                    });
                }
            }
        }
        results
    }

    async fn execute_on_device(&self, device: &Device, action: Action, trigger: Trigger, cancel: &CancellationToken) -> DeviceResult {
        execute(
            device,
            action,
            trigger,
            &self.adapters,
            self.capabilities,
            &self.retry_policy,
            &self.action_log,
            cancel,
        )
        .await
    }
}

/// The actual per-device unit of work, free-standing so it can run inside a
/// spawned task without borrowing `&Orchestrator` across an await that would
/// outlive the spawn.
async fn execute(
    device: &Device,
    action: Action,
    trigger: Trigger,
    adapters: &Adapters,
    capabilities: AdapterCapabilities,
    retry_policy: &RetryPolicy,
    action_log: &Option<Arc<dyn ActionLogSink>>,
    cancel: &CancellationToken,
) -> DeviceResult {
    let start_time = chrono::Utc::now();

    if device.family == DeviceFamily::PassivePc {
        let end_time = chrono::Utc::now();
        return DeviceResult {
            device_id: device.id.clone(),
            device_name: device.name.clone(),
            ip: device.ip.clone(),
            family: Some(device.family),
            action,
            success: true,
            attempts: Vec::new(),
            total_elapsed_ms: 0,
            terminal_error: None,
            start_time,
            end_time,
        };
    }

    let Some(adapter) = adapters.for_family(device.family, &capabilities) else {
        let end_time = chrono::Utc::now();
        return DeviceResult {
            device_id: device.id.clone(),
            device_name: device.name.clone(),
            ip: device.ip.clone(),
            family: Some(device.family),
            action,
            success: false,
            attempts: Vec::new(),
            total_elapsed_ms: 0,
            terminal_error: Some(ErrorKind::Internal),
            start_time,
            end_time,
        };
    };

    let target = venuectl_protocols::AdapterTarget {
        ip: device.ip.clone(),
        port: device.port,
        timeout: device.timeout,
    };

    let final_result = venuectl_retry::run(
        |_attempt_index| {
            let adapter = adapter.clone();
            let target = target.clone();
            async move {
                match action {
                    Action::TurnOn => adapter.power_on(&target).await,
                    Action::TurnOff => adapter.power_off(&target).await,
                }
            }
        },
        retry_policy,
        cancel,
    )
    .await;

    if let Some(sink) = action_log {
        for attempt in &final_result.attempts {
            sink.append(ActionLogEntry {
                timestamp: attempt.started_at,
                device_id: device.id.clone(),
                action,
                trigger,
                success: attempt.success,
                attempt_number: attempt.attempt_index,
                elapsed_ms: attempt.elapsed_ms,
                error_message: attempt.error_kind.as_ref().map(|k| k.to_string()),
            })
            .await;
        }
    }

    let end_time = chrono::Utc::now();
    DeviceResult {
        device_id: device.id.clone(),
        device_name: device.name.clone(),
        ip: device.ip.clone(),
        family: Some(device.family),
        action,
        success: final_result.success,
        attempts: final_result.attempts,
        total_elapsed_ms: final_result.total_elapsed_ms,
        terminal_error: final_result.terminal_error,
        start_time,
        end_time,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use venuectl_net::{Prober, ProberConfig};
    use venuectl_protocols::{AdapterTarget, DeviceAdapter, PowerState, StatusOutcome};
    use venuectl_registry::Device as RegistryDevice;
    use venuectl_retry::AttemptOutcome;

    use super::*;

    struct FlakyAdapter {
        fail_times: AtomicUsize,
    }

    #[async_trait]
    impl DeviceAdapter for FlakyAdapter {
        async fn power_on(&self, _target: &AdapterTarget) -> AttemptOutcome {
            if self.fail_times.fetch_sub(1, Ordering::SeqCst) > 0 {
                AttemptOutcome::failure(ErrorKind::Timeout)
            } else {
                AttemptOutcome::success("on")
            }
        }

        async fn power_off(&self, _target: &AdapterTarget) -> AttemptOutcome {
            AttemptOutcome::success("off")
        }

        async fn status(&self, _target: &AdapterTarget) -> StatusOutcome {
            StatusOutcome::from_outcome(AttemptOutcome::success("on"), PowerState::On)
        }
    }

    fn test_device(id: &str, family: DeviceFamily, group: &str) -> RegistryDevice {
        RegistryDevice {
            id: id.to_string(),
            name: id.to_string(),
            group: group.to_string(),
            family,
            ip: "127.0.0.1".to_string(),
            port: Some(23),
            mac: None,
            enabled: true,
            timeout: Duration::from_millis(200),
        }
    }

    fn test_adapters() -> Adapters {
        let prober = Arc::new(Prober::new(ProberConfig::default()));
        Adapters::new(prober)
    }

    #[tokio::test]
    async fn passive_pc_is_skipped_with_zero_attempts() {
        let adapters = test_adapters();
        let device = test_device("pc1", DeviceFamily::PassivePc, "g1");
        let cancel = CancellationToken::new();
        let result = execute(&device, Action::TurnOn, Trigger::Manual, &adapters, AdapterCapabilities::default(), &RetryPolicy::default(), &None, &cancel).await;
        assert!(result.success);
        assert_eq!(result.attempts.len(), 0);
    }

    #[tokio::test]
    async fn gated_off_semicolon_tcp_fails_without_attempts() {
        let adapters = test_adapters();
        let device = test_device("cube1", DeviceFamily::SemicolonTcp, "g1");
        let capabilities = AdapterCapabilities { semicolon_tcp_enabled: false };
        let cancel = CancellationToken::new();
        let result = execute(&device, Action::TurnOn, Trigger::Manual, &adapters, capabilities, &RetryPolicy::default(), &None, &cancel).await;
        assert!(!result.success);
        assert_eq!(result.terminal_error, Some(ErrorKind::Internal));
        assert_eq!(result.attempts.len(), 0);
    }

    #[tokio::test]
    async fn not_found_device_is_reported_without_panicking() {
        let registry = Arc::new(Registry::from_config(&empty_config()));
        let orchestrator = Orchestrator::new(
            registry,
            test_adapters(),
            AdapterCapabilities::default(),
            RetryPolicy::new(1, 0, 1.0, 0),
            4,
            None,
        );
        let cancel = CancellationToken::new();
        let result = orchestrator.act_on_device("missing", Action::TurnOn, Trigger::Manual, &cancel).await;
        assert!(!result.success);
        assert_eq!(result.terminal_error, Some(ErrorKind::NotFound));
        assert!(result.family.is_none());
    }

    fn empty_config() -> venuectl_commons::RawConfig {
        use venuectl_commons::config::{RawMonitoring, RawRetryPolicy, RawSchedule};
        venuectl_commons::RawConfig {
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
                enabled: false,
                status_check_interval_sec: 300,
                alert_threshold: 0.8,
                consecutive_failures_alert: 2,
                multi_device_alert_count: 2,
                network_issue_threshold: 5,
            },
            groups: vec![],
            devices: vec![],
        }
    }

    #[tokio::test]
    async fn retries_until_success_and_records_every_attempt() {
        let adapter = Arc::new(FlakyAdapter { fail_times: AtomicUsize::new(2) });
        let target = AdapterTarget { ip: "127.0.0.1".to_string(), port: Some(23), timeout: Duration::from_millis(50) };
        let policy = RetryPolicy::new(5, 1, 1.0, 10);
        let cancel = CancellationToken::new();
        let result = venuectl_retry::run(
            |_| {
                let adapter = adapter.clone();
                let target = target.clone();
                async move { adapter.power_on(&target).await }
            },
            &policy,
            &cancel,
        )
        .await;
        assert!(result.success);
        assert_eq!(result.attempts.len(), 3);
    }
}
