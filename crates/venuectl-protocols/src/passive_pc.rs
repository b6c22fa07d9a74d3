use async_trait::async_trait;
use venuectl_net::Prober;
use venuectl_retry::AttemptOutcome;

use crate::adapter::{AdapterTarget, DeviceAdapter, PowerState, StatusOutcome};

/// Exhibit PCs and other devices with no direct power-control protocol
/// (spec §4.B). `power_on`/`power_off` are no-ops that succeed immediately;
/// `status` degrades entirely to the reachability prober's ping.
pub struct PassivePcAdapter {
    prober: std::sync::Arc<Prober>,
}

impl PassivePcAdapter {
    pub fn new(prober: std::sync::Arc<Prober>) -> Self {
        Self { prober }
    }
}

#[async_trait]
impl DeviceAdapter for PassivePcAdapter {
    async fn power_on(&self, _target: &AdapterTarget) -> AttemptOutcome {
        AttemptOutcome::success("skipped - no direct control")
    }

    async fn power_off(&self, _target: &AdapterTarget) -> AttemptOutcome {
        AttemptOutcome::success("skipped - no direct control")
    }

    async fn status(&self, target: &AdapterTarget) -> StatusOutcome {
        let probe = self.prober.ping(&target.ip).await;
        let power_state = if probe.success { PowerState::On } else { PowerState::Off };
        let outcome = if probe.success {
            AttemptOutcome::success(probe.message)
        } else {
            AttemptOutcome::failure(venuectl_commons::ErrorKind::Unknown)
        };
        StatusOutcome::from_outcome(outcome, power_state)
    }

    async fn is_reachable(&self, target: &AdapterTarget, prober: &Prober) -> bool {
        prober.ping(&target.ip).await.success
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use venuectl_net::ProberConfig;

    use super::*;

    #[tokio::test]
    async fn power_on_and_off_are_immediate_no_op_successes() {
        let prober = std::sync::Arc::new(Prober::new(ProberConfig::default()));
        let adapter = PassivePcAdapter::new(prober);
        let target = AdapterTarget {
            ip: "127.0.0.1".to_string(),
            port: None,
            timeout: Duration::from_secs(1),
        };
        assert!(adapter.power_on(&target).await.success);
        assert!(adapter.power_off(&target).await.success);
    }
}
