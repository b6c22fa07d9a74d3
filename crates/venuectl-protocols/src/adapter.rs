use std::time::Duration;

use async_trait::async_trait;
use venuectl_net::Prober;
use venuectl_retry::AttemptOutcome;

/// Everything an adapter needs to address a device for a single attempt.
/// Adapters never see the full `Device` record from the registry — only
/// this narrow view — so they stay decoupled from registry internals.
#[derive(Debug, Clone)]
pub struct AdapterTarget {
    pub ip: String,
    pub port: Option<u16>,
    pub timeout: Duration,
}

/// The power state a `status` call resolves to, mirroring the source
/// system's own three-valued reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    On,
    Off,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct StatusOutcome {
    pub outcome: AttemptOutcome,
    pub power_state: PowerState,
}

impl StatusOutcome {
    pub fn from_outcome(outcome: AttemptOutcome, power_state: PowerState) -> Self {
        Self { outcome, power_state }
    }
}

/// Capability gates for adapters whose wire grammar the operator can't
/// fully vouch for yet (spec §4.B / §9 — the semicolon-TCP/"cubes" client
/// is kept as a first-class adapter but can be switched off without
/// removing it from the dispatch table).
#[derive(Debug, Clone, Copy)]
pub struct AdapterCapabilities {
    pub semicolon_tcp_enabled: bool,
}

impl Default for AdapterCapabilities {
    fn default() -> Self {
        Self {
            semicolon_tcp_enabled: true,
        }
    }
}

/// One attempt each of power-on, power-off and status. Retry lives outside
/// this trait entirely — the orchestrator wraps these calls with
/// `venuectl_retry::run`.
#[async_trait]
pub trait DeviceAdapter: Send + Sync {
    async fn power_on(&self, target: &AdapterTarget) -> AttemptOutcome;
    async fn power_off(&self, target: &AdapterTarget) -> AttemptOutcome;
    async fn status(&self, target: &AdapterTarget) -> StatusOutcome;

    /// Default reachability check: TCP connect on the device's port if it
    /// has one, otherwise an ICMP ping. Adapters with no direct protocol
    /// (passive-pc) override this to always degrade to ping.
    async fn is_reachable(&self, target: &AdapterTarget, prober: &Prober) -> bool {
        match target.port {
            Some(port) => prober.tcp_probe(&target.ip, port).await.success,
            None => prober.ping(&target.ip).await.success,
        }
    }
}
