use std::sync::Arc;

use venuectl_commons::DeviceFamily;
use venuectl_net::Prober;
use venuectl_protocols::{AdapterCapabilities, AsciiLineAdapter, DeviceAdapter, JsonRpcAdapter, PassivePcAdapter, SemicolonTcpAdapter};

/// One adapter instance per family, shared across every batch (spec §4.B
/// dispatch table). Built once at composition time and handed to the
/// orchestrator.
#[derive(Clone)]
pub struct Adapters {
    pub ascii_line: Arc<dyn DeviceAdapter>,
    pub json_rpc: Arc<dyn DeviceAdapter>,
    pub semicolon_tcp: Arc<dyn DeviceAdapter>,
    pub passive_pc: Arc<dyn DeviceAdapter>,
}

impl Adapters {
    /// `prober` backs the passive-pc adapter's status/reachability checks —
    /// the only family with no protocol of its own to probe with.
    pub fn new(prober: Arc<Prober>) -> Self {
        Self {
            ascii_line: Arc::new(AsciiLineAdapter::default()),
            json_rpc: Arc::new(JsonRpcAdapter::default()),
            semicolon_tcp: Arc::new(SemicolonTcpAdapter::default()),
            passive_pc: Arc::new(PassivePcAdapter::new(prober)),
        }
    }
}

impl Adapters {
    /// Resolves the concrete adapter for a family, or `None` when the
    /// family's adapter is capability-gated off (semicolon-tcp only, spec
    /// §9). `PassivePc` is handled by the orchestrator before this is ever
    /// consulted since it never reaches an adapter at all.
    pub fn for_family(&self, family: DeviceFamily, capabilities: &AdapterCapabilities) -> Option<Arc<dyn DeviceAdapter>> {
        match family {
            DeviceFamily::AsciiLine => Some(self.ascii_line.clone()),
            DeviceFamily::JsonRpc => Some(self.json_rpc.clone()),
            DeviceFamily::SemicolonTcp => {
                if capabilities.semicolon_tcp_enabled {
                    Some(self.semicolon_tcp.clone())
                } else {
                    None
                }
            }
            DeviceFamily::PassivePc => Some(self.passive_pc.clone()),
        }
    }
}
