pub mod adapter;
pub mod ascii_line;
pub mod io_util;
pub mod json_rpc;
pub mod passive_pc;
pub mod semicolon_tcp;

pub use adapter::{AdapterCapabilities, AdapterTarget, DeviceAdapter, PowerState, StatusOutcome};
pub use ascii_line::AsciiLineAdapter;
pub use json_rpc::JsonRpcAdapter;
pub use passive_pc::PassivePcAdapter;
pub use semicolon_tcp::SemicolonTcpAdapter;
