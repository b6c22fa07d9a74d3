pub mod dispatch;
pub mod orchestrator;
pub mod types;

pub use dispatch::Adapters;
pub use orchestrator::Orchestrator;
pub use types::{ActionLogEntry, ActionLogSink, DeviceResult, ExecutionReport, ReportStatus};
