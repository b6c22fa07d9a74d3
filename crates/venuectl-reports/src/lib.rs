pub mod daily;
pub mod execution;
pub mod types;

pub use daily::DailyReport;
pub use execution::{ExecutionRender, ExecutionSummary};
pub use types::{AlertCounts, DayStatus, MonitoringSummary, ReportDate};
