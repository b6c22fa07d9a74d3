pub mod alerts;
pub mod health;
pub mod monitor;
pub mod types;

pub use alerts::AlertRing;
pub use health::HealthStore;
pub use monitor::Monitor;
pub use types::{Alert, AlertKind, AlertLevel, HealthRecord, HealthState, MonitorConfig, SweepReport};
