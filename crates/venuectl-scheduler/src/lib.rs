pub mod error;
pub mod next_run;
pub mod scheduler;
pub mod types;

pub use error::{SchedulerError, SchedulerResult};
pub use next_run::{next_occurrence, parse_time_of_day, parse_weekday, recent_missed_occurrence};
pub use scheduler::{Scheduler, SchedulerActions};
pub use types::{JobEvent, JobId, JobInfo, JobState, LoggingListener, ScheduleState, SchedulerListener};
