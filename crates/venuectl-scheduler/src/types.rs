use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc, Weekday};

/// The three named jobs the scheduler runs (spec §4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobId {
    DailyTurnOn,
    DailyTurnOff,
    StatusCheck,
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobId::DailyTurnOn => "daily_turn_on",
            JobId::DailyTurnOff => "daily_turn_off",
            JobId::StatusCheck => "status_check",
        };
        write!(f, "{s}")
    }
}

/// Per-job state machine: `idle -> running -> idle` (or `-> error -> idle`),
/// spec §4.G.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Error,
}

/// Events surfaced to a `SchedulerListener` for structured logging (spec
/// §4.G).
#[derive(Debug, Clone)]
pub enum JobEvent {
    Executed { job_id: JobId, at: DateTime<Utc> },
    Error { job_id: JobId, message: String },
    Missed { job_id: JobId, scheduled_for: DateTime<Utc> },
}

/// Observes scheduler job lifecycle events. The default logging
/// implementation is what the composition root wires in if it has no
/// fancier sink; tests can supply a recording implementation instead.
pub trait SchedulerListener: Send + Sync {
    fn on_event(&self, event: JobEvent);
}

/// Logs every event through the `log` facade at a severity matching its
/// kind.
pub struct LoggingListener;

impl SchedulerListener for LoggingListener {
    fn on_event(&self, event: JobEvent) {
        match event {
            JobEvent::Executed { job_id, at } => log::info!("job '{job_id}' executed at {at}"),
            JobEvent::Error { job_id, message } => log::error!("job '{job_id}' failed: {message}"),
            JobEvent::Missed { job_id, scheduled_for } => {
                log::warn!("job '{job_id}' missed its {scheduled_for} firing (outside grace window)")
            }
        }
    }
}

/// Snapshot of one job's current state, returned by `get_jobs_info`.
#[derive(Debug, Clone)]
pub struct JobInfo {
    pub job_id: JobId,
    pub state: JobState,
    pub next_run: Option<DateTime<Utc>>,
    pub last_executed: Option<DateTime<Utc>>,
}

/// Daily on/off times, timezone, allowed days and exclusion dates (spec
/// §3). Immutable value replaced wholesale by `update_schedule` — never
/// mutated field-by-field, so an in-flight job's borrowed snapshot is never
/// torn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleState {
    pub on_time: String,
    pub off_time: String,
    pub timezone: chrono_tz::Tz,
    pub allowed_days: HashSet<Weekday>,
    pub excluded_dates: HashSet<NaiveDate>,
}

impl ScheduleState {
    pub fn is_excluded(&self, date: NaiveDate) -> bool {
        self.excluded_dates.contains(&date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_display_matches_spec_names() {
        assert_eq!(JobId::DailyTurnOn.to_string(), "daily_turn_on");
        assert_eq!(JobId::DailyTurnOff.to_string(), "daily_turn_off");
        assert_eq!(JobId::StatusCheck.to_string(), "status_check");
    }
}
