use std::fmt;

#[derive(Debug)]
pub enum SchedulerError {
    AlreadyRunning,
    NotRunning,
    InvalidTimeOfDay(String),
    UnknownTimezone(String),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::AlreadyRunning => write!(f, "scheduler is already running"),
            SchedulerError::NotRunning => write!(f, "scheduler is not running"),
            SchedulerError::InvalidTimeOfDay(raw) => write!(f, "invalid HH:MM time of day '{raw}'"),
            SchedulerError::UnknownTimezone(raw) => write!(f, "unknown IANA timezone '{raw}'"),
        }
    }
}

impl std::error::Error for SchedulerError {}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
