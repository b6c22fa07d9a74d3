use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{SchedulerError, SchedulerResult};
use crate::types::ScheduleState;

/// Parses a spec `"HH:MM"` string into a `NaiveTime`.
pub fn parse_time_of_day(raw: &str) -> SchedulerResult<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| SchedulerError::InvalidTimeOfDay(raw.to_string()))
}

/// Parses the config document's lowercase three-letter day names into
/// `chrono::Weekday`.
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    match raw.to_lowercase().as_str() {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Looks ahead up to eight days (one full week plus slack) for the next
/// `time_of_day` occurrence in `tz` that falls on an allowed day and isn't
/// excluded. Returns `None` only when `allowed_days` is empty.
pub fn next_occurrence(time_of_day: NaiveTime, tz: Tz, schedule: &ScheduleState, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if schedule.allowed_days.is_empty() {
        return None;
    }
    let local_now = now.with_timezone(&tz);

    for day_offset in 0..8 {
        let candidate_date = local_now.date_naive() + ChronoDuration::days(day_offset);
        if !schedule.allowed_days.contains(&candidate_date.weekday()) {
            continue;
        }
        if schedule.is_excluded(candidate_date) {
            continue;
        }
        let Some(candidate_local) = tz.from_local_datetime(&candidate_date.and_time(time_of_day)).earliest() else {
            continue;
        };
        if candidate_local > local_now {
            return Some(candidate_local.with_timezone(&Utc));
        }
    }
    None
}

/// Finds a past occurrence within `grace` of `now` that hasn't yet fired,
/// for process-restart catch-up (spec §4.G misfire handling). Scans today
/// and yesterday only — `grace` is expected to be well under 24h, and a
/// wider search would risk replaying firings the grace window is meant to
/// drop.
pub fn recent_missed_occurrence(
    time_of_day: NaiveTime,
    tz: Tz,
    schedule: &ScheduleState,
    now: DateTime<Utc>,
    grace: ChronoDuration,
) -> Option<DateTime<Utc>> {
    if schedule.allowed_days.is_empty() {
        return None;
    }
    let local_now = now.with_timezone(&tz);

    for day_offset in [0_i64, -1] {
        let candidate_date: NaiveDate = local_now.date_naive() + ChronoDuration::days(day_offset);
        if !schedule.allowed_days.contains(&candidate_date.weekday()) || schedule.is_excluded(candidate_date) {
            continue;
        }
        let Some(candidate_local) = tz.from_local_datetime(&candidate_date.and_time(time_of_day)).earliest() else {
            continue;
        };
        let candidate_utc = candidate_local.with_timezone(&Utc);
        if candidate_utc > now {
            continue;
        }
        let age = now - candidate_utc;
        if age <= grace {
            return Some(candidate_utc);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;

    use chrono::TimeZone as _;

    use super::*;

    fn schedule(allowed: &[Weekday]) -> ScheduleState {
        ScheduleState {
            on_time: "09:00".to_string(),
            off_time: "18:00".to_string(),
            timezone: Tz::UTC,
            allowed_days: allowed.iter().copied().collect::<HashSet<_>>(),
            excluded_dates: HashSet::new(),
        }
    }

    #[test]
    fn next_occurrence_skips_to_tomorrow_once_today_has_passed() {
        let sched = schedule(&[Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat, Weekday::Sun]);
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap(); // 2026-07-28 is a Tuesday
        let next = next_occurrence(NaiveTime::from_hms_opt(9, 0, 0).unwrap(), Tz::UTC, &sched, now).unwrap();
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2026, 7, 29).unwrap());
    }

    #[test]
    fn next_occurrence_honours_allowed_days() {
        let sched = schedule(&[Weekday::Mon]);
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 6, 0, 0).unwrap(); // Tuesday
        let next = next_occurrence(NaiveTime::from_hms_opt(9, 0, 0).unwrap(), Tz::UTC, &sched, now).unwrap();
        assert_eq!(next.weekday(), Weekday::Mon);
    }

    #[test]
    fn empty_allowed_days_yields_none() {
        let sched = schedule(&[]);
        let now = Utc::now();
        assert!(next_occurrence(NaiveTime::from_hms_opt(9, 0, 0).unwrap(), Tz::UTC, &sched, now).is_none());
    }

    #[test]
    fn misfire_within_grace_is_found() {
        let sched = schedule(&[Weekday::Tue]);
        let scheduled = Utc.with_ymd_and_hms(2026, 7, 28, 9, 0, 0).unwrap();
        let restarted_at = scheduled + ChronoDuration::minutes(12);
        let found = recent_missed_occurrence(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            Tz::UTC,
            &sched,
            restarted_at,
            ChronoDuration::seconds(3600),
        );
        assert_eq!(found, Some(scheduled));
    }

    #[test]
    fn misfire_outside_grace_is_dropped() {
        let sched = schedule(&[Weekday::Tue]);
        let scheduled = Utc.with_ymd_and_hms(2026, 7, 28, 9, 0, 0).unwrap();
        let restarted_at = scheduled + ChronoDuration::hours(2);
        let found = recent_missed_occurrence(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            Tz::UTC,
            &sched,
            restarted_at,
            ChronoDuration::seconds(3600),
        );
        assert_eq!(found, None);
    }

    #[test]
    fn excluded_date_is_skipped_for_misfire_too() {
        let mut sched = schedule(&[Weekday::Tue]);
        sched.excluded_dates.insert(NaiveDate::from_ymd_opt(2026, 7, 28).unwrap());
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 9, 12, 0).unwrap();
        let found = recent_missed_occurrence(NaiveTime::from_hms_opt(9, 0, 0).unwrap(), Tz::UTC, &sched, now, ChronoDuration::seconds(3600));
        assert!(found.is_none());
    }

    #[test]
    fn tz_from_str_roundtrips_utc() {
        assert_eq!(Tz::from_str("UTC").unwrap(), Tz::UTC);
    }
}
