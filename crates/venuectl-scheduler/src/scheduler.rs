use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{SchedulerError, SchedulerResult};
use crate::next_run::{next_occurrence, parse_time_of_day};
use crate::types::{JobEvent, JobId, JobInfo, JobState, ScheduleState, SchedulerListener};

/// Injected job bodies. The scheduler only knows when to fire; what firing
/// means is the composition root's business (spec §6).
#[async_trait]
pub trait SchedulerActions: Send + Sync {
    async fn turn_on_all(&self) -> Result<(), String>;
    async fn turn_off_all(&self) -> Result<(), String>;
    async fn status_check(&self) -> Result<(), String>;
}

#[derive(Default)]
struct JobRuntime {
    state: DashMap<JobId, JobState>,
    last_executed: DashMap<JobId, DateTime<Utc>>,
    on_lock: TokioMutex<()>,
    off_lock: TokioMutex<()>,
    status_in_flight: AtomicBool,
    next_status_tick: TokioMutex<Option<DateTime<Utc>>>,
}

/// Runs the three spec-named jobs against a mutable `ScheduleState`.
///
/// `daily_turn_on`/`daily_turn_off` are serialised per-job: a scheduled
/// firing and a concurrent `trigger_now` of the same job share a lock and
/// both run to completion, never overlapping. `status_check` ticks instead
/// coalesce — an overlapping tick is dropped and logged as missed, since a
/// stuck probe sweep should never pile up concurrent sweeps.
pub struct Scheduler<A: SchedulerActions + 'static> {
    schedule: ArcSwap<ScheduleState>,
    monitoring_enabled: AtomicBool,
    status_interval: std::time::Duration,
    misfire_grace: ChronoDuration,
    actions: Arc<A>,
    listener: Arc<dyn SchedulerListener>,
    runtime: JobRuntime,
    running: AtomicBool,
    cancel: TokioMutex<Option<CancellationToken>>,
    handles: TokioMutex<Vec<JoinHandle<()>>>,
}

impl<A: SchedulerActions + 'static> Scheduler<A> {
    pub fn new(
        initial_schedule: ScheduleState,
        monitoring_enabled: bool,
        status_interval: std::time::Duration,
        misfire_grace: ChronoDuration,
        actions: Arc<A>,
        listener: Arc<dyn SchedulerListener>,
    ) -> Self {
        Self {
            schedule: ArcSwap::from_pointee(initial_schedule),
            monitoring_enabled: AtomicBool::new(monitoring_enabled),
            status_interval,
            misfire_grace,
            actions,
            listener,
            runtime: JobRuntime::default(),
            running: AtomicBool::new(false),
            cancel: TokioMutex::new(None),
            handles: TokioMutex::new(Vec::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns the daily on/off loops and the status-check ticker. Performs
    /// misfire catch-up for the daily jobs before entering their loops, so a
    /// process restart shortly after a missed firing still honours it.
    pub async fn start(self: &Arc<Self>) -> SchedulerResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        *self.cancel.lock().await = Some(cancel.clone());

        let handles = vec![
            tokio::spawn(Arc::clone(self).run_daily_loop(JobId::DailyTurnOn, cancel.clone())),
            tokio::spawn(Arc::clone(self).run_daily_loop(JobId::DailyTurnOff, cancel.clone())),
            tokio::spawn(Arc::clone(self).run_status_loop(cancel.clone())),
        ];
        *self.handles.lock().await = handles;
        Ok(())
    }

    /// Signals the loops to stop scheduling new firings. With `wait`, blocks
    /// until any in-flight job body returns; without it, returns immediately
    /// and leaves the loops to wind down in the background.
    pub async fn stop(&self, wait: bool) -> SchedulerResult<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(SchedulerError::NotRunning);
        }
        if let Some(cancel) = self.cancel.lock().await.take() {
            cancel.cancel();
        }
        let handles = std::mem::take(&mut *self.handles.lock().await);
        if wait {
            for handle in handles {
                let _ = handle.await;
            }
        }
        Ok(())
    }

    /// Fires a job out-of-band. Serialises with the scheduled loop via the
    /// same per-job lock (daily jobs) or in-flight guard (status check); does
    /// not affect the next scheduled firing.
    pub async fn trigger_now(&self, job_id: JobId) {
        match job_id {
            JobId::DailyTurnOn | JobId::DailyTurnOff => self.execute_daily_job(job_id).await,
            JobId::StatusCheck => {
                while self.runtime.status_in_flight.swap(true, Ordering::SeqCst) {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                }
                self.run_status_check_body().await;
                self.runtime.status_in_flight.store(false, Ordering::SeqCst);
            }
        }
    }

    pub fn update_schedule(
        &self,
        on_time: Option<String>,
        off_time: Option<String>,
        timezone: Option<String>,
        allowed_days: Option<std::collections::HashSet<chrono::Weekday>>,
    ) -> SchedulerResult<()> {
        let current = self.schedule.load_full();
        let on_time = on_time.unwrap_or_else(|| current.on_time.clone());
        let off_time = off_time.unwrap_or_else(|| current.off_time.clone());
        parse_time_of_day(&on_time)?;
        parse_time_of_day(&off_time)?;

        let timezone = match timezone {
            Some(raw) => raw.parse::<chrono_tz::Tz>().map_err(|_| SchedulerError::UnknownTimezone(raw))?,
            None => current.timezone,
        };
        let allowed_days = allowed_days.unwrap_or_else(|| current.allowed_days.clone());

        self.schedule.store(Arc::new(ScheduleState {
            on_time,
            off_time,
            timezone,
            allowed_days,
            excluded_dates: current.excluded_dates.clone(),
        }));
        Ok(())
    }

    pub fn add_excluded_date(&self, date: NaiveDate) {
        let current = self.schedule.load_full();
        if current.excluded_dates.contains(&date) {
            return;
        }
        let mut next = (*current).clone();
        next.excluded_dates.insert(date);
        self.schedule.store(Arc::new(next));
    }

    pub fn remove_excluded_date(&self, date: NaiveDate) {
        let current = self.schedule.load_full();
        if !current.excluded_dates.contains(&date) {
            return;
        }
        let mut next = (*current).clone();
        next.excluded_dates.remove(&date);
        self.schedule.store(Arc::new(next));
    }

    pub async fn get_next_run_times(&self) -> HashMap<JobId, DateTime<Utc>> {
        let schedule = self.schedule.load_full();
        let mut map = HashMap::new();
        if let Ok(tod) = parse_time_of_day(&schedule.on_time) {
            if let Some(t) = next_occurrence(tod, schedule.timezone, &schedule, Utc::now()) {
                map.insert(JobId::DailyTurnOn, t);
            }
        }
        if let Ok(tod) = parse_time_of_day(&schedule.off_time) {
            if let Some(t) = next_occurrence(tod, schedule.timezone, &schedule, Utc::now()) {
                map.insert(JobId::DailyTurnOff, t);
            }
        }
        if let Some(t) = *self.runtime.next_status_tick.lock().await {
            map.insert(JobId::StatusCheck, t);
        }
        map
    }

    pub async fn get_jobs_info(&self) -> Vec<JobInfo> {
        let next_runs = self.get_next_run_times().await;
        [JobId::DailyTurnOn, JobId::DailyTurnOff, JobId::StatusCheck]
            .into_iter()
            .map(|job_id| JobInfo {
                job_id,
                state: self.runtime.state.get(&job_id).map(|s| *s).unwrap_or(JobState::Idle),
                next_run: next_runs.get(&job_id).copied(),
                last_executed: self.runtime.last_executed.get(&job_id).map(|t| *t),
            })
            .collect()
    }

    async fn run_daily_loop(self: Arc<Self>, job_id: JobId, cancel: CancellationToken) {
        if let Some(missed) = self.find_missed_occurrence(job_id) {
            log::info!("catching up missed '{job_id}' firing scheduled for {missed}");
            self.execute_daily_job(job_id).await;
        }

        loop {
            let schedule = self.schedule.load_full();
            let time_str = if matches!(job_id, JobId::DailyTurnOn) { &schedule.on_time } else { &schedule.off_time };
            let Ok(tod) = parse_time_of_day(time_str) else {
                if Self::wait_or_cancelled(&cancel, std::time::Duration::from_secs(60)).await {
                    return;
                }
                continue;
            };
            let Some(next) = next_occurrence(tod, schedule.timezone, &schedule, Utc::now()) else {
                // No allowed days configured; park and recheck periodically in
                // case update_schedule adds one.
                if Self::wait_or_cancelled(&cancel, std::time::Duration::from_secs(60)).await {
                    return;
                }
                continue;
            };

            let delay = (next - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO);
            if Self::wait_or_cancelled(&cancel, delay).await {
                return;
            }
            self.execute_daily_job(job_id).await;
        }
    }

    /// Sleeps for `delay` or until cancellation, whichever comes first.
    /// Returns `true` if cancelled.
    async fn wait_or_cancelled(cancel: &CancellationToken, delay: std::time::Duration) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    fn find_missed_occurrence(&self, job_id: JobId) -> Option<DateTime<Utc>> {
        let schedule = self.schedule.load_full();
        let time_str = if matches!(job_id, JobId::DailyTurnOn) { &schedule.on_time } else { &schedule.off_time };
        let tod = parse_time_of_day(time_str).ok()?;
        crate::next_run::recent_missed_occurrence(tod, schedule.timezone, &schedule, Utc::now(), self.misfire_grace)
    }

    async fn execute_daily_job(&self, job_id: JobId) {
        let lock = if matches!(job_id, JobId::DailyTurnOn) { &self.runtime.on_lock } else { &self.runtime.off_lock };
        let _guard = lock.lock().await;

        self.runtime.state.insert(job_id, JobState::Running);

        let schedule = self.schedule.load_full();
        let today_local = Utc::now().with_timezone(&schedule.timezone).date_naive();
        if schedule.is_excluded(today_local) {
            self.runtime.state.insert(job_id, JobState::Idle);
            self.listener.on_event(JobEvent::Missed { job_id, scheduled_for: Utc::now() });
            return;
        }

        let result = match job_id {
            JobId::DailyTurnOn => self.actions.turn_on_all().await,
            JobId::DailyTurnOff => self.actions.turn_off_all().await,
            JobId::StatusCheck => unreachable!("status_check runs through run_status_loop"),
        };

        match result {
            Ok(()) => {
                self.runtime.last_executed.insert(job_id, Utc::now());
                self.listener.on_event(JobEvent::Executed { job_id, at: Utc::now() });
            }
            Err(message) => {
                self.runtime.state.insert(job_id, JobState::Error);
                self.listener.on_event(JobEvent::Error { job_id, message });
            }
        }
        self.runtime.state.insert(job_id, JobState::Idle);
    }

    async fn run_status_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.status_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            if !self.monitoring_enabled.load(Ordering::SeqCst) {
                continue;
            }

            *self.runtime.next_status_tick.lock().await =
                ChronoDuration::from_std(self.status_interval).ok().map(|d| Utc::now() + d);

            if self.runtime.status_in_flight.swap(true, Ordering::SeqCst) {
                self.listener.on_event(JobEvent::Missed { job_id: JobId::StatusCheck, scheduled_for: Utc::now() });
                continue;
            }
            self.run_status_check_body().await;
            self.runtime.status_in_flight.store(false, Ordering::SeqCst);
        }
    }

    async fn run_status_check_body(&self) {
        self.runtime.state.insert(JobId::StatusCheck, JobState::Running);
        match self.actions.status_check().await {
            Ok(()) => {
                self.runtime.last_executed.insert(JobId::StatusCheck, Utc::now());
                self.listener.on_event(JobEvent::Executed { job_id: JobId::StatusCheck, at: Utc::now() });
            }
            Err(message) => {
                self.runtime.state.insert(JobId::StatusCheck, JobState::Error);
                self.listener.on_event(JobEvent::Error { job_id: JobId::StatusCheck, message });
            }
        }
        self.runtime.state.insert(JobId::StatusCheck, JobState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::AtomicU32;

    use chrono_tz::Tz;

    use super::*;
    use crate::types::LoggingListener;

    struct CountingActions {
        on_calls: AtomicU32,
        off_calls: AtomicU32,
        status_calls: AtomicU32,
    }

    impl CountingActions {
        fn new() -> Self {
            Self { on_calls: AtomicU32::new(0), off_calls: AtomicU32::new(0), status_calls: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl SchedulerActions for CountingActions {
        async fn turn_on_all(&self) -> Result<(), String> {
            self.on_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn turn_off_all(&self) -> Result<(), String> {
            self.off_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn status_check(&self) -> Result<(), String> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn all_days_schedule() -> ScheduleState {
        ScheduleState {
            on_time: "09:00".to_string(),
            off_time: "18:00".to_string(),
            timezone: Tz::UTC,
            allowed_days: [
                chrono::Weekday::Mon,
                chrono::Weekday::Tue,
                chrono::Weekday::Wed,
                chrono::Weekday::Thu,
                chrono::Weekday::Fri,
                chrono::Weekday::Sat,
                chrono::Weekday::Sun,
            ]
            .into_iter()
            .collect::<HashSet<_>>(),
            excluded_dates: HashSet::new(),
        }
    }

    #[tokio::test]
    async fn trigger_now_runs_the_job_body_immediately() {
        let actions = Arc::new(CountingActions::new());
        let scheduler = Arc::new(Scheduler::new(
            all_days_schedule(),
            true,
            std::time::Duration::from_secs(3600),
            ChronoDuration::seconds(0),
            actions.clone(),
            Arc::new(LoggingListener),
        ));

        scheduler.trigger_now(JobId::DailyTurnOn).await;
        assert_eq!(actions.on_calls.load(Ordering::SeqCst), 1);
        assert_eq!(actions.off_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn trigger_now_respects_exclusion_for_today() {
        let actions = Arc::new(CountingActions::new());
        let mut schedule = all_days_schedule();
        let today = Utc::now().date_naive();
        schedule.excluded_dates.insert(today);

        let scheduler = Arc::new(Scheduler::new(
            schedule,
            true,
            std::time::Duration::from_secs(3600),
            ChronoDuration::seconds(0),
            actions.clone(),
            Arc::new(LoggingListener),
        ));

        scheduler.trigger_now(JobId::DailyTurnOn).await;
        assert_eq!(actions.on_calls.load(Ordering::SeqCst), 0, "excluded today must suppress the action call");
    }

    #[tokio::test]
    async fn start_twice_fails_with_already_running() {
        let actions = Arc::new(CountingActions::new());
        let scheduler = Arc::new(Scheduler::new(
            all_days_schedule(),
            true,
            std::time::Duration::from_secs(3600),
            ChronoDuration::seconds(0),
            actions,
            Arc::new(LoggingListener),
        ));

        scheduler.start().await.unwrap();
        assert!(matches!(scheduler.start().await, Err(SchedulerError::AlreadyRunning)));
        scheduler.stop(true).await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_fails_with_not_running() {
        let actions = Arc::new(CountingActions::new());
        let scheduler = Scheduler::new(
            all_days_schedule(),
            true,
            std::time::Duration::from_secs(3600),
            ChronoDuration::seconds(0),
            actions,
            Arc::new(LoggingListener),
        );
        assert!(matches!(scheduler.stop(true).await, Err(SchedulerError::NotRunning)));
    }

    #[tokio::test]
    async fn update_schedule_rejects_malformed_time() {
        let actions = Arc::new(CountingActions::new());
        let scheduler = Scheduler::new(
            all_days_schedule(),
            true,
            std::time::Duration::from_secs(3600),
            ChronoDuration::seconds(0),
            actions,
            Arc::new(LoggingListener),
        );
        let result = scheduler.update_schedule(Some("25:99".to_string()), None, None, None);
        assert!(matches!(result, Err(SchedulerError::InvalidTimeOfDay(_))));
    }

    #[tokio::test]
    async fn add_and_remove_excluded_date_round_trips() {
        let actions = Arc::new(CountingActions::new());
        let scheduler = Scheduler::new(
            all_days_schedule(),
            true,
            std::time::Duration::from_secs(3600),
            ChronoDuration::seconds(0),
            actions,
            Arc::new(LoggingListener),
        );
        let date = NaiveDate::from_ymd_opt(2026, 12, 25).unwrap();
        scheduler.add_excluded_date(date);
        assert!(scheduler.schedule.load().is_excluded(date));
        scheduler.remove_excluded_date(date);
        assert!(!scheduler.schedule.load().is_excluded(date));
    }
}
