use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use tokio_util::sync::CancellationToken;
use venuectl_commons::ErrorKind;

use crate::policy::RetryPolicy;

/// What a single attempt reported back to the retry engine. Adapters build
/// this; the engine never classifies errors itself (spec §4.C).
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub success: bool,
    pub response: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl AttemptOutcome {
    pub fn success(response: impl Into<String>) -> Self {
        Self {
            success: true,
            response: Some(response.into()),
            error_kind: None,
        }
    }

    pub fn failure(error_kind: ErrorKind) -> Self {
        Self {
            success: false,
            response: None,
            error_kind: Some(error_kind),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// 1-based, per spec §3's Attempt Record ("Attempt index (1-based)").
    pub attempt_index: u32,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
    pub response: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FinalResult {
    pub success: bool,
    pub attempts: Vec<AttemptRecord>,
    pub total_elapsed_ms: u64,
    pub terminal_error: Option<ErrorKind>,
}

/// Runs `op` up to `policy.max_attempts` times, sleeping the backoff delay
/// between failures. Returns immediately on the first success. `cancel`
/// aborts both in-flight attempts and the inter-attempt sleep, yielding a
/// `CANCELLED` terminal error (spec §4.C, §5).
pub async fn run<F, Fut>(mut op: F, policy: &RetryPolicy, cancel: &CancellationToken) -> FinalResult
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome>,
{
    let batch_started = std::time::Instant::now();
    let mut attempts = Vec::with_capacity(policy.max_attempts as usize);

    for attempt_index in 0..policy.max_attempts {
        if cancel.is_cancelled() {
            return cancelled_result(attempts, batch_started);
        }

        let started_at = Utc::now();
        let attempt_started = std::time::Instant::now();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = op(attempt_index) => Some(outcome),
        };

        let Some(outcome) = outcome else {
            return cancelled_result(attempts, batch_started);
        };

        let elapsed_ms = attempt_started.elapsed().as_millis() as u64;
        let success = outcome.success;
        let error_kind = outcome.error_kind.clone();
        attempts.push(AttemptRecord {
            attempt_index: attempt_index + 1,
            started_at,
            elapsed_ms,
            success,
            error_kind: error_kind.clone(),
            response: outcome.response,
        });

        if success {
            return FinalResult {
                success: true,
                attempts,
                total_elapsed_ms: batch_started.elapsed().as_millis() as u64,
                terminal_error: None,
            };
        }

        let more_attempts_remain = attempt_index + 1 < policy.max_attempts;
        if more_attempts_remain {
            let delay = policy.delay_for(attempt_index);
            debug!("attempt {attempt_index} failed ({error_kind:?}), backing off {delay:?}");
            if !sleep_cancellable(delay, cancel).await {
                return cancelled_result(attempts, batch_started);
            }
        }
    }

    let terminal_error = attempts.last().and_then(|a| a.error_kind.clone());
    FinalResult {
        success: false,
        attempts,
        total_elapsed_ms: batch_started.elapsed().as_millis() as u64,
        terminal_error,
    }
}

/// Sleeps `delay`, returning `false` if `cancel` fired first.
async fn sleep_cancellable(delay: Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

fn cancelled_result(attempts: Vec<AttemptRecord>, batch_started: std::time::Instant) -> FinalResult {
    FinalResult {
        success: false,
        attempts,
        total_elapsed_ms: batch_started.elapsed().as_millis() as u64,
        terminal_error: Some(ErrorKind::Cancelled),
    }
}
