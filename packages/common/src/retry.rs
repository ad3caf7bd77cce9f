use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

/// One failed attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAttempt {
    /// 1-based.
    pub attempt: u8,
    pub error: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum RetryDecision {
    Retry { attempt: u8, delay: Duration },
    Exhausted { history: Vec<RetryAttempt> },
}

/// Retry budget plus backoff shape.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u8,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u8) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

#[derive(Debug)]
struct Tracked {
    history: Vec<RetryAttempt>,
    touched: Instant,
}

/// Failure history per task id, so redeliveries share one retry budget.
#[derive(Debug)]
pub struct RetryTracker {
    policy: RetryPolicy,
    tasks: HashMap<String, Tracked>,
}

impl RetryTracker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            tasks: HashMap::new(),
        }
    }

    /// Record a failure and decide whether another attempt is allowed.
    ///
    /// After `max_retries` retries the history is handed back and forgotten.
    pub fn record_failure(&mut self, task_id: &str, error: impl Into<String>) -> RetryDecision {
        let tracked = self
            .tasks
            .entry(task_id.to_string())
            .or_insert_with(|| Tracked {
                history: Vec::new(),
                touched: Instant::now(),
            });
        let attempt = u8::try_from(tracked.history.len() + 1).unwrap_or(u8::MAX);
        tracked.history.push(RetryAttempt {
            attempt,
            error: error.into(),
            at: Utc::now(),
        });
        tracked.touched = Instant::now();

        if attempt <= self.policy.max_retries {
            return RetryDecision::Retry {
                attempt,
                delay: self.policy.backoff(attempt),
            };
        }
        let history = self
            .tasks
            .remove(task_id)
            .map(|t| t.history)
            .unwrap_or_default();
        RetryDecision::Exhausted { history }
    }

    pub fn clear(&mut self, task_id: &str) {
        self.tasks.remove(task_id);
    }

    pub fn attempts(&self, task_id: &str) -> usize {
        self.tasks.get(task_id).map_or(0, |t| t.history.len())
    }

    /// Forget tasks untouched for `max_age`.
    pub fn cleanup_stale(&mut self, max_age: Duration) -> usize {
        let before = self.tasks.len();
        let now = Instant::now();
        self.tasks
            .retain(|_, t| now.duration_since(t.touched) < max_age);
        before - self.tasks.len()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Exponential backoff with 0-25% jitter: `min(base * 2^(attempt-1) + jitter, max)`.
pub fn calculate_backoff(attempt: u8, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(u32::from(attempt - 1)));
    let jitter = if delay_ms > 0 {
        rand::rng().random_range(0..=delay_ms / 4)
    } else {
        0
    };
    Duration::from_millis(delay_ms.saturating_add(jitter).min(max_ms))
}

/// Shortest period accepted for background loops; `tokio::time::interval` rejects zero.
pub const MIN_TICK: Duration = Duration::from_secs(1);

/// Periodically drop abandoned tracker entries.
pub fn spawn_cleanup_task(
    tracker: Arc<Mutex<RetryTracker>>,
    every: Duration,
    max_age: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(MIN_TICK));
        loop {
            interval.tick().await;
            let removed = tracker.lock().await.cleanup_stale(max_age);
            if removed > 0 {
                info!(removed, "Dropped stale retry tracker entries");
            }
        }
    })
}
