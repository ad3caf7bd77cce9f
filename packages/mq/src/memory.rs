use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use common::worker::Task;
use tokio::sync::Mutex;

use crate::error::MqError;
use crate::queue::{EnqueueOptions, EnqueueOutcome, TaskQueue};

#[derive(Default)]
struct State {
    pending: VecDeque<Task>,
    seen: HashSet<String>,
}

/// In-process queue with the same dedup semantics as the Redis one.
/// Nothing consumes it on its own; callers drain it.
#[derive(Default)]
pub struct MemoryTaskQueue {
    state: Mutex<State>,
}

impl MemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn drain(&self) -> Vec<Task> {
        self.state.lock().await.pending.drain(..).collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    async fn enqueue(
        &self,
        task: &Task,
        options: &EnqueueOptions,
    ) -> Result<EnqueueOutcome, MqError> {
        let mut state = self.state.lock().await;
        if !state.seen.insert(options.dedup_key.clone()) {
            return Ok(EnqueueOutcome::Duplicate);
        }
        let mut task = task.clone();
        task.max_retries = options.max_retries;
        task.timeout_secs = options.timeout.as_secs();
        state.pending.push_back(task);
        Ok(EnqueueOutcome::Enqueued)
    }
}
