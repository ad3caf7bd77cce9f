use std::time::Duration;

use async_trait::async_trait;
use common::worker::Task;
use redis::aio::ConnectionManager;
use tracing::{debug, info, warn};

use crate::error::MqError;
use crate::models::MqQueue;

const DEDUP_PREFIX: &str = "gavel:task";

/// Delivery settings attached to an enqueued task.
#[derive(Debug, Clone)]
pub struct EnqueueOptions {
    pub max_retries: u8,
    pub timeout: Duration,
    /// Tasks sharing a key are published once while the key lives.
    pub dedup_key: String,
    pub dedup_ttl: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    Duplicate,
}

/// Durable work queue with at-least-once delivery.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, task: &Task, options: &EnqueueOptions)
    -> Result<EnqueueOutcome, MqError>;
}

/// Redis-backed queue: broccoli for delivery, a `SET NX` key for dedup.
pub struct BroccoliTaskQueue {
    mq: MqQueue,
    redis: ConnectionManager,
    queue_name: String,
}

impl BroccoliTaskQueue {
    pub async fn connect(mq: MqQueue, redis_url: &str, queue_name: &str) -> Result<Self, MqError> {
        let client = redis::Client::open(redis_url)?;
        let redis = client.get_connection_manager().await?;
        Ok(Self {
            mq,
            redis,
            queue_name: queue_name.to_string(),
        })
    }

    fn dedup_key(key: &str) -> String {
        format!("{DEDUP_PREFIX}:{key}")
    }

    /// Claim the dedup key. False if another enqueue holds it.
    async fn claim(&self, key: &str, ttl: Duration) -> Result<bool, MqError> {
        let mut conn = self.redis.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::dedup_key(key))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn unclaim(&self, key: &str) -> Result<(), MqError> {
        let mut conn = self.redis.clone();
        let _: () = redis::cmd("DEL")
            .arg(Self::dedup_key(key))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for BroccoliTaskQueue {
    async fn enqueue(
        &self,
        task: &Task,
        options: &EnqueueOptions,
    ) -> Result<EnqueueOutcome, MqError> {
        if !self.claim(&options.dedup_key, options.dedup_ttl).await? {
            debug!(task_id = %task.id, "Task already enqueued, skipping");
            return Ok(EnqueueOutcome::Duplicate);
        }

        let mut task = task.clone();
        task.max_retries = options.max_retries;
        task.timeout_secs = options.timeout.as_secs();

        if let Err(e) = self.mq.publish(&self.queue_name, None, &task, None).await {
            // Let a later enqueue of the same work through.
            if let Err(release_err) = self.unclaim(&options.dedup_key).await {
                warn!(task_id = %task.id, error = %release_err, "Failed to release dedup key");
            }
            return Err(e.into());
        }
        info!(task_id = %task.id, queue = %self.queue_name, "Task enqueued");
        Ok(EnqueueOutcome::Enqueued)
    }
}
