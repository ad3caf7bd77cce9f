use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    #[error("broker error: {0}")]
    Broker(String),

    #[error("dedup store error: {0}")]
    Dedup(#[from] redis::RedisError),
}

impl From<broccoli_queue::error::BroccoliError> for MqError {
    fn from(e: broccoli_queue::error::BroccoliError) -> Self {
        MqError::Broker(e.to_string())
    }
}
