use store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JudgeError {
    /// Persistence failed; the task should be retried.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, JudgeError>;
