pub mod error;
mod memory;
pub mod models;
mod queue;

pub use error::MqError;
pub use memory::MemoryTaskQueue;
pub use models::{BrokerMessage, BroccoliError, MqQueue, init_mq};
pub use queue::{BroccoliTaskQueue, EnqueueOptions, EnqueueOutcome, TaskQueue};
