pub mod config;
pub mod consumer;
pub mod error;
pub mod orchestrator;

pub use config::{WorkerAppConfig, WorkerConfig};
pub use consumer::{TaskConsumer, TaskDisposition};
pub use error::{JudgeError, Result};
pub use orchestrator::{DispatchSettings, JudgeOutcome, Orchestrator};
