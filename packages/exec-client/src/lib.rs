//! Typed client for a Judge0-compatible execution backend.
//!
//! The client knows how to submit a program run and fetch its outcome. It has no
//! notion of submissions, verdicts or test ordering.

mod client;
mod error;
pub mod language;
mod types;

pub use client::{ExecutionBackend, ExecutionClient};
pub use error::{ExecError, ExecResult};
pub use language::{language_id, supported_languages};
pub use types::{BackendStatus, ExecutionOutcome, ExecutionRequest, ExecutorConfig, status};
