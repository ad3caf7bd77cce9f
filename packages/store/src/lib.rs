//! Persistence for submissions, test cases and correlation entries.
//!
//! Two implementations share one contract: [`SeaOrmStore`] on PostgreSQL and
//! [`MemoryStore`] for tests and single-process runs. Both funnel every
//! submission mutation through the domain methods on [`common::Submission`]
//! while holding a per-submission lock.

pub mod entity;
mod error;
mod memory;
mod postgres;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::{SeaOrmStore, init_db};
pub use traits::{CorrelationStore, JudgeStore, SubmissionRepository, TestCaseRepository};
