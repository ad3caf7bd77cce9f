#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a submission.
///
/// When the `sea-orm` feature is enabled, this enum can be stored directly in SeaORM entities.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum SubmissionStatus {
    /// Persisted, not yet acknowledged by the queue.
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Pending"))]
    Pending,
    /// Accepted by the task queue, waiting for a worker.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Queued"))]
    Queued,
    /// Test cases are being dispatched or executed.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Processing"))]
    Processing,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Accepted"))]
    Accepted,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "WrongAnswer"))]
    WrongAnswer,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "TimeLimitExceeded"))]
    TimeLimitExceeded,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "MemoryLimitExceeded"))]
    MemoryLimitExceeded,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "RuntimeError"))]
    RuntimeError,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CompilationError"))]
    CompilationError,
    /// Judging infrastructure failed; not the contestant's fault.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "SystemError"))]
    SystemError,
}

impl SubmissionStatus {
    /// Returns true once a verdict has been reached. Terminal states never change again.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending | Self::Queued | Self::Processing)
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// `Pending -> Queued -> Processing -> <verdict>` is the normal path. A worker may
    /// pick a task up before the enqueue acknowledgement lands, so `Pending -> Processing`
    /// is allowed too. Any non-terminal state may fall into `SystemError`.
    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        match (self, next) {
            (from, _) if from.is_final() => false,
            (_, Self::SystemError) => true,
            (Self::Pending, Self::Queued) => true,
            (Self::Pending | Self::Queued, Self::Processing) => true,
            (Self::Processing, to) => to.is_final(),
            _ => false,
        }
    }

    /// All possible status values.
    pub const ALL: &'static [SubmissionStatus] = &[
        Self::Pending,
        Self::Queued,
        Self::Processing,
        Self::Accepted,
        Self::WrongAnswer,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::RuntimeError,
        Self::CompilationError,
        Self::SystemError,
    ];

    /// Statuses that still await a verdict.
    pub const IN_FLIGHT: &'static [SubmissionStatus] =
        &[Self::Pending, Self::Queued, Self::Processing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Queued => "Queued",
            Self::Processing => "Processing",
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "WrongAnswer",
            Self::TimeLimitExceeded => "TimeLimitExceeded",
            Self::MemoryLimitExceeded => "MemoryLimitExceeded",
            Self::RuntimeError => "RuntimeError",
            Self::CompilationError => "CompilationError",
            Self::SystemError => "SystemError",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let valid: Vec<&str> = SubmissionStatus::ALL.iter().map(|s| s.as_str()).collect();
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            valid.join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError {
                invalid: s.to_string(),
            })
    }
}

/// Rejected state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal submission transition {from} -> {to}")]
pub struct TransitionError {
    pub from: SubmissionStatus,
    pub to: SubmissionStatus,
}

/// Outcome of a single test case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
    CompilationError,
    SystemError,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Human readable name used in result lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "Wrong Answer",
            Self::TimeLimitExceeded => "Time Limit Exceeded",
            Self::MemoryLimitExceeded => "Memory Limit Exceeded",
            Self::RuntimeError => "Runtime Error",
            Self::CompilationError => "Compilation Error",
            Self::SystemError => "System Error",
        }
    }
}

impl From<Verdict> for SubmissionStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Accepted => Self::Accepted,
            Verdict::WrongAnswer => Self::WrongAnswer,
            Verdict::TimeLimitExceeded => Self::TimeLimitExceeded,
            Verdict::MemoryLimitExceeded => Self::MemoryLimitExceeded,
            Verdict::RuntimeError => Self::RuntimeError,
            Verdict::CompilationError => Self::CompilationError,
            Verdict::SystemError => Self::SystemError,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
