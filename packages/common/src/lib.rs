pub mod config;
pub mod correlation;
pub mod error_code;
pub mod judge_job;
pub mod judge_result;
pub mod retry;
pub mod submission;
pub mod submission_status;
pub mod test_case;
pub mod worker;

pub use correlation::{CorrelationEntry, EntryStatus};
pub use judge_job::{JudgeJob, Limits};
pub use judge_result::{ResultLine, TestCompletion};
pub use submission::{BeginProcessing, FoldOutcome, NewSubmission, Submission};
pub use submission_status::{SubmissionStatus, TransitionError, Verdict};
pub use test_case::TestCase;
