use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::judge_job::Limits;
use crate::judge_result::{ResultLine, TestCompletion};
use crate::submission_status::{SubmissionStatus, TransitionError, Verdict};

/// One code-evaluation attempt and its running judging state.
///
/// All mutations go through the methods below, so every store applies the
/// same rules while holding its per-submission lock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub problem_id: Uuid,
    pub contest_id: Option<Uuid>,
    pub code: String,
    pub language: String,
    pub limits: Limits,
    pub status: SubmissionStatus,
    pub score: i32,
    pub test_cases_passed: i32,
    /// Zero until fan-out begins, then fixed.
    pub total_test_cases: i32,
    pub max_time_ms: i32,
    pub max_memory_kb: i32,
    /// Sorted by test ordering position, never by arrival.
    pub results: Vec<ResultLine>,
    pub failed_test_case: Option<Uuid>,
    pub compile_output: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub queued_at: Option<DateTime<Utc>>,
    pub judge_completed_at: Option<DateTime<Utc>>,
}

/// Input for a new submission.
#[derive(Clone, Debug)]
pub struct NewSubmission {
    pub user_id: Uuid,
    pub problem_id: Uuid,
    pub contest_id: Option<Uuid>,
    pub code: String,
    pub language: String,
    pub limits: Limits,
}

/// Result of a worker claiming a submission for fan-out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeginProcessing {
    /// First claim; `total_test_cases` was set now.
    Started,
    /// Redelivered task; total stays as it was.
    Resumed { total: i32 },
    /// Verdict already reached; nothing to do.
    AlreadyFinal(SubmissionStatus),
}

/// What folding a single test completion did to the submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FoldOutcome {
    /// Counted while still processing; no verdict yet.
    Progress { passed: i32, total: i32 },
    /// This completion decided the verdict.
    Decided(SubmissionStatus),
    /// Verdict was already decided; folded for reporting only.
    ReportOnly,
    /// The test case already had a result line.
    Duplicate,
}

impl Submission {
    pub fn new(input: NewSubmission) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: input.user_id,
            problem_id: input.problem_id,
            contest_id: input.contest_id,
            code: input.code,
            language: input.language,
            limits: input.limits,
            status: SubmissionStatus::Pending,
            score: 0,
            test_cases_passed: 0,
            total_test_cases: 0,
            max_time_ms: 0,
            max_memory_kb: 0,
            results: Vec::new(),
            failed_test_case: None,
            compile_output: None,
            error_code: None,
            error_message: None,
            submitted_at: Utc::now(),
            queued_at: None,
            judge_completed_at: None,
        }
    }

    /// Move to `next`, stamping timestamps on the way.
    pub fn transition(&mut self, next: SubmissionStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        let now = Utc::now();
        if next == SubmissionStatus::Queued {
            self.queued_at = Some(now);
        }
        if next.is_final() {
            self.judge_completed_at = Some(now);
        }
        self.status = next;
        Ok(())
    }

    /// Record the queue acknowledgement. A no-op once a worker got there first.
    pub fn mark_queued(&mut self) -> bool {
        if self.status != SubmissionStatus::Pending {
            return false;
        }
        self.transition(SubmissionStatus::Queued).is_ok()
    }

    /// Claim the submission for fan-out over `total` test cases.
    pub fn begin_processing(&mut self, total: i32) -> Result<BeginProcessing, TransitionError> {
        match self.status {
            status if status.is_final() => Ok(BeginProcessing::AlreadyFinal(status)),
            SubmissionStatus::Processing => Ok(BeginProcessing::Resumed {
                total: self.total_test_cases,
            }),
            _ => {
                self.transition(SubmissionStatus::Processing)?;
                if self.queued_at.is_none() {
                    self.queued_at = Some(Utc::now());
                }
                self.total_test_cases = total;
                Ok(BeginProcessing::Started)
            }
        }
    }

    /// Fold one test completion.
    ///
    /// Time, memory and the result log are always updated. The verdict only moves
    /// while the submission is `Processing`: the first non-accepted completion wins,
    /// and reaching `passed == total` accepts.
    pub fn fold_completion(&mut self, completion: &TestCompletion) -> FoldOutcome {
        if self
            .results
            .iter()
            .any(|line| line.test_case_id == completion.test_case_id)
        {
            return FoldOutcome::Duplicate;
        }

        let completion = TestCompletion {
            verdict: self.refine_verdict(completion),
            ..completion.clone()
        };
        let verdict = completion.verdict;
        if let Some(t) = completion.time_ms {
            self.max_time_ms = self.max_time_ms.max(t);
        }
        if let Some(m) = completion.memory_kb {
            self.max_memory_kb = self.max_memory_kb.max(m);
        }

        let line = ResultLine::from_completion(&completion);
        let at = self
            .results
            .partition_point(|existing| existing.order_key() < line.order_key());
        self.results.insert(at, line);

        if self.status != SubmissionStatus::Processing {
            return FoldOutcome::ReportOnly;
        }

        if verdict.is_accepted() {
            self.test_cases_passed += 1;
            self.score = self.test_cases_passed;
            if self.test_cases_passed >= self.total_test_cases {
                self.test_cases_passed = self.total_test_cases;
                self.score = self.test_cases_passed;
                // Processing -> Accepted is always legal.
                let _ = self.transition(SubmissionStatus::Accepted);
                return FoldOutcome::Decided(SubmissionStatus::Accepted);
            }
            return FoldOutcome::Progress {
                passed: self.test_cases_passed,
                total: self.total_test_cases,
            };
        }

        let status = SubmissionStatus::from(verdict);
        self.failed_test_case = Some(completion.test_case_id);
        self.capture_failure_detail(verdict, &completion);
        let _ = self.transition(status);
        FoldOutcome::Decided(status)
    }

    /// Force `SystemError`. Returns false when a verdict was already reached.
    pub fn fail(&mut self, code: &str, message: impl Into<String>) -> bool {
        if self.status.is_final() {
            return false;
        }
        if self.transition(SubmissionStatus::SystemError).is_err() {
            return false;
        }
        self.error_code = Some(code.to_string());
        self.error_message = Some(message.into());
        true
    }

    /// Ordered, human readable result log.
    pub fn result_log(&self) -> Vec<String> {
        self.results.iter().map(|line| line.text.clone()).collect()
    }

    // The backend has no memory verdict of its own; a crash at the limit is MLE.
    fn refine_verdict(&self, completion: &TestCompletion) -> Verdict {
        match (completion.verdict, completion.memory_kb) {
            (Verdict::RuntimeError, Some(m)) if m >= self.limits.memory_limit_kb => {
                Verdict::MemoryLimitExceeded
            }
            (verdict, _) => verdict,
        }
    }

    fn capture_failure_detail(&mut self, verdict: Verdict, completion: &TestCompletion) {
        match verdict {
            Verdict::CompilationError => {
                self.compile_output = completion.compile_output.clone();
            }
            Verdict::RuntimeError | Verdict::SystemError => {
                self.error_message = completion
                    .stderr
                    .clone()
                    .filter(|s| !s.is_empty())
                    .or_else(|| completion.message.clone());
            }
            _ => {}
        }
    }
}
