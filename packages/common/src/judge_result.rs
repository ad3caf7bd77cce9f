use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::submission_status::Verdict;

/// Longest excerpt of program output kept in a visible result line.
const EXCERPT_LIMIT: usize = 64;

/// A classified execution result for one test case, ready to be folded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCompletion {
    pub test_case_id: Uuid,
    pub position: i32,
    pub hidden: bool,
    pub verdict: Verdict,
    pub time_ms: Option<i32>,
    pub memory_kb: Option<i32>,
    pub expected_output: String,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    /// Free-form backend message, used for system errors.
    pub message: Option<String>,
}

/// One human readable entry of a submission's result log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ResultLine {
    pub position: i32,
    pub test_case_id: Uuid,
    pub hidden: bool,
    pub verdict: Verdict,
    pub time_ms: Option<i32>,
    pub memory_kb: Option<i32>,
    pub text: String,
}

impl ResultLine {
    pub fn from_completion(completion: &TestCompletion) -> Self {
        Self {
            position: completion.position,
            test_case_id: completion.test_case_id,
            hidden: completion.hidden,
            verdict: completion.verdict,
            time_ms: completion.time_ms,
            memory_kb: completion.memory_kb,
            text: render_line(completion),
        }
    }

    pub fn order_key(&self) -> (i32, Uuid) {
        (self.position, self.test_case_id)
    }
}

fn render_line(c: &TestCompletion) -> String {
    let visibility = if c.hidden { "hidden" } else { "visible" };
    let mut line = format!("Test #{} ({visibility}): {}", c.position, c.verdict.label());

    match (c.time_ms, c.memory_kb) {
        (Some(t), Some(m)) => line.push_str(&format!(" [{t} ms, {m} KB]")),
        (Some(t), None) => line.push_str(&format!(" [{t} ms]")),
        (None, Some(m)) => line.push_str(&format!(" [{m} KB]")),
        (None, None) => {}
    }

    // Hidden data never leaves the store.
    if !c.hidden && c.verdict == Verdict::WrongAnswer {
        let got = c.stdout.as_deref().unwrap_or_default();
        line.push_str(&format!(
            ": expected {:?}, got {:?}",
            excerpt(&c.expected_output),
            excerpt(got)
        ));
    }
    line
}

fn excerpt(s: &str) -> String {
    let trimmed = s.trim_end();
    if trimmed.chars().count() <= EXCERPT_LIMIT {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(EXCERPT_LIMIT).collect();
    out.push_str("...");
    out
}
