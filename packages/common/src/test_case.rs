use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One input/expected-output pair of a problem.
///
/// Test cases are judged in ascending `position`; ties fall back to `id` so the
/// order is total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub input: String,
    pub expected_output: String,
    /// Hidden cases never expose their data in result lines.
    pub hidden: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl TestCase {
    pub fn new(
        problem_id: Uuid,
        input: impl Into<String>,
        expected_output: impl Into<String>,
        hidden: bool,
        position: i32,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            problem_id,
            input: input.into(),
            expected_output: expected_output.into(),
            hidden,
            position,
            created_at: Utc::now(),
        }
    }

    /// Key that defines judging order.
    pub fn order_key(&self) -> (i32, Uuid) {
        (self.position, self.id)
    }
}

/// Sort test cases into judging order.
pub fn sort_for_judging(cases: &mut [TestCase]) {
    cases.sort_by_key(TestCase::order_key);
}
