use serde::{Deserialize, Deserializer, Serialize};

/// Connection settings for the execution backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Default: "http://localhost:2358".
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as `X-Auth-Token` when present.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Default: 10.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Transport retries per call. Default: 2.
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    /// Default: 200.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:2358".into()
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u8 {
    2
}
fn default_retry_base_delay_ms() -> u64 {
    200
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

/// A single program run.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub source_code: String,
    /// Language name, resolved through [`crate::language_id`].
    pub language: String,
    pub stdin: String,
    pub expected_output: String,
    pub cpu_time_limit_secs: f64,
    pub memory_limit_kb: i32,
    /// Where the backend should push the outcome.
    pub callback_url: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct SubmitBody<'a> {
    pub source_code: &'a str,
    pub language_id: i32,
    pub stdin: &'a str,
    pub expected_output: &'a str,
    pub cpu_time_limit: f64,
    pub memory_limit: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<&'a str>,
}

#[derive(Deserialize)]
pub(crate) struct SubmitResponse {
    pub token: String,
}

/// Backend status ids.
pub mod status {
    pub const IN_QUEUE: i32 = 1;
    pub const PROCESSING: i32 = 2;
    pub const ACCEPTED: i32 = 3;
    pub const WRONG_ANSWER: i32 = 4;
    pub const TIME_LIMIT_EXCEEDED: i32 = 5;
    pub const COMPILATION_ERROR: i32 = 6;
    /// 7 through 12 are runtime error flavours (SIGSEGV, SIGXFSZ, SIGFPE, SIGABRT, NZEC, other).
    pub const RUNTIME_ERROR_FIRST: i32 = 7;
    pub const RUNTIME_ERROR_LAST: i32 = 12;
    pub const INTERNAL_ERROR: i32 = 13;
    pub const EXEC_FORMAT_ERROR: i32 = 14;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct BackendStatus {
    pub id: i32,
    #[serde(default)]
    pub description: String,
}

impl BackendStatus {
    /// False while the run is still queued or executing.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.id, status::IN_QUEUE | status::PROCESSING)
    }
}

/// What the backend reports for a run, either polled or pushed to the callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ExecutionOutcome {
    /// Present in callback payloads.
    #[serde(default)]
    pub token: Option<String>,
    pub status: BackendStatus,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// CPU time in seconds. The backend sends it as a decimal string.
    #[serde(default, deserialize_with = "seconds")]
    pub time: Option<f64>,
    /// Peak memory in KB.
    #[serde(default)]
    pub memory: Option<i64>,
}

impl ExecutionOutcome {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn time_ms(&self) -> Option<i32> {
        self.time
            .filter(|t| t.is_finite() && *t >= 0.0)
            .map(|t| (t * 1000.0).round().min(f64::from(i32::MAX)) as i32)
    }

    pub fn memory_kb(&self) -> Option<i32> {
        self.memory.map(|m| i32::try_from(m.max(0)).unwrap_or(i32::MAX))
    }
}

fn seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(f64),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
