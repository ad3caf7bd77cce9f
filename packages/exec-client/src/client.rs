use std::time::Duration;

use async_trait::async_trait;
use common::retry::calculate_backoff;
use reqwest::{RequestBuilder, Response};
use tracing::{debug, warn};

use crate::error::{ExecError, ExecResult};
use crate::language::language_id;
use crate::types::{ExecutionOutcome, ExecutionRequest, ExecutorConfig, SubmitBody, SubmitResponse};

const AUTH_HEADER: &str = "X-Auth-Token";
const MAX_BACKOFF_MS: u64 = 5_000;

/// Submit/poll protocol of an execution backend.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Queue a run and return its token.
    async fn submit(&self, request: &ExecutionRequest) -> ExecResult<String>;

    /// Fetch the current outcome of a run.
    async fn poll(&self, token: &str) -> ExecResult<ExecutionOutcome>;
}

#[derive(Debug, Clone)]
pub struct ExecutionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u8,
    retry_base_delay_ms: u64,
}

impl ExecutionClient {
    pub fn new(config: &ExecutorConfig) -> ExecResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            max_retries: config.max_retries,
            retry_base_delay_ms: config.retry_base_delay_ms,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(AUTH_HEADER, key),
            None => request,
        }
    }

    /// Send with retries on transport failures. `build` is called once per attempt.
    async fn send<F>(&self, build: F) -> ExecResult<Response>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut retries = 0u8;
        loop {
            match self.send_once(self.authorized(build())).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    let backoff =
                        calculate_backoff(retries, self.retry_base_delay_ms, MAX_BACKOFF_MS);
                    warn!(
                        error = %e,
                        retry = retries,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "Retrying execution backend request"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // The only place that interprets HTTP status codes.
    async fn send_once(&self, request: RequestBuilder) -> ExecResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        match status.as_u16() {
            200..=299 => Ok(response),
            401 | 403 => Err(ExecError::Unauthorized),
            502..=504 => Err(ExecError::Unavailable {
                status: status.as_u16(),
            }),
            code => {
                let body = response.text().await.unwrap_or_default();
                Err(ExecError::Backend { status: code, body })
            }
        }
    }
}

#[async_trait]
impl ExecutionBackend for ExecutionClient {
    async fn submit(&self, request: &ExecutionRequest) -> ExecResult<String> {
        let language_id = language_id(&request.language)?;
        let body = SubmitBody {
            source_code: &request.source_code,
            language_id,
            stdin: &request.stdin,
            expected_output: &request.expected_output,
            cpu_time_limit: request.cpu_time_limit_secs,
            memory_limit: request.memory_limit_kb,
            callback_url: request.callback_url.as_deref(),
        };
        let url = format!("{}/submissions", self.base_url);

        let response = self
            .send(|| {
                self.http
                    .post(&url)
                    .query(&[("base64_encoded", "false"), ("wait", "false")])
                    .json(&body)
            })
            .await?;
        let SubmitResponse { token } = response.json().await?;
        if token.is_empty() {
            return Err(ExecError::Decode("empty token".into()));
        }
        debug!(token = %token, language_id, "Submitted run");
        Ok(token)
    }

    async fn poll(&self, token: &str) -> ExecResult<ExecutionOutcome> {
        let url = format!("{}/submissions/{}", self.base_url, token);
        let response = self
            .send(|| self.http.get(&url).query(&[("base64_encoded", "false")]))
            .await?;
        let outcome: ExecutionOutcome = response.json().await?;
        debug!(token, status_id = outcome.status.id, "Polled run");
        Ok(outcome)
    }
}
