use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::config::JudgeConfig;
use common::CorrelationEntry;
use common::retry::{RetryPolicy, RetryTracker};
use common::worker::Task;
use exec_client::{ExecutionClient, ExecutorConfig};
use mq::MemoryTaskQueue;
use reqwest::Client;
use serde_json::{Value, json};
use server::config::AppConfig;
use server::judging::{ReconcileReport, ReconcileSettings, Reconciler};
use server::state::AppState;
use store::MemoryStore;
use tokio::sync::Mutex;
use uuid::Uuid;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};
use worker::{DispatchSettings, Orchestrator, TaskConsumer, TaskDisposition};

pub mod routes {
    use uuid::Uuid;

    pub const HEALTH: &str = "/api/v1/health";
    pub const SUBMISSIONS: &str = "/api/v1/submissions";
    pub const CALLBACK: &str = "/api/v1/judge/callback";

    pub fn submission(id: Uuid) -> String {
        format!("/api/v1/submissions/{id}")
    }

    pub fn test_cases(problem_id: Uuid) -> String {
        format!("/api/v1/problems/{problem_id}/test-cases")
    }

    pub fn test_case(problem_id: Uuid, tc_id: Uuid) -> String {
        format!("/api/v1/problems/{problem_id}/test-cases/{tc_id}")
    }

    pub fn rejudge(id: Uuid) -> String {
        format!("/api/v1/admin/submissions/{id}/rejudge")
    }

    pub fn abort(id: Uuid) -> String {
        format!("/api/v1/admin/submissions/{id}/abort")
    }
}

/// Backend status ids used in callbacks.
pub mod status {
    pub const PROCESSING: i32 = 2;
    pub const ACCEPTED: i32 = 3;
    pub const WRONG_ANSWER: i32 = 4;
}

/// A running test server plus the worker side, wired to a mock execution backend.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryTaskQueue>,
    pub backend: MockServer,
    consumer: TaskConsumer,
    reconciler: Reconciler,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let backend = MockServer::start().await;
        let issued = Arc::new(AtomicUsize::new(0));
        Mock::given(method("POST"))
            .and(path("/submissions"))
            .respond_with(move |_: &Request| {
                let n = issued.fetch_add(1, Ordering::SeqCst) + 1;
                ResponseTemplate::new(201).set_body_json(json!({ "token": format!("tok-{n}") }))
            })
            .mount(&backend)
            .await;
        // Anything polled is still running unless a test mounts something more specific.
        Mock::given(method("GET"))
            .and(path_regex(r"^/submissions/[^/]+$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": {"id": status::PROCESSING, "description": "Processing"},
            })))
            .with_priority(10)
            .mount(&backend)
            .await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        let config = AppConfig {
            executor: ExecutorConfig {
                base_url: backend.uri(),
                max_retries: 0,
                ..Default::default()
            },
            judge: JudgeConfig {
                callback_base_url: format!("http://{addr}"),
                ..Default::default()
            },
            ..Default::default()
        };

        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryTaskQueue::new());
        let client_backend =
            Arc::new(ExecutionClient::new(&config.executor).expect("Failed to build client"));

        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            client_backend.clone(),
            DispatchSettings::from(&config.judge),
        ));
        let retries = Arc::new(Mutex::new(RetryTracker::new(RetryPolicy {
            max_retries: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        })));
        let consumer = TaskConsumer::new(
            orchestrator,
            store.clone(),
            retries,
            Duration::from_secs(10),
        );

        let state = AppState::new(config.clone(), store.clone(), queue.clone());
        let reconciler = Reconciler::new(
            store.clone(),
            client_backend,
            state.aggregator.clone(),
            ReconcileSettings::from(&config.judge),
        );

        let app = server::build_router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            store,
            queue,
            backend,
            consumer,
            reconciler,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_raw(&self, path: &str, body: &'static str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Create test cases via the API and return their ids in request order.
    /// Each item is `(input, expected_output, hidden)`; positions start at 1.
    pub async fn create_test_cases(
        &self,
        problem_id: Uuid,
        cases: &[(&str, &str, bool)],
    ) -> Vec<Uuid> {
        let body: Vec<Value> = cases
            .iter()
            .enumerate()
            .map(|(i, (input, expected, hidden))| {
                json!({
                    "input": input,
                    "expected_output": expected,
                    "hidden": hidden,
                    "position": i + 1,
                })
            })
            .collect();
        let res = self.post(&routes::test_cases(problem_id), &Value::Array(body)).await;
        assert_eq!(res.status, 201, "create_test_cases failed: {}", res.text);
        res.body
            .as_array()
            .expect("array of test cases")
            .iter()
            .map(|tc| tc["id"].as_str().unwrap().parse().unwrap())
            .collect()
    }

    /// Create a submission via the API and return its `id`.
    pub async fn create_submission(&self, problem_id: Uuid) -> Uuid {
        let res = self.post(routes::SUBMISSIONS, &submission_body(problem_id)).await;
        assert_eq!(res.status, 201, "create_submission failed: {}", res.text);
        res.id()
    }

    /// Deliver every queued task to the worker, as the broker would.
    pub async fn run_worker(&self) -> Vec<TaskDisposition> {
        let mut dispositions = Vec::new();
        for task in self.queue.drain().await {
            dispositions.push(self.consumer.handle(task).await);
        }
        dispositions
    }

    /// Hand one task to the worker, as a broker redelivery would.
    pub async fn deliver(&self, task: Task) -> TaskDisposition {
        self.consumer.handle(task).await
    }

    /// Correlation tokens of a submission, in test order.
    pub fn tokens(&self, submission_id: Uuid) -> Vec<String> {
        self.store
            .entries_for(submission_id)
            .into_iter()
            .map(|e: CorrelationEntry| e.token)
            .collect()
    }

    /// Deliver a backend callback for `token`.
    pub async fn callback(&self, token: &str, status_id: i32, stdout: &str) -> TestResponse {
        self.put(
            routes::CALLBACK,
            &json!({
                "token": token,
                "status": {"id": status_id, "description": ""},
                "stdout": stdout,
                "stderr": null,
                "compile_output": null,
                "message": null,
                "time": "0.010",
                "memory": 1024,
            }),
        )
        .await
    }

    pub async fn reconcile_at(&self, now: DateTime<Utc>) -> ReconcileReport {
        self.reconciler
            .reconcile_at(now)
            .await
            .expect("reconcile pass failed")
    }

    /// Number of runs submitted to the mock backend so far.
    pub async fn backend_submits(&self) -> usize {
        self.backend
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == "POST")
            .count()
    }
}

pub fn submission_body(problem_id: Uuid) -> Value {
    json!({
        "user_id": Uuid::now_v7(),
        "problem_id": problem_id,
        "contest_id": null,
        "code": "print(input())",
        "language": "python",
        "time_limit_ms": 2000,
        "memory_limit_kb": 65536,
    })
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> Uuid {
        self.body["id"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("response body should contain a uuid 'id'")
    }
}
