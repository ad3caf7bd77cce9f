use serde_json::json;
use uuid::Uuid;

use crate::common::{TestApp, routes, status};

async fn judged_once(app: &TestApp, cases: &[(&str, &str, bool)]) -> (Uuid, Vec<String>) {
    let problem_id = Uuid::now_v7();
    app.create_test_cases(problem_id, cases).await;
    let id = app.create_submission(problem_id).await;
    app.run_worker().await;
    (id, app.tokens(id))
}

mod delivery {
    use super::*;

    #[tokio::test]
    async fn duplicate_callback_is_ignored() {
        let app = TestApp::spawn().await;
        let (id, tokens) = judged_once(&app, &[("1", "1", false), ("2", "2", false)]).await;

        let first = app.callback(&tokens[0], status::ACCEPTED, "1").await;
        assert_eq!(first.body["status"], "processed");
        let again = app.callback(&tokens[0], status::ACCEPTED, "1").await;
        assert_eq!(again.status, 200);
        assert_eq!(again.body["status"], "ignored");

        let res = app.get(&routes::submission(id)).await;
        assert_eq!(res.body["test_cases_passed"], 1);
        assert_eq!(res.body["results"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["status"], "Processing");
    }

    #[tokio::test]
    async fn unknown_token_is_acknowledged() {
        let app = TestApp::spawn().await;
        let res = app.callback("never-issued", status::ACCEPTED, "").await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "ignored");
    }

    #[tokio::test]
    async fn non_terminal_status_keeps_entry_open() {
        let app = TestApp::spawn().await;
        let (id, tokens) = judged_once(&app, &[("1", "1", false)]).await;

        let running = app.callback(&tokens[0], status::PROCESSING, "").await;
        assert_eq!(running.status, 200);
        assert_eq!(running.body["status"], "ignored");

        let done = app.callback(&tokens[0], status::ACCEPTED, "1").await;
        assert_eq!(done.body["status"], "processed");
        let res = app.get(&routes::submission(id)).await;
        assert_eq!(res.body["status"], "Accepted");
    }

    #[tokio::test]
    async fn post_is_accepted_too() {
        let app = TestApp::spawn().await;
        let (id, tokens) = judged_once(&app, &[("1", "1", false)]).await;

        let res = app
            .post(
                routes::CALLBACK,
                &json!({
                    "token": tokens[0],
                    "status": {"id": status::ACCEPTED, "description": "Accepted"},
                    "stdout": "1\n",
                    "time": "0.004",
                    "memory": 512,
                }),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "processed");

        let res = app.get(&routes::submission(id)).await;
        assert_eq!(res.body["status"], "Accepted");
        assert_eq!(res.body["max_time_ms"], 4);
    }
}

mod verdicts {
    use super::*;

    #[tokio::test]
    async fn compile_error_keeps_compiler_output() {
        let app = TestApp::spawn().await;
        let (id, tokens) = judged_once(&app, &[("1", "1", false), ("2", "2", false)]).await;

        let res = app
            .put(
                routes::CALLBACK,
                &json!({
                    "token": tokens[1],
                    "status": {"id": 6, "description": "Compilation Error"},
                    "compile_output": "main.py: syntax error",
                }),
            )
            .await;
        assert_eq!(res.body["status"], "processed");

        let res = app.get(&routes::submission(id)).await;
        assert_eq!(res.body["status"], "CompilationError");
        assert_eq!(res.body["compile_output"], "main.py: syntax error");
        assert_eq!(res.body["score"], 0);
    }

    #[tokio::test]
    async fn runtime_error_over_memory_limit_is_mle() {
        let app = TestApp::spawn().await;
        let (id, tokens) = judged_once(&app, &[("1", "1", false)]).await;

        let res = app
            .put(
                routes::CALLBACK,
                &json!({
                    "token": tokens[0],
                    "status": {"id": 11, "description": "Runtime Error (NZEC)"},
                    "time": "0.100",
                    "memory": 70000,
                }),
            )
            .await;
        assert_eq!(res.body["status"], "processed");

        let res = app.get(&routes::submission(id)).await;
        assert_eq!(res.body["status"], "MemoryLimitExceeded");
    }
}

mod request_validation {
    use super::*;

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app
            .put(
                routes::CALLBACK,
                &json!({"status": {"id": status::ACCEPTED, "description": "Accepted"}}),
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app.post_raw(routes::CALLBACK, "{not json").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}
