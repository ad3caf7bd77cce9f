use serde_json::json;
use uuid::Uuid;

use crate::common::{TestApp, routes, submission_body};

mod submission_creation {
    use super::*;

    #[tokio::test]
    async fn queues_and_returns_id() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        app.create_test_cases(problem_id, &[("1", "1", false)]).await;

        let res = app.post(routes::SUBMISSIONS, &submission_body(problem_id)).await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["status"], "Queued");
        let id = res.id();
        assert_eq!(app.queue.len().await, 1);

        let res = app.get(&routes::submission(id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["language"], "python");
        assert_eq!(res.body["score"], 0);
        assert_eq!(res.body["limits"]["time_limit_ms"], 2000);
        assert!(res.body["queued_at"].is_string());
        assert!(res.body["results"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn problem_without_test_cases_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app
            .post(routes::SUBMISSIONS, &submission_body(Uuid::now_v7()))
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
        assert!(app.queue.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_submission_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app.get(&routes::submission(Uuid::now_v7())).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod request_validation {
    use super::*;

    async fn expect_rejected(app: &TestApp, body: serde_json::Value, code: &str) {
        let res = app.post(routes::SUBMISSIONS, &body).await;
        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.body["code"], code);
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        app.create_test_cases(problem_id, &[("1", "1", false)]).await;

        let mut empty = submission_body(problem_id);
        empty["code"] = json!("   ");
        expect_rejected(&app, empty, "VALIDATION_ERROR").await;

        let mut zero_time = submission_body(problem_id);
        zero_time["time_limit_ms"] = json!(0);
        expect_rejected(&app, zero_time, "VALIDATION_ERROR").await;

        let mut huge_memory = submission_body(problem_id);
        huge_memory["memory_limit_kb"] = json!(1 << 30);
        expect_rejected(&app, huge_memory, "VALIDATION_ERROR").await;

        let mut long_time = submission_body(problem_id);
        long_time["time_limit_ms"] = json!(60_000);
        expect_rejected(&app, long_time, "VALIDATION_ERROR").await;

        let mut huge_code = submission_body(problem_id);
        huge_code["code"] = json!("x".repeat(70_000));
        expect_rejected(&app, huge_code, "VALIDATION_ERROR").await;

        assert!(app.queue.is_empty().await);
    }

    #[tokio::test]
    async fn rejects_unsupported_language() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        app.create_test_cases(problem_id, &[("1", "1", false)]).await;

        let mut body = submission_body(problem_id);
        body["language"] = json!("brainfuck");
        let res = app.post(routes::SUBMISSIONS, &body).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "UNSUPPORTED_LANGUAGE");
        let message = res.body["message"].as_str().unwrap();
        assert!(message.contains("brainfuck"), "{message}");
        assert!(message.contains("python"), "{message}");
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let app = TestApp::spawn().await;
        let res = app.post_raw(routes::SUBMISSIONS, r#"{"code": "#).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let res = app
            .post(routes::SUBMISSIONS, &json!({"code": "print(1)"}))
            .await;
        assert_eq!(res.status, 400);
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let app = TestApp::spawn().await;
        let res = app.get(routes::HEALTH).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "ok");
        assert!(res.body["version"].is_string());
    }
}
