use chrono::Utc;
use common::error_code;
use uuid::Uuid;
use worker::{JudgeOutcome, TaskDisposition};

use crate::common::{TestApp, routes, status};

mod full_pipeline {
    use super::*;

    #[tokio::test]
    async fn all_visible_accepted() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        app.create_test_cases(
            problem_id,
            &[("1", "1", false), ("2", "2", false), ("3", "3", false)],
        )
        .await;
        let id = app.create_submission(problem_id).await;

        let dispositions = app.run_worker().await;
        assert_eq!(
            dispositions,
            [TaskDisposition::Completed(JudgeOutcome::Dispatched {
                dispatched: 3,
                skipped: 0
            })]
        );
        let processing = app.get(&routes::submission(id)).await;
        assert_eq!(processing.body["status"], "Processing");
        assert_eq!(processing.body["total_test_cases"], 3);

        let tokens = app.tokens(id);
        assert_eq!(tokens.len(), 3);
        // Completion order differs from test order.
        for i in [2, 0, 1] {
            let res = app.callback(&tokens[i], status::ACCEPTED, "ok").await;
            assert_eq!(res.status, 200, "{}", res.text);
            assert_eq!(res.body["status"], "processed");
        }

        let res = app.get(&routes::submission(id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "Accepted");
        assert_eq!(res.body["score"], 3);
        assert_eq!(res.body["test_cases_passed"], 3);
        assert_eq!(res.body["total_test_cases"], 3);
        assert_eq!(res.body["max_time_ms"], 10);
        assert_eq!(res.body["max_memory_kb"], 1024);
        assert!(res.body["failed_test_case"].is_null());
        assert!(res.body["judge_completed_at"].is_string());

        let positions: Vec<i64> = res.body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|line| line["position"].as_i64().unwrap())
            .collect();
        assert_eq!(positions, [1, 2, 3]);
        assert_eq!(
            res.body["results"][0]["text"],
            "Test #1 (visible): Accepted [10 ms, 1024 KB]"
        );
    }

    #[tokio::test]
    async fn second_test_wrong_answer() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        let cases = app
            .create_test_cases(
                problem_id,
                &[("1", "1", false), ("2", "2", false), ("3", "3", true)],
            )
            .await;
        let id = app.create_submission(problem_id).await;
        app.run_worker().await;

        let tokens = app.tokens(id);
        app.callback(&tokens[0], status::ACCEPTED, "1").await;
        app.callback(&tokens[1], status::WRONG_ANSWER, "7").await;
        // Folded for reporting after the verdict.
        app.callback(&tokens[2], status::ACCEPTED, "3").await;

        let res = app.get(&routes::submission(id)).await;
        assert_eq!(res.body["status"], "WrongAnswer");
        assert_eq!(res.body["failed_test_case"], cases[1].to_string());
        assert_eq!(res.body["score"], 1);
        assert_eq!(res.body["test_cases_passed"], 1);
        assert_eq!(res.body["total_test_cases"], 3);

        let results = res.body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[1]["text"],
            "Test #2 (visible): Wrong Answer [10 ms, 1024 KB]: expected \"2\", got \"7\""
        );
        assert_eq!(results[2]["text"], "Test #3 (hidden): Accepted [10 ms, 1024 KB]");
    }

    #[tokio::test]
    async fn silent_backend_times_out() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        app.create_test_cases(problem_id, &[("1", "1", false), ("2", "2", false)])
            .await;
        let id = app.create_submission(problem_id).await;
        app.run_worker().await;

        let tokens = app.tokens(id);
        app.callback(&tokens[0], status::ACCEPTED, "1").await;

        // Still inside the budget: the silent token is polled but left alone.
        let early = app
            .reconcile_at(Utc::now() + chrono::Duration::seconds(60))
            .await;
        assert_eq!(early.polled, 1);
        assert_eq!(early.timed_out, 0);
        let res = app.get(&routes::submission(id)).await;
        assert_eq!(res.body["status"], "Processing");

        let past_budget = Utc::now() + chrono::Duration::seconds(301);
        let report = app.reconcile_at(past_budget).await;
        assert_eq!(report.abandoned, 1);
        assert_eq!(report.timed_out, 1);

        let res = app.get(&routes::submission(id)).await;
        assert_eq!(res.body["status"], "SystemError");
        assert_eq!(res.body["error_code"], error_code::BACKEND_TIMEOUT);
        assert!(res.body["judge_completed_at"].is_string());
        assert_eq!(res.body["test_cases_passed"], 1);

        // A late callback cannot change the verdict.
        let late = app.callback(&tokens[1], status::ACCEPTED, "2").await;
        assert_eq!(late.body["status"], "ignored");
    }
}

mod redelivery {
    use super::*;

    #[tokio::test]
    async fn redelivered_task_does_not_redispatch() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        app.create_test_cases(problem_id, &[("1", "1", false), ("2", "2", false)])
            .await;
        let id = app.create_submission(problem_id).await;

        let task = app.queue.drain().await.remove(0);
        let first = app.deliver(task.clone()).await;
        assert_eq!(
            first,
            TaskDisposition::Completed(JudgeOutcome::Dispatched {
                dispatched: 2,
                skipped: 0
            })
        );
        let second = app.deliver(task).await;
        assert_eq!(
            second,
            TaskDisposition::Completed(JudgeOutcome::Dispatched {
                dispatched: 0,
                skipped: 2
            })
        );
        assert_eq!(app.backend_submits().await, 2);

        for token in app.tokens(id) {
            app.callback(&token, status::ACCEPTED, "").await;
        }
        let res = app.get(&routes::submission(id)).await;
        assert_eq!(res.body["status"], "Accepted");
        assert_eq!(res.body["total_test_cases"], 2);
        assert_eq!(res.body["score"], 2);
    }

    #[tokio::test]
    async fn redelivery_after_verdict_is_noop() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        app.create_test_cases(problem_id, &[("1", "1", false)]).await;
        let id = app.create_submission(problem_id).await;

        let task = app.queue.drain().await.remove(0);
        app.deliver(task.clone()).await;
        let token = app.tokens(id).remove(0);
        app.callback(&token, status::ACCEPTED, "1").await;

        let again = app.deliver(task).await;
        assert!(matches!(
            again,
            TaskDisposition::Completed(JudgeOutcome::AlreadyFinal(_))
        ));
        assert_eq!(app.backend_submits().await, 1);
    }
}

mod lost_callbacks {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn reconciler_recovers_by_polling() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        app.create_test_cases(problem_id, &[("1", "1", false)]).await;
        let id = app.create_submission(problem_id).await;
        app.run_worker().await;

        let token = app.tokens(id).remove(0);
        Mock::given(method("GET"))
            .and(path(format!("/submissions/{token}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": {"id": status::ACCEPTED, "description": "Accepted"},
                "stdout": "1\n",
                "time": "0.002",
                "memory": 900,
            })))
            .with_priority(1)
            .mount(&app.backend)
            .await;

        let report = app
            .reconcile_at(Utc::now() + chrono::Duration::seconds(31))
            .await;
        assert_eq!(report.folded, 1);

        let res = app.get(&routes::submission(id)).await;
        assert_eq!(res.body["status"], "Accepted");
        assert_eq!(res.body["max_memory_kb"], 900);
    }
}
