use common::error_code;
use uuid::Uuid;

use crate::common::{TestApp, routes, status};

mod rejudge {
    use super::*;

    #[tokio::test]
    async fn creates_fresh_submission() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        app.create_test_cases(problem_id, &[("1", "1", false)]).await;
        let id = app.create_submission(problem_id).await;
        app.run_worker().await;
        let token = app.tokens(id).remove(0);
        app.callback(&token, status::WRONG_ANSWER, "0").await;

        let res = app.post(&routes::rejudge(id), &serde_json::json!({})).await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["status"], "Queued");
        let fresh = res.id();
        assert_ne!(fresh, id);

        let original = app.get(&routes::submission(id)).await;
        assert_eq!(original.body["status"], "WrongAnswer");

        app.run_worker().await;
        let token = app.tokens(fresh).remove(0);
        app.callback(&token, status::ACCEPTED, "1").await;
        let res = app.get(&routes::submission(fresh)).await;
        assert_eq!(res.body["status"], "Accepted");
        assert_eq!(res.body["problem_id"], problem_id.to_string());
    }

    #[tokio::test]
    async fn unknown_submission_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app
            .post(&routes::rejudge(Uuid::now_v7()), &serde_json::json!({}))
            .await;
        assert_eq!(res.status, 404);
    }
}

mod abort {
    use super::*;

    #[tokio::test]
    async fn aborts_once() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        app.create_test_cases(problem_id, &[("1", "1", false)]).await;
        let id = app.create_submission(problem_id).await;

        let res = app.post(&routes::abort(id), &serde_json::json!({})).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "SystemError");
        assert_eq!(res.body["error_code"], error_code::ABORTED);

        let res = app.post(&routes::abort(id), &serde_json::json!({})).await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");

        // The queued task finds a final verdict and dispatches nothing.
        app.run_worker().await;
        assert_eq!(app.backend_submits().await, 0);
    }
}
