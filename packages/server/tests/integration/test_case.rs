use serde_json::json;
use uuid::Uuid;

use crate::common::{TestApp, routes};

mod test_case_crud {
    use super::*;

    #[tokio::test]
    async fn create_single_and_batch() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();

        let res = app
            .post(
                &routes::test_cases(problem_id),
                &json!({"input": "5", "expected_output": "10", "position": 3}),
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body.as_array().unwrap().len(), 1);
        assert_eq!(res.body[0]["hidden"], false);
        assert_eq!(res.body[0]["problem_id"], problem_id.to_string());

        app.create_test_cases(problem_id, &[("1", "2", false), ("2", "4", true)])
            .await;

        let res = app.get(&routes::test_cases(problem_id)).await;
        assert_eq!(res.status, 200);
        let positions: Vec<i64> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|tc| tc["position"].as_i64().unwrap())
            .collect();
        assert_eq!(positions, [1, 2, 3]);
    }

    #[tokio::test]
    async fn get_update_delete() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        let ids = app.create_test_cases(problem_id, &[("1", "2", false)]).await;
        let path = routes::test_case(problem_id, ids[0]);

        let res = app.get(&path).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["expected_output"], "2");

        let res = app
            .patch(&path, &json!({"expected_output": "3", "hidden": true}))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["expected_output"], "3");
        assert_eq!(res.body["hidden"], true);
        assert_eq!(res.body["input"], "1");

        let res = app.delete(&path).await;
        assert_eq!(res.status, 204);
        let res = app.get(&path).await;
        assert_eq!(res.status, 404);
        let res = app.delete(&path).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn scoped_to_problem() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        let ids = app.create_test_cases(problem_id, &[("1", "2", false)]).await;

        let res = app.get(&routes::test_case(Uuid::now_v7(), ids[0])).await;
        assert_eq!(res.status, 404);
        let res = app.get(&routes::test_cases(Uuid::now_v7())).await;
        assert_eq!(res.status, 200);
        assert!(res.body.as_array().unwrap().is_empty());
    }
}

mod request_validation {
    use super::*;

    #[tokio::test]
    async fn position_must_be_positive() {
        let app = TestApp::spawn().await;
        let problem_id = Uuid::now_v7();
        let res = app
            .post(
                &routes::test_cases(problem_id),
                &json!({"input": "1", "expected_output": "1", "position": 0}),
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let ids = app.create_test_cases(problem_id, &[("1", "1", false)]).await;
        let res = app
            .patch(&routes::test_case(problem_id, ids[0]), &json!({"position": -1}))
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app
            .post(&routes::test_cases(Uuid::now_v7()), &json!([]))
            .await;
        assert_eq!(res.status, 400);
    }
}
