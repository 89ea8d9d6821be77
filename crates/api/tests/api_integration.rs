//! API integration tests.
//!
//! These tests verify the API endpoints work correctly together, driving
//! the real router against mock databases.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use pollpad_api::{middleware::AppState, router as api_router};
use pollpad_core::{PollService, ResponseService, UserService};
use pollpad_db::entities::poll::{self, PollKind};
use pollpad_db::repositories::{PollRepository, ResponseRepository, UserRepository};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

fn mcq_poll(is_live: bool) -> poll::Model {
    poll::Model {
        id: "poll1".to_string(),
        title: "Best Snack".to_string(),
        question: "Which snack wins?".to_string(),
        description: None,
        kind: PollKind::Mcq,
        options: json!(["Chips", "Fruit"]),
        code: "123456".to_string(),
        is_live,
        created_by: "user1".to_string(),
        total_responses: 0,
        option_counts: json!([0, 0]),
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

/// Build a router whose response service sees the given poll store and
/// response store; everything else runs against empty mocks.
fn router_with(ingest_poll_db: MockDatabase, response_db: MockDatabase) -> Router {
    let empty = || Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

    let state = AppState {
        user_service: UserService::new(UserRepository::new(empty())),
        poll_service: PollService::new(PollRepository::new(empty())),
        response_service: ResponseService::new(
            PollRepository::new(Arc::new(ingest_poll_db.into_connection())),
            ResponseRepository::new(Arc::new(response_db.into_connection())),
            "test-secret".to_string(),
        ),
    };

    api_router().with_state(state)
}

fn submit_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .uri("/polls/123456/responses")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_submit_to_unknown_code_returns_404() {
    let app = router_with(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<poll::Model>::new()]),
        MockDatabase::new(DatabaseBackend::Postgres),
    );

    let response = app
        .oneshot(submit_request(json!({
            "optionIndex": 0,
            "name": "Ada",
            "email": "ada@example.com"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_to_closed_poll_returns_403() {
    let app = router_with(
        MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[mcq_poll(false)]]),
        MockDatabase::new(DatabaseBackend::Postgres),
    );

    let response = app
        .oneshot(submit_request(json!({
            "optionIndex": 0,
            "name": "Ada",
            "email": "ada@example.com"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_submit_out_of_range_index_returns_400() {
    let app = router_with(
        MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[mcq_poll(true)]]),
        MockDatabase::new(DatabaseBackend::Postgres),
    );

    let response = app
        .oneshot(submit_request(json!({
            "optionIndex": 2,
            "name": "Ada",
            "email": "ada@example.com"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_first_submission_returns_201_with_created_flag() {
    let poll_db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[mcq_poll(true)]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }]);
    let response_db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<pollpad_db::entities::response::Model>::new()])
        .append_query_results([vec![maplit::btreemap! {
            "created" => sea_orm::Value::Bool(Some(true))
        }]]);

    let app = router_with(poll_db, response_db);

    let response = app
        .oneshot(submit_request(json!({
            "optionIndex": 0,
            "name": "Ada",
            "email": "ada@example.com"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["created"], json!(true));
}

#[tokio::test]
async fn test_public_summary_returns_counts() {
    let mut poll = mcq_poll(true);
    poll.option_counts = json!([1, 2]);
    poll.total_responses = 3;

    // Both the poll service (code lookup) and the summary read come from
    // the poll store mocks.
    let empty = || Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
    let poll_lookup_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll]])
            .into_connection(),
    );

    let state = AppState {
        user_service: UserService::new(UserRepository::new(empty())),
        poll_service: PollService::new(PollRepository::new(poll_lookup_db)),
        response_service: ResponseService::new(
            PollRepository::new(empty()),
            ResponseRepository::new(empty()),
            "test-secret".to_string(),
        ),
    };
    let app = api_router().with_state(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/polls/code/123456/summary")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["kind"], json!("mcq"));
    assert_eq!(json["data"]["counts"], json!([1, 2]));
    assert_eq!(json["data"]["total"], json!(3));
}

#[tokio::test]
async fn test_creator_endpoints_require_auth() {
    for (method, uri) in [
        ("GET", "/polls"),
        ("POST", "/polls"),
        ("GET", "/polls/overview"),
        ("GET", "/polls/poll1/summary"),
        ("GET", "/polls/poll1/responses"),
        ("GET", "/polls/poll1/respondents"),
    ] {
        let app = router_with(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let mut builder = Request::builder().uri(uri).method(method);
        let body = if method == "POST" {
            builder = builder.header("Content-Type", "application/json");
            Body::from("{}")
        } else {
            Body::empty()
        };

        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();

        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {uri} should require auth"
        );
    }
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = router_with(
        MockDatabase::new(DatabaseBackend::Postgres),
        MockDatabase::new(DatabaseBackend::Postgres),
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent/endpoint")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signup_with_invalid_json_returns_error() {
    let app = router_with(
        MockDatabase::new(DatabaseBackend::Postgres),
        MockDatabase::new(DatabaseBackend::Postgres),
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/signup")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from("invalid json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        response.status() == StatusCode::BAD_REQUEST
            || response.status() == StatusCode::UNPROCESSABLE_ENTITY
    );
}
