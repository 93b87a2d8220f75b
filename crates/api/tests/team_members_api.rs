//! HTTP-level integration tests for the single-record roster endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_json};
use roster_core::ports::RosterStore;
use serde_json::json;

const TEAM_MEMBERS: &str = "/api/v1/team-members";

#[tokio::test]
async fn create_team_member_returns_201() {
    let app = common::build_test_app();

    let response = post_json(
        app.app(),
        TEAM_MEMBERS,
        json!({
            "name": "Jane Doe",
            "email": "jane@example.com",
            "role": "Engineer",
            "employment_type": "FullTime",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["data"]["id"].is_number());
    assert_eq!(json["data"]["email"], "jane@example.com");
    assert_eq!(json["data"]["employment_type"], "FullTime");

    let response = get(app.app(), TEAM_MEMBERS).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_email_returns_409_regardless_of_case() {
    let app = common::build_test_app();
    let member = |email: &str| {
        json!({
            "name": "Jane Doe",
            "email": email,
            "role": "Engineer",
            "employment_type": "PartTime",
        })
    };

    let response = post_json(app.app(), TEAM_MEMBERS, member("jane@example.com")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(app.app(), TEAM_MEMBERS, member("JANE@example.com")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");

    assert_eq!(app.store.entry_count().await, 1);
}

#[tokio::test]
async fn invalid_email_returns_400() {
    let app = common::build_test_app();

    let response = post_json(
        app.app(),
        TEAM_MEMBERS,
        json!({
            "name": "Jane Doe",
            "email": "not-an-email",
            "role": "Engineer",
            "employment_type": "Intern",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(app.store.entry_count().await, 0);
}

#[tokio::test]
async fn unknown_employment_type_is_rejected() {
    let app = common::build_test_app();

    let response = post_json(
        app.app(),
        TEAM_MEMBERS,
        json!({
            "name": "Jane Doe",
            "email": "jane@example.com",
            "role": "Engineer",
            "employment_type": "full-time",
        }),
    )
    .await;

    assert!(response.status().is_client_error());
    assert_eq!(app.store.entry_count().await, 0);
}

#[tokio::test]
async fn list_is_empty_for_fresh_store() {
    let app = common::build_test_app();

    let response = get(app.app(), TEAM_MEMBERS).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"].as_array().unwrap().is_empty());
    assert!(app.store.find_all().await.unwrap().is_empty());
}
