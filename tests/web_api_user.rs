//! Web API User Tests
//!
//! Integration tests for signup, signin, signout and user info.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{authed, create_test_app, signup_and_signin, TEST_PASSWORD};

#[tokio::test]
async fn test_signup() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/user/signup")
        .json(&json!({ "username": "alice", "password": TEST_PASSWORD }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["created"], true);

    // Same username again is reported, not rejected
    let response = app
        .server
        .post("/api/user/signup")
        .json(&json!({ "username": "alice", "password": "another-password" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["created"], false);
}

#[tokio::test]
async fn test_signup_validation() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/user/signup")
        .json(&json!({ "username": "al", "password": TEST_PASSWORD }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["details"]["username"].is_array());

    let response = app
        .server
        .post("/api/user/signup")
        .json(&json!({ "username": "alice", "password": "short" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .server
        .post("/api/user/signup")
        .json(&json!({ "username": "bad name", "password": TEST_PASSWORD }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_signup_malformed_json() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/user/signup")
        .bytes("{not json".into())
        .content_type("application/json")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signin_wrong_password() {
    let app = create_test_app().await;
    signup_and_signin(&app.server, "alice").await;

    let response = app
        .server
        .post("/api/user/signin")
        .json(&json!({ "username": "alice", "password": "wrong-password" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .post("/api/user/signin")
        .json(&json!({ "username": "nobody", "password": TEST_PASSWORD }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_info() {
    let app = create_test_app().await;
    let token = signup_and_signin(&app.server, "alice").await;

    let response = authed(app.server.get("/api/user/info"), &token).await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("token").is_none());
}

#[tokio::test]
async fn test_user_info_requires_token() {
    let app = create_test_app().await;

    let response = app.server.get("/api/user/info").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = authed(app.server.get("/api/user/info"), "garbage").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_second_signin_invalidates_first_token() {
    let app = create_test_app().await;
    let first = signup_and_signin(&app.server, "alice").await;

    let response = app
        .server
        .post("/api/user/signin")
        .json(&json!({ "username": "alice", "password": TEST_PASSWORD }))
        .await;
    let second = response.json::<Value>()["data"]["token"]
        .as_str()
        .unwrap()
        .to_string();

    authed(app.server.get("/api/user/info"), &first)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    authed(app.server.get("/api/user/info"), &second)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_signout() {
    let app = create_test_app().await;
    let token = signup_and_signin(&app.server, "alice").await;

    let response = authed(app.server.post("/api/user/signout"), &token).await;
    response.assert_status(StatusCode::NO_CONTENT);

    authed(app.server.get("/api/user/info"), &token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
