//! Registration, login and token checks through the HTTP surface.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let (status, body) = app
        .post_json(
            "/api/register",
            None,
            json!({ "username": "alice", "email": "other@example.com", "password": "pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username or email already exists");

    let (status, _) = app
        .post_json(
            "/api/register",
            None,
            json!({ "username": "alice2", "email": "alice@example.com", "password": "pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(
        app.count("SELECT COUNT(*) FROM users WHERE username = 'alice'").await,
        1
    );
}

#[tokio::test]
async fn registration_requires_fields_and_valid_email() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post_json("/api/register", None, json!({ "username": "alice" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All fields are required");

    let (status, _) = app
        .post_json(
            "/api/register",
            None,
            json!({ "username": "alice", "email": "not-an-email", "password": "pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.count("SELECT COUNT(*) FROM users").await, 0);
}

#[tokio::test]
async fn login_returns_a_token_that_identifies_the_user() {
    let app = TestApp::new().await;
    let (alice_id, _) = app.register("alice").await;

    let (status, body) = app
        .post_json(
            "/api/login",
            None,
            json!({ "username": "alice", "password": "password123" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert!(body["user"].get("password_hash").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, me) = app.get("/api/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], alice_id);
    assert_eq!(me["username"], "alice");
    assert_eq!(me["email"], "alice@example.com");
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let app = TestApp::new().await;
    app.register("alice").await;

    for body in [
        json!({ "username": "alice", "password": "wrong" }),
        json!({ "username": "nobody", "password": "password123" }),
    ] {
        let (status, body) = app.post_json("/api/login", None, body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }

    let (status, _) = app
        .post_json("/api/login", None, json!({ "username": "alice" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_token_is_401_and_bad_token_is_403() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/posts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Access token required");

    let (status, body) = app.get("/api/posts", "not.a.jwt").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let app = TestApp::new().await;
    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        axum::http::Request::builder()
            .uri("/api/me")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(headers["referrer-policy"], "no-referrer");
}
