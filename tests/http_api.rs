mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use colabri_rooms::build_app;
use colabri_rooms::models::{ErrorResponse, RoomCreateResponse, SessionResponse};
use common::*;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn signup(app: &Router, username: &str) -> SessionResponse {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/auth/signup",
        None,
        Some(json!({"username": username, "password": format!("{}-pw", username)})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = build_app(test_state());
    let (status, body) = call(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = call(&app, Method::GET, "/api/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signup_validates_and_rejects_duplicates() {
    let app = build_app(test_state());
    signup(&app, "alice").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/auth/signup",
        None,
        Some(json!({"username": "alice", "password": "other"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let error: ErrorResponse = serde_json::from_value(body).unwrap();
    assert_eq!(error.code, 409);

    let (status, _) = call(&app, Method::POST, "/api/v1/auth/signup", None, Some(json!({"username": "bob"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signin_rotates_the_session_token() {
    let app = build_app(test_state());
    let first = signup(&app, "alice").await;

    let (status, body) = call(&app, Method::GET, "/api/v1/auth/me", Some(&first.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/auth/signin",
        None,
        Some(json!({"username": "alice", "password": "alice-pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second: SessionResponse = serde_json::from_value(body).unwrap();
    assert_ne!(first.token, second.token);

    let (status, _) = call(&app, Method::GET, "/api/v1/auth/me", Some(&first.token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, Method::GET, "/api/v1/auth/me", Some(&second.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/auth/signin",
        None,
        Some(json!({"username": "alice", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = build_app(test_state());
    let (status, body) = call(&app, Method::GET, "/api/v1/rooms", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);

    let (status, _) = call(&app, Method::GET, "/api/v1/rooms", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn room_lifecycle_over_http() {
    let app = build_app(test_state());
    let owner = signup(&app, "olivia").await;
    let bob = signup(&app, "bob").await;

    let (status, body) = call(&app, Method::POST, "/api/v1/rooms", Some(&owner.token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let room: RoomCreateResponse = serde_json::from_value(body).unwrap();
    let room_uri = format!("/api/v1/rooms/{}", room.room_id);

    // The creator holds no entry until joining, so file operations are refused
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("{}/files", room_uri),
        Some(&owner.token),
        Some(json!({"name": "early.md"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("{}/files/file-missing", room_uri),
        Some(&owner.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = call(&app, Method::GET, "/api/v1/rooms", Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["role"], "none");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}/join", room_uri),
        Some(&owner.token),
        Some(json!({"password": room.password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "owner");

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("{}/join", room_uri),
        Some(&bob.token),
        Some(json!({"password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}/join", room_uri),
        Some(&bob.token),
        Some(json!({"password": room.password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "pending");

    // Pending users cannot create files, non-owners cannot approve
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("{}/files", room_uri),
        Some(&bob.token),
        Some(json!({"name": "a.md"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let approve_uri = format!("{}/members/{}/approve", room_uri, bob.user_id);
    let (status, _) = call(&app, Method::POST, &approve_uri, Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, Method::POST, &approve_uri, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "member");

    // Approving twice is an invalid transition
    let (status, _) = call(&app, Method::POST, &approve_uri, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("{}/members/{}/role", room_uri, bob.user_id),
        Some(&owner.token),
        Some(json!({"role": "superuser"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}/files", room_uri),
        Some(&bob.token),
        Some(json!({"name": "a.md"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let file_uri = format!("{}/files/{}", room_uri, body["fileId"].as_str().unwrap());

    let (status, body) = call(&app, Method::GET, &room_uri, Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files"].as_array().unwrap().len(), 1);
    assert_eq!(body["members"].as_array().unwrap().len(), 2);

    let (status, _) = call(&app, Method::DELETE, &file_uri, Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    for _ in 0..2 {
        let (status, body) = call(&app, Method::DELETE, &file_uri, Some(&owner.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    let (status, _) = call(&app, Method::DELETE, &room_uri, Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::DELETE, &room_uri, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, &room_uri, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = call(&app, Method::GET, &format!("{}/role", room_uri), Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{}", body);
}

#[tokio::test]
async fn diagnostics_is_admin_only() {
    let app = build_app(test_state());
    let admin = signup(&app, "admin").await;
    let user = signup(&app, "alice").await;

    let (status, _) = call(&app, Method::GET, "/api/v1/diagnostics", Some(&user.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, Method::GET, "/api/v1/diagnostics", Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["n_conn"], 0);
}
