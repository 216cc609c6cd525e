//! Shared test utilities
//!
//! Builds the router over a fresh in-memory database. The sitting cache
//! defaults to a zero TTL so reads always hit the store; caching tests
//! opt into a real TTL explicitly.

use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use examreg_api::cache::SittingCache;
use examreg_api::{build_router, AppState};
use examreg_common::student_id::{StudentIdCodec, DEFAULT_SALT};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::time::Duration;
use tower::util::ServiceExt;

pub async fn test_pool() -> SqlitePool {
    // Single connection: an in-memory database exists per connection.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    examreg_common::db::init_database(&pool)
        .await
        .expect("Failed to initialize schema");
    pool
}

pub async fn setup_app_with_ttl(ttl: Duration) -> (Router, SqlitePool) {
    let pool = test_pool().await;
    let codec = StudentIdCodec::new(DEFAULT_SALT).expect("codec");
    let state = AppState::new(pool.clone(), SittingCache::new(ttl), codec);
    (build_router(state), pool)
}

pub async fn setup_app() -> (Router, SqlitePool) {
    setup_app_with_ttl(Duration::ZERO).await
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub async fn body_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Issue a request and return (status, parsed JSON body).
pub async fn send(app: &Router, request: Request<Body>) -> (axum::http::StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = body_json(response.into_body()).await;
    (status, body)
}

/// Create a faculty through the API and return its id.
pub async fn create_faculty(app: &Router, name: &str) -> String {
    let (status, body) = send(
        app,
        json_request("POST", "/api/faculties", &serde_json::json!({ "name": name })),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

/// Create a semester under a faculty through the API and return its id.
pub async fn create_semester(app: &Router, faculty_id: &str, name: &str) -> String {
    let uri = format!("/api/faculties/{}/semesters", faculty_id);
    let (status, body) = send(
        app,
        json_request("POST", &uri, &serde_json::json!({ "name": name })),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

/// Register a student through the API and return its id.
pub async fn create_student(
    app: &Router,
    student_id: &str,
    name: &str,
    faculty: &str,
    semester: &str,
) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/students",
            &serde_json::json!({
                "studentId": student_id,
                "name": name,
                "faculty": faculty,
                "semester": semester,
            }),
        ),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}
