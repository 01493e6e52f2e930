// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use medium_publisher::config::Config;
use medium_publisher::db::Database;
use medium_publisher::middleware::auth::create_jwt;
use medium_publisher::models::User;
use medium_publisher::routes::create_router;
use medium_publisher::services::medium::mock::MOCK_AUTHOR_ID;
use medium_publisher::services::MockMediumApi;
use medium_publisher::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection against the emulator.
#[allow(dead_code)]
pub async fn test_db() -> Database {
    let url = medium_publisher::config::DatabaseUrl::Firestore {
        project_id: "test-project".to_string(),
    };
    Database::connect(&url)
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Router plus the pieces tests poke at directly.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub medium: Arc<MockMediumApi>,
    pub uploads: tempfile::TempDir,
}

/// Create a test app with an in-memory store and a mock Medium.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::default())
}

#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> TestApp {
    create_test_app_with_config(Config {
        frontend_url: frontend_url.to_string(),
        ..Config::default()
    })
}

#[allow(dead_code)]
pub fn create_test_app_with_config(mut config: Config) -> TestApp {
    let uploads = tempfile::tempdir().expect("Failed to create upload dir");
    config.upload_dir = uploads.path().to_path_buf();

    let medium = Arc::new(MockMediumApi::new());
    let state = Arc::new(AppState::new(config, Database::in_memory(), medium.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        medium,
        uploads,
    }
}

/// Store a user without Medium credentials.
#[allow(dead_code)]
pub async fn create_user(state: &AppState, email: &str) -> User {
    let user = User::new(email, "Test Writer", "unused-hash".to_string(), Utc::now());
    state.db.create_user(&user).await.expect("create user");
    user
}

/// Store a user whose Medium token is valid for another month.
#[allow(dead_code)]
pub async fn create_linked_user(state: &AppState, email: &str) -> User {
    let mut user = create_user(state, email).await;
    let now = Utc::now();
    user.link_medium(
        MOCK_AUTHOR_ID.to_string(),
        "access-token".to_string(),
        "refresh-token".to_string(),
        now + Duration::days(30),
        now,
    );
    state.db.upsert_user(&user).await.expect("link user");
    user
}

/// Create a session token the way login does.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    create_jwt(user_id, signing_key).expect("Failed to create JWT")
}

/// Build a request with an optional bearer token and JSON body.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send one request through a clone of the router.
#[allow(dead_code)]
pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

/// Send a request and decode the JSON body (Null for an empty body).
#[allow(dead_code)]
pub async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = send(router, request).await;
    let status = response.status();
    (status, body_json(response).await)
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}
