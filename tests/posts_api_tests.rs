// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post API tests: CRUD, ownership, scheduling and publish-now.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use medium_publisher::services::medium::MockBehavior;
use serde_json::{json, Value};

mod common;
use common::{create_linked_user, create_test_app, create_test_jwt, create_user, json_request, TestApp};

async fn create_post(app: &TestApp, token: &str, body: Value) -> Value {
    let (status, post) = common::send_json(
        &app.router,
        json_request("POST", "/api/posts", Some(token), Some(body)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", post);
    post
}

#[tokio::test]
async fn test_create_and_get_post() {
    let app = create_test_app();
    let user = create_user(&app.state, "w@example.com").await;
    let token = create_test_jwt(&user.user_id, &app.state.config.jwt_signing_key);

    let post = create_post(
        &app,
        &token,
        json!({
            "title": "  First post  ",
            "content": "# Hello\n\nWorld",
            "tags": ["rust", " rust ", "axum", ""],
            "canonical_url": "https://blog.example.com/first",
            "license": "cc-40-by"
        }),
    )
    .await;

    assert_eq!(post["title"], "First post");
    assert_eq!(post["content_format"], "markdown");
    assert_eq!(post["tags"], json!(["rust", "axum"]));
    assert_eq!(post["publish_status"], "public");
    assert_eq!(post["license"], "cc-40-by");
    assert_eq!(post["publish_state"], "draft");
    assert_eq!(post["published"], false);
    assert!(post["scheduled_at"].is_null());

    let post_id = post["post_id"].as_str().unwrap();
    let (status, fetched) = common::send_json(
        &app.router,
        json_request("GET", &format!("/api/posts/{}", post_id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["content"], "# Hello\n\nWorld");

    let (_, as_html) = common::send_json(
        &app.router,
        json_request(
            "GET",
            &format!("/api/posts/{}?format=html", post_id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(as_html["content_format"], "html");
    assert!(as_html["content"].as_str().unwrap().contains("<h1>Hello</h1>"));
}

#[tokio::test]
async fn test_create_validation() {
    let app = create_test_app();
    let user = create_user(&app.state, "w@example.com").await;
    let token = create_test_jwt(&user.user_id, &app.state.config.jwt_signing_key);

    let too_many_tags: Vec<String> = (0..6).map(|i| format!("tag{}", i)).collect();
    for body in [
        json!({"title": "", "content": "x"}),
        json!({"title": "x".repeat(101), "content": "x"}),
        json!({"title": "T", "content": ""}),
        json!({"title": "T", "content": "x", "tags": too_many_tags}),
        json!({"title": "T", "content": "x", "tags": ["x".repeat(26)]}),
        json!({"title": "T", "content": "x", "canonical_url": "not a url"}),
        json!({"title": "T", "content": "x", "scheduled_at": "tomorrow"}),
    ] {
        let response = common::send(
            &app.router,
            json_request("POST", "/api/posts", Some(&token), Some(body.clone())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
    }

    // Unknown enum values are rejected by the JSON extractor
    let response = common::send(
        &app.router,
        json_request(
            "POST",
            "/api/posts",
            Some(&token),
            Some(json!({"title": "T", "content": "x", "publish_status": "secret"})),
        ),
    )
    .await;
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_other_users_posts_are_not_found() {
    let app = create_test_app();
    let alice = create_user(&app.state, "alice@example.com").await;
    let mallory = create_linked_user(&app.state, "mallory@example.com").await;
    let alice_token = create_test_jwt(&alice.user_id, &app.state.config.jwt_signing_key);
    let mallory_token = create_test_jwt(&mallory.user_id, &app.state.config.jwt_signing_key);

    let post = create_post(&app, &alice_token, json!({"title": "Mine", "content": "x"})).await;
    let uri = format!("/api/posts/{}", post["post_id"].as_str().unwrap());

    for request in [
        json_request("GET", &uri, Some(&mallory_token), None),
        json_request(
            "PUT",
            &uri,
            Some(&mallory_token),
            Some(json!({"title": "Stolen", "content": "x"})),
        ),
        json_request("DELETE", &uri, Some(&mallory_token), None),
        json_request("POST", &format!("{}/publish", uri), Some(&mallory_token), None),
    ] {
        let response = common::send(&app.router, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
    assert_eq!(app.medium.publish_calls(), 0);

    // Still intact for the owner
    let (_, fetched) =
        common::send_json(&app.router, json_request("GET", &uri, Some(&alice_token), None)).await;
    assert_eq!(fetched["title"], "Mine");
}

#[tokio::test]
async fn test_update_and_delete() {
    let app = create_test_app();
    let user = create_user(&app.state, "w@example.com").await;
    let token = create_test_jwt(&user.user_id, &app.state.config.jwt_signing_key);

    let post = create_post(&app, &token, json!({"title": "Draft", "content": "x"})).await;
    let uri = format!("/api/posts/{}", post["post_id"].as_str().unwrap());

    let (status, updated) = common::send_json(
        &app.router,
        json_request(
            "PUT",
            &uri,
            Some(&token),
            Some(json!({
                "title": "Final",
                "content": "<p>Hi</p>",
                "content_format": "html",
                "publish_status": "draft"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Final");
    assert_eq!(updated["content_format"], "html");
    assert_eq!(updated["publish_status"], "draft");

    let response = common::send(&app.router, json_request("DELETE", &uri, Some(&token), None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = common::send(&app.router, json_request("GET", &uri, Some(&token), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = common::send(&app.router, json_request("DELETE", &uri, Some(&token), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_schedule_and_unschedule() {
    let app = create_test_app();
    let user = create_user(&app.state, "w@example.com").await;
    let token = create_test_jwt(&user.user_id, &app.state.config.jwt_signing_key);

    let post = create_post(&app, &token, json!({"title": "Later", "content": "x"})).await;
    let uri = format!("/api/posts/{}/schedule", post["post_id"].as_str().unwrap());
    let when = (Utc::now() + Duration::days(2)).to_rfc3339();

    let (status, scheduled) = common::send_json(
        &app.router,
        json_request("PUT", &uri, Some(&token), Some(json!({"scheduled_at": when}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scheduled["publish_state"], "pending");
    assert!(scheduled["scheduled_at"].as_str().unwrap().ends_with('Z'));

    let response = common::send(
        &app.router,
        json_request("PUT", &uri, Some(&token), Some(json!({"scheduled_at": "soon"}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, unscheduled) =
        common::send_json(&app.router, json_request("DELETE", &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unscheduled["publish_state"], "draft");
    assert!(unscheduled["scheduled_at"].is_null());
}

#[tokio::test]
async fn test_create_with_schedule_is_pending() {
    let app = create_test_app();
    let user = create_user(&app.state, "w@example.com").await;
    let token = create_test_jwt(&user.user_id, &app.state.config.jwt_signing_key);

    let post = create_post(
        &app,
        &token,
        json!({
            "title": "Timed",
            "content": "x",
            "scheduled_at": "2030-01-01T09:00:00+02:00"
        }),
    )
    .await;

    assert_eq!(post["publish_state"], "pending");
    assert_eq!(post["scheduled_at"], "2030-01-01T07:00:00.000Z");
}

#[tokio::test]
async fn test_publish_now_and_locked_afterwards() {
    let app = create_test_app();
    let user = create_linked_user(&app.state, "w@example.com").await;
    let token = create_test_jwt(&user.user_id, &app.state.config.jwt_signing_key);

    let post = create_post(
        &app,
        &token,
        json!({"title": "Ship it", "content": "**bold**", "tags": ["news"]}),
    )
    .await;
    let uri = format!("/api/posts/{}", post["post_id"].as_str().unwrap());

    let (status, published) = common::send_json(
        &app.router,
        json_request("POST", &format!("{}/publish", uri), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["published"], true);
    assert_eq!(published["publish_state"], "published");
    assert!(published["medium_post_id"].as_str().is_some());
    assert!(published["medium_url"]
        .as_str()
        .unwrap()
        .starts_with("https://medium.com/"));

    let created = app.medium.created_posts();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].1.content_format, "html");
    assert!(created[0].1.content.contains("<strong>bold</strong>"));

    // Publishing again, editing, scheduling: all refused
    let response = common::send(
        &app.router,
        json_request("POST", &format!("{}/publish", uri), Some(&token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = common::send(
        &app.router,
        json_request(
            "PUT",
            &uri,
            Some(&token),
            Some(json!({"title": "Edit", "content": "x"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = common::send(
        &app.router,
        json_request(
            "PUT",
            &format!("{}/schedule", uri),
            Some(&token),
            Some(json!({"scheduled_at": "2030-01-01T00:00:00Z"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(app.medium.publish_calls(), 1);
}

#[tokio::test]
async fn test_publish_now_rejected_keeps_draft() {
    let app = create_test_app();
    let user = create_linked_user(&app.state, "w@example.com").await;
    let token = create_test_jwt(&user.user_id, &app.state.config.jwt_signing_key);
    app.medium
        .set_behavior(MockBehavior::Reject("Invalid tag".to_string()));

    let post = create_post(&app, &token, json!({"title": "Nope", "content": "x"})).await;
    let uri = format!("/api/posts/{}", post["post_id"].as_str().unwrap());

    let (status, body) = common::send_json(
        &app.router,
        json_request("POST", &format!("{}/publish", uri), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "publish_rejected");

    let (_, fetched) =
        common::send_json(&app.router, json_request("GET", &uri, Some(&token), None)).await;
    assert_eq!(fetched["publish_state"], "draft");
    assert_eq!(fetched["published"], false);
    assert_eq!(fetched["last_failure"]["kind"], "rejected");
    // Manual attempts do not count against the retry budget
    assert_eq!(fetched["publish_attempts"], 0);
}

#[tokio::test]
async fn test_publish_now_remote_revocation_is_403() {
    let app = create_test_app();
    let user = create_linked_user(&app.state, "w@example.com").await;
    let token = create_test_jwt(&user.user_id, &app.state.config.jwt_signing_key);
    app.medium.set_behavior(MockBehavior::Revoked);

    let post = create_post(&app, &token, json!({"title": "T", "content": "x"})).await;

    let (status, body) = common::send_json(
        &app.router,
        json_request(
            "POST",
            &format!("/api/posts/{}/publish", post["post_id"].as_str().unwrap()),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "medium_reauth_required");
}

#[tokio::test]
async fn test_disconnect_medium() {
    let app = create_test_app();
    let user = create_linked_user(&app.state, "w@example.com").await;
    let token = create_test_jwt(&user.user_id, &app.state.config.jwt_signing_key);

    let (_, me) =
        common::send_json(&app.router, json_request("GET", "/api/me", Some(&token), None)).await;
    assert_eq!(me["medium_connected"], true);

    let (status, me) = common::send_json(
        &app.router,
        json_request("DELETE", "/api/me/medium", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["medium_connected"], false);

    let stored = app.state.db.get_user(&user.user_id).await.unwrap().unwrap();
    assert!(stored.medium_access_token.is_none());
}

#[tokio::test]
async fn test_content_convert_endpoint() {
    let app = create_test_app();
    let user = create_user(&app.state, "w@example.com").await;
    let token = create_test_jwt(&user.user_id, &app.state.config.jwt_signing_key);

    let (status, body) = common::send_json(
        &app.router,
        json_request(
            "POST",
            "/api/content/convert",
            Some(&token),
            Some(json!({"content": "*hi*", "from": "markdown", "to": "html"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["format"], "html");
    assert!(body["content"].as_str().unwrap().contains("<em>hi</em>"));

    let response = common::send(
        &app.router,
        json_request(
            "POST",
            "/api/content/convert",
            None,
            Some(json!({"content": "*hi*", "from": "markdown", "to": "html"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
