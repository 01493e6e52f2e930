// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post listing pagination tests.
//!
//! These tests verify that:
//! 1. Pagination parameters are validated correctly
//! 2. Integer underflows/overflows are prevented
//! 3. Pages are newest-first, disjoint, and report `has_more`

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use medium_publisher::models::{Post, PostFields};

mod common;
use common::{create_test_app, create_test_jwt, create_user, json_request};

/// Store `count` posts with distinct creation times, oldest first.
async fn seed_posts(state: &medium_publisher::AppState, user_id: &str, count: usize) {
    let base = Utc::now() - Duration::hours(1);
    for i in 0..count {
        let fields = PostFields {
            title: format!("Post {}", i),
            content: "Body".to_string(),
            ..PostFields::default()
        };
        let post = Post::new(user_id, fields, None, base + Duration::seconds(i as i64));
        state.db.create_post(&post).await.unwrap();
    }
}

#[tokio::test]
async fn test_pagination_underflow() {
    let app = create_test_app();
    let user = create_user(&app.state, "p@example.com").await;
    let token = create_test_jwt(&user.user_id, &app.state.config.jwt_signing_key);

    // page=0 would underflow (0-1) in the offset computation
    let response = common::send(
        &app.router,
        json_request("GET", "/api/posts?page=0&per_page=10", Some(&token), None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_per_page_bounds() {
    let app = create_test_app();
    let user = create_user(&app.state, "p@example.com").await;
    let token = create_test_jwt(&user.user_id, &app.state.config.jwt_signing_key);

    for uri in [
        "/api/posts?per_page=0",
        "/api/posts?per_page=101",
        "/api/posts?page=4294967295&per_page=100",
        "/api/posts?page=-1",
        "/api/posts?state=bogus",
    ] {
        let response = common::send(&app.router, json_request("GET", uri, Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_pages_are_newest_first_and_disjoint() {
    let app = create_test_app();
    let user = create_user(&app.state, "p@example.com").await;
    let token = create_test_jwt(&user.user_id, &app.state.config.jwt_signing_key);
    seed_posts(&app.state, &user.user_id, 5).await;

    let (status, first) = common::send_json(
        &app.router,
        json_request("GET", "/api/posts?page=1&per_page=2", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["has_more"], true);
    let titles: Vec<&str> = first["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Post 4", "Post 3"]);

    let (_, last) = common::send_json(
        &app.router,
        json_request("GET", "/api/posts?page=3&per_page=2", Some(&token), None),
    )
    .await;
    assert_eq!(last["has_more"], false);
    assert_eq!(last["posts"].as_array().unwrap().len(), 1);
    assert_eq!(last["posts"][0]["title"], "Post 0");

    let (_, past_end) = common::send_json(
        &app.router,
        json_request("GET", "/api/posts?page=10&per_page=2", Some(&token), None),
    )
    .await;
    assert!(past_end["posts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_listing_is_scoped_to_owner_and_state() {
    let app = create_test_app();
    let alice = create_user(&app.state, "alice@example.com").await;
    let bob = create_user(&app.state, "bob@example.com").await;
    seed_posts(&app.state, &alice.user_id, 3).await;
    seed_posts(&app.state, &bob.user_id, 2).await;

    let scheduled = Post::new(
        &alice.user_id,
        PostFields {
            title: "Later".to_string(),
            content: "Body".to_string(),
            ..PostFields::default()
        },
        Some(Utc::now() + Duration::days(1)),
        Utc::now(),
    );
    app.state.db.create_post(&scheduled).await.unwrap();

    let token = create_test_jwt(&alice.user_id, &app.state.config.jwt_signing_key);

    let (_, all) = common::send_json(
        &app.router,
        json_request("GET", "/api/posts", Some(&token), None),
    )
    .await;
    assert_eq!(all["posts"].as_array().unwrap().len(), 4);
    assert_eq!(all["page"], 1);
    assert_eq!(all["per_page"], 20);

    let (_, pending) = common::send_json(
        &app.router,
        json_request("GET", "/api/posts?state=pending", Some(&token), None),
    )
    .await;
    let pending = pending["posts"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["title"], "Later");
}
