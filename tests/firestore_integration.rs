// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running:
//!   gcloud emulators firestore start --host-port=localhost:8081
//!   FIRESTORE_EMULATOR_HOST=localhost:8081 cargo test --test firestore_integration
//!
//! Every test uses fresh IDs, so runs against a shared emulator don't collide.

use chrono::{Duration, Utc};
use medium_publisher::error::AppError;
use medium_publisher::models::{FailureKind, Post, PostFields, PublishFailure, PublishState, User};

mod common;
use common::test_db;

fn unique_email() -> String {
    format!("{}@example.com", uuid::Uuid::new_v4())
}

fn test_post(user_id: &str, scheduled_at: Option<chrono::DateTime<Utc>>) -> Post {
    let fields = PostFields {
        title: "Emulator post".to_string(),
        content: "Body".to_string(),
        tags: vec!["test".to_string()],
        ..PostFields::default()
    };
    Post::new(user_id, fields, scheduled_at, Utc::now())
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_create_and_lookup_by_email() {
    require_emulator!();

    let db = test_db().await;
    let email = unique_email();
    let user = User::new(&email, "Emu Writer", "hash".to_string(), Utc::now());

    assert!(db.get_user(&user.user_id).await.unwrap().is_none());
    db.create_user(&user).await.unwrap();

    let fetched = db.get_user(&user.user_id).await.unwrap().unwrap();
    assert_eq!(fetched.email, email);
    assert_eq!(fetched.name, "Emu Writer");

    let by_email = db
        .get_user_by_email(&email.to_uppercase())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_email.user_id, user.user_id);
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    require_emulator!();

    let db = test_db().await;
    let email = unique_email();
    db.create_user(&User::new(&email, "A", "h".to_string(), Utc::now()))
        .await
        .unwrap();

    let second = User::new(&email, "B", "h".to_string(), Utc::now());
    assert!(matches!(
        db.create_user(&second).await,
        Err(AppError::Conflict(_))
    ));
    assert!(db.get_user(&second.user_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_medium_link_persists() {
    require_emulator!();

    let db = test_db().await;
    let mut user = User::new(&unique_email(), "Linked", "h".to_string(), Utc::now());
    db.create_user(&user).await.unwrap();

    let expires = Utc::now() + Duration::days(60);
    user.link_medium(
        "author-1".to_string(),
        "access".to_string(),
        "refresh".to_string(),
        expires,
        Utc::now(),
    );
    db.upsert_user(&user).await.unwrap();

    let fetched = db.get_user(&user.user_id).await.unwrap().unwrap();
    let credentials = fetched.medium_credentials(Utc::now()).unwrap();
    assert_eq!(credentials.medium_user_id, "author-1");
    assert_eq!(credentials.access_token, "access");
}

// ═══════════════════════════════════════════════════════════════════════════
// POST TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_post_crud_and_listing() {
    require_emulator!();

    let db = test_db().await;
    let user_id = uuid::Uuid::new_v4().to_string();
    let first = test_post(&user_id, None);
    db.create_post(&first).await.unwrap();
    let second = test_post(&user_id, Some(Utc::now() + Duration::days(1)));
    db.create_post(&second).await.unwrap();

    let fetched = db.get_post(&first.post_id).await.unwrap().unwrap();
    assert_eq!(fetched.tags, vec!["test".to_string()]);
    assert_eq!(fetched.publish_state, PublishState::Draft);

    let all = db.list_posts_for_user(&user_id, None, 10, 0).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].post_id, second.post_id);

    let pending = db
        .list_posts_for_user(&user_id, Some(PublishState::Pending), 10, 0)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);

    assert!(db.delete_post(&first.post_id, |_| Ok(())).await.unwrap());
    assert!(db.get_post(&first.post_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_due_query_and_atomic_claim() {
    require_emulator!();

    let db = test_db().await;
    let user_id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();
    let due = test_post(&user_id, Some(now - Duration::minutes(1)));
    db.create_post(&due).await.unwrap();

    let found = db.find_due_posts(now, 500).await.unwrap();
    assert!(found.iter().any(|p| p.post_id == due.post_id));

    let claimed = db
        .update_post_atomic(&due.post_id, |p| {
            if !p.is_due(now) {
                return Err(AppError::Conflict("not due".to_string()));
            }
            Ok(p.mark_publishing(now))
        })
        .await
        .unwrap();
    assert_eq!(claimed, Some(PublishState::Pending));

    // Second claim sees the new state
    let again = db
        .update_post_atomic(&due.post_id, |p| {
            if !p.is_due(now) {
                return Err(AppError::Conflict("not due".to_string()));
            }
            Ok(p.mark_publishing(now))
        })
        .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    let stuck = db
        .find_posts_in_state(PublishState::Publishing, 500)
        .await
        .unwrap();
    assert!(stuck.iter().any(|p| p.post_id == due.post_id));
}

#[tokio::test]
async fn test_held_posts_do_not_starve_due_query() {
    require_emulator!();

    let db = test_db().await;
    let user_id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();
    let long_ago = now - Duration::days(365 * 20);

    let mut held_ids = Vec::new();
    for _ in 0..3 {
        let held = test_post(&user_id, Some(long_ago));
        db.create_post(&held).await.unwrap();
        db.update_post_atomic(&held.post_id, |p| {
            let previous = p.mark_publishing(now);
            p.release(
                previous,
                PublishFailure {
                    kind: FailureKind::Rejected,
                    message: "Invalid canonical URL".to_string(),
                    at: now,
                },
                0,
                None,
            );
            Ok(())
        })
        .await
        .unwrap();
        held_ids.push(held.post_id);
    }

    let fresh = test_post(&user_id, Some(now - Duration::seconds(1)));
    db.create_post(&fresh).await.unwrap();

    // Held posts sort first by schedule, but must not use up the batch
    let found = db.find_due_posts(now, 3).await.unwrap();
    assert!(!found.is_empty());
    assert!(found.iter().all(|p| !held_ids.contains(&p.post_id)));
}
