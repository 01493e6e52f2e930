// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile plus Medium credentials)
//! - User emails (uniqueness index)
//! - Posts (content, schedule and publish state)

use crate::db::collections;
use crate::error::AppError;
use crate::models::user::normalize_email;
use crate::models::{Post, PublishState, User};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Document in `user_emails`, keyed by the URL-encoded normalized email.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmailIndex {
    user_id: String,
}

fn email_doc_id(email: &str) -> String {
    urlencoding::encode(&normalize_email(email)).into_owned()
}

/// Per-post locks serializing read-modify-write cycles in this process.
///
/// Entries are dropped once no task holds or waits on them, so the map only
/// grows with the number of posts being written concurrently.
#[derive(Default)]
struct PostLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PostLocks {
    fn acquire(&self, post_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(post_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Give back a lock from `acquire` after its guard is dropped.
    fn release(&self, post_id: &str, lock: Arc<Mutex<()>>) {
        // One reference is the map's, the other is `lock`
        self.locks.remove_if(post_id, |_, held| {
            Arc::ptr_eq(held, &lock) && Arc::strong_count(held) <= 2
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Firestore-backed store.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
    post_locks: Arc<PostLocks>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        let client = if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            Self::create_emulator_client(project_id).await?
        } else {
            let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
                AppError::Database(format!("Failed to connect to Firestore: {}", e))
            })?;
            tracing::info!(project = project_id, "Connected to Firestore");
            client
        };

        Ok(Self {
            client,
            post_locks: Arc::new(PostLocks::default()),
        })
    }

    /// Emulator connection with a dummy unsigned token.
    async fn create_emulator_client(project_id: &str) -> Result<firestore::FirestoreDb, AppError> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJlbXVsYXRvciJ9."
                        .to_string()
                        .into(),
                ),
                expiry: Utc::now() + chrono::Duration::hours(1),
            })
        });

        let client = firestore::FirestoreDb::with_options_token_source(
            firestore::FirestoreDbOptions::new(project_id.to_string()),
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore emulator");
        Ok(client)
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let index: Option<EmailIndex> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::USER_EMAILS)
            .obj()
            .one(&email_doc_id(email))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match index {
            Some(index) => self.get_user(&index.user_id).await,
            None => Ok(None),
        }
    }

    /// Claim the email in the index with a create-only write, then store the user.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let index = EmailIndex {
            user_id: user.user_id.clone(),
        };

        let _: EmailIndex = self
            .client
            .fluent()
            .insert()
            .into(collections::USER_EMAILS)
            .document_id(email_doc_id(&user.email))
            .object(&index)
            .execute()
            .await
            .map_err(|e| match e {
                firestore::errors::FirestoreError::DataConflictError(_) => {
                    AppError::Conflict("Email is already registered".to_string())
                }
                other => AppError::Database(other.to_string()),
            })?;

        if let Err(e) = self.upsert_user(user).await {
            // Release the email so the user can retry
            let _ = self
                .client
                .fluent()
                .delete()
                .from(collections::USER_EMAILS)
                .document_id(email_doc_id(&user.email))
                .execute()
                .await;
            return Err(e);
        }

        Ok(())
    }

    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.user_id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Post Operations ─────────────────────────────────────────

    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::POSTS)
            .obj()
            .one(post_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn set_post(&self, post: &Post) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::POSTS)
            .document_id(&post.post_id)
            .object(post)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn list_posts_for_user(
        &self,
        user_id: &str,
        state: Option<PublishState>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Post>, AppError> {
        let user_id = user_id.to_string();
        let query = self.client.fluent().select().from(collections::POSTS);

        let query = if let Some(state) = state {
            query.filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("publish_state").eq(state.as_str()),
                ])
            })
        } else {
            query.filter(move |q| q.field("user_id").eq(user_id.clone()))
        };

        query
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .offset(offset)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Timestamps are stored as fixed-width RFC 3339 strings, so the string
    /// comparison on `eligible_at` orders the same as the instants. Held,
    /// claimed and backed-off posts have no `eligible_at` (or a later one),
    /// so they never take up room in the batch.
    pub async fn find_due_posts(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Post>, AppError> {
        let now_str = format_utc_rfc3339(now);

        let candidates: Vec<Post> = self
            .client
            .fluent()
            .select()
            .from(collections::POSTS)
            .filter(move |q| q.field("eligible_at").less_than_or_equal(now_str.clone()))
            .order_by([("eligible_at", firestore::FirestoreQueryDirection::Ascending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(candidates.into_iter().filter(|p| p.is_due(now)).collect())
    }

    pub async fn find_posts_in_state(
        &self,
        state: PublishState,
        limit: u32,
    ) -> Result<Vec<Post>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::POSTS)
            .filter(move |q| q.field("publish_state").eq(state.as_str()))
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn update_post_atomic<F, T>(&self, post_id: &str, f: F) -> Result<Option<T>, AppError>
    where
        F: FnOnce(&mut Post) -> Result<T, AppError> + Send,
        T: Send,
    {
        let lock = self.post_locks.acquire(post_id);
        let result = {
            let _guard = lock.lock().await;
            self.read_modify_write(post_id, f).await
        };
        self.post_locks.release(post_id, lock);
        result
    }

    /// Caller holds the post's lock.
    async fn read_modify_write<F, T>(&self, post_id: &str, f: F) -> Result<Option<T>, AppError>
    where
        F: FnOnce(&mut Post) -> Result<T, AppError> + Send,
        T: Send,
    {
        let Some(mut post) = self.get_post(post_id).await? else {
            return Ok(None);
        };

        let out = f(&mut post)?;
        self.set_post(&post).await?;
        Ok(Some(out))
    }

    pub async fn delete_post<F>(&self, post_id: &str, check: F) -> Result<bool, AppError>
    where
        F: FnOnce(&Post) -> Result<(), AppError> + Send,
    {
        let lock = self.post_locks.acquire(post_id);
        let result = {
            let _guard = lock.lock().await;
            self.delete_locked(post_id, check).await
        };
        self.post_locks.release(post_id, lock);
        result
    }

    /// Caller holds the post's lock.
    async fn delete_locked<F>(&self, post_id: &str, check: F) -> Result<bool, AppError>
    where
        F: FnOnce(&Post) -> Result<(), AppError> + Send,
    {
        let Some(post) = self.get_post(post_id).await? else {
            return Ok(false);
        };
        check(&post)?;

        self.client
            .fluent()
            .delete()
            .from(collections::POSTS)
            .document_id(post_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(post_id, "Deleted post");
        Ok(true)
    }
}
