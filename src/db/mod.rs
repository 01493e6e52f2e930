// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! `Database` is the handle shared by request handlers and the scheduler.
//! It fronts either Firestore or an in-process store; both give the same
//! guarantee that `update_post_atomic` is the only way a post changes after
//! creation, and that two callers never interleave inside it for the same
//! post.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::config::DatabaseUrl;
use crate::error::AppError;
use crate::models::{Post, PublishState, User};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email -> user_id index enforcing unique emails
    pub const USER_EMAILS: &str = "user_emails";
    pub const POSTS: &str = "posts";
}

/// Shared database handle (cheap to clone).
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreStore),
    Memory(Arc<MemoryStore>),
}

impl Database {
    /// Connect to the store named by `DATABASE_URL`.
    pub async fn connect(url: &DatabaseUrl) -> Result<Self, AppError> {
        match url {
            DatabaseUrl::Firestore { project_id } => Ok(Self {
                backend: Backend::Firestore(FirestoreStore::new(project_id).await?),
            }),
            DatabaseUrl::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                Ok(Self::in_memory())
            }
        }
    }

    /// Create an empty in-process store (tests, local development).
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            Backend::Firestore(_) => "firestore",
            Backend::Memory(_) => "memory",
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.get_user(user_id).await,
            Backend::Memory(store) => Ok(store.get_user(user_id)),
        }
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.get_user_by_email(email).await,
            Backend::Memory(store) => Ok(store.get_user_by_email(email)),
        }
    }

    /// Insert a new user. Fails with `Conflict` if the email is taken.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.create_user(user).await,
            Backend::Memory(store) => store.create_user(user),
        }
    }

    /// Overwrite an existing user (email must not change).
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.upsert_user(user).await,
            Backend::Memory(store) => {
                store.upsert_user(user);
                Ok(())
            }
        }
    }

    // ─── Post Operations ─────────────────────────────────────────

    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>, AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.get_post(post_id).await,
            Backend::Memory(store) => Ok(store.get_post(post_id)),
        }
    }

    pub async fn create_post(&self, post: &Post) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.set_post(post).await,
            Backend::Memory(store) => {
                store.insert_post(post);
                Ok(())
            }
        }
    }

    /// Posts owned by `user_id`, newest first.
    pub async fn list_posts_for_user(
        &self,
        user_id: &str,
        state: Option<PublishState>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Post>, AppError> {
        match &self.backend {
            Backend::Firestore(store) => {
                store
                    .list_posts_for_user(user_id, state, limit, offset)
                    .await
            }
            Backend::Memory(store) => Ok(store.list_posts_for_user(user_id, state, limit, offset)),
        }
    }

    /// Pending posts whose schedule (and backoff) has elapsed, oldest first.
    pub async fn find_due_posts(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Post>, AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.find_due_posts(now, limit).await,
            Backend::Memory(store) => Ok(store.find_due_posts(now, limit)),
        }
    }

    pub async fn find_posts_in_state(
        &self,
        state: PublishState,
        limit: u32,
    ) -> Result<Vec<Post>, AppError> {
        match &self.backend {
            Backend::Firestore(store) => store.find_posts_in_state(state, limit).await,
            Backend::Memory(store) => Ok(store.find_posts_in_state(state, limit)),
        }
    }

    /// Read-modify-write a post atomically with respect to other callers.
    ///
    /// `f` sees the current document; if it returns `Err` nothing is written.
    /// Returns `Ok(None)` if the post does not exist.
    pub async fn update_post_atomic<F, T>(&self, post_id: &str, f: F) -> Result<Option<T>, AppError>
    where
        F: FnOnce(&mut Post) -> Result<T, AppError> + Send,
        T: Send,
    {
        match &self.backend {
            Backend::Firestore(store) => store.update_post_atomic(post_id, f).await,
            Backend::Memory(store) => store.update_post_atomic(post_id, f),
        }
    }

    /// Delete a post if `check` accepts it. Returns `false` if it did not exist.
    pub async fn delete_post<F>(&self, post_id: &str, check: F) -> Result<bool, AppError>
    where
        F: FnOnce(&Post) -> Result<(), AppError> + Send,
    {
        match &self.backend {
            Backend::Firestore(store) => store.delete_post(post_id, check).await,
            Backend::Memory(store) => store.delete_post(post_id, check),
        }
    }
}
