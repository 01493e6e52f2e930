// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Used by tests and single-instance deployments that do not need
//! durability. Post updates run under the map's entry lock, which makes
//! `update_post_atomic` a true compare-and-set.

use crate::error::AppError;
use crate::models::user::normalize_email;
use crate::models::{Post, PublishState, User};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    /// email -> user_id
    emails: DashMap<String, String>,
    posts: DashMap<String, Post>,
}

impl MemoryStore {
    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|u| u.value().clone())
    }

    pub fn get_user_by_email(&self, email: &str) -> Option<User> {
        let user_id = self.emails.get(&normalize_email(email))?.value().clone();
        self.get_user(&user_id)
    }

    pub fn create_user(&self, user: &User) -> Result<(), AppError> {
        match self.emails.entry(normalize_email(&user.email)) {
            Entry::Occupied(_) => Err(AppError::Conflict(
                "Email is already registered".to_string(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(user.user_id.clone());
                self.users.insert(user.user_id.clone(), user.clone());
                Ok(())
            }
        }
    }

    pub fn upsert_user(&self, user: &User) {
        self.users.insert(user.user_id.clone(), user.clone());
    }

    pub fn get_post(&self, post_id: &str) -> Option<Post> {
        self.posts.get(post_id).map(|p| p.value().clone())
    }

    pub fn insert_post(&self, post: &Post) {
        self.posts.insert(post.post_id.clone(), post.clone());
    }

    pub fn list_posts_for_user(
        &self,
        user_id: &str,
        state: Option<PublishState>,
        limit: u32,
        offset: u32,
    ) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.user_id == user_id && state.map_or(true, |s| p.publish_state == s))
            .map(|p| p.value().clone())
            .collect();

        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.post_id.cmp(&b.post_id))
        });

        posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect()
    }

    pub fn find_due_posts(&self, now: DateTime<Utc>, limit: u32) -> Vec<Post> {
        let mut due: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.eligible_at.is_some_and(|at| at <= now) && p.is_due(now))
            .map(|p| p.value().clone())
            .collect();

        due.sort_by_key(|p| p.eligible_at);
        due.truncate(limit as usize);
        due
    }

    pub fn find_posts_in_state(&self, state: PublishState, limit: u32) -> Vec<Post> {
        self.posts
            .iter()
            .filter(|p| p.publish_state == state)
            .take(limit as usize)
            .map(|p| p.value().clone())
            .collect()
    }

    pub fn update_post_atomic<F, T>(&self, post_id: &str, f: F) -> Result<Option<T>, AppError>
    where
        F: FnOnce(&mut Post) -> Result<T, AppError>,
    {
        let Some(mut entry) = self.posts.get_mut(post_id) else {
            return Ok(None);
        };

        // Work on a copy so a failing closure leaves the stored post untouched
        let mut post = entry.value().clone();
        let out = f(&mut post)?;
        *entry.value_mut() = post;
        Ok(Some(out))
    }

    pub fn delete_post<F>(&self, post_id: &str, check: F) -> Result<bool, AppError>
    where
        F: FnOnce(&Post) -> Result<(), AppError>,
    {
        let mut outcome = Ok(());
        let removed = self.posts.remove_if(post_id, |_, post| match check(post) {
            Ok(()) => true,
            Err(e) => {
                outcome = Err(e);
                false
            }
        });

        outcome?;
        Ok(removed.is_some())
    }
}
