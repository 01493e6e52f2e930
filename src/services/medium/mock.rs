// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory Medium stand-in.
//!
//! Available in all builds so integration tests (and offline local runs)
//! can drive the full publish flow. Behavior can be switched at runtime and
//! every created post is recorded for inspection.

use super::{CreatePostRequest, MediumApi, MediumProfile, MediumTokens, PublishedPost};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Author ID reported by `get_profile`.
pub const MOCK_AUTHOR_ID: &str = "mock-author";

/// Authorization code that makes the exchange fail.
pub const MOCK_BAD_CODE: &str = "bad-code";

/// What `publish_post` does.
#[derive(Debug, Clone, Default)]
pub enum MockBehavior {
    #[default]
    Succeed,
    Reject(String),
    Unavailable(String),
    /// Token revoked on the Medium side (remote 401)
    Revoked,
    /// Success response with an empty post ID
    EmptyId,
}

#[derive(Default)]
pub struct MockMediumApi {
    behavior: Mutex<MockBehavior>,
    delay: Mutex<Duration>,
    publish_calls: AtomicUsize,
    created: Mutex<Vec<(String, CreatePostRequest)>>,
}

impl MockMediumApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        if let Ok(mut current) = self.behavior.lock() {
            *current = behavior;
        }
    }

    /// Simulated network latency for `publish_post`.
    pub fn set_delay(&self, delay: Duration) {
        if let Ok(mut current) = self.delay.lock() {
            *current = delay;
        }
    }

    /// Number of `publish_post` calls, successful or not.
    pub fn publish_calls(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    /// Posts successfully created, with the author they were created under.
    pub fn created_posts(&self) -> Vec<(String, CreatePostRequest)> {
        self.created
            .lock()
            .map(|created| created.clone())
            .unwrap_or_default()
    }

    fn behavior(&self) -> MockBehavior {
        self.behavior
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }

    fn delay(&self) -> Duration {
        self.delay.lock().map(|d| *d).unwrap_or_default()
    }
}

#[async_trait]
impl MediumApi for MockMediumApi {
    async fn exchange_authorization_code(&self, code: &str) -> Result<MediumTokens, AppError> {
        if code == MOCK_BAD_CODE {
            return Err(AppError::OAuthExchangeFailed(
                "HTTP 400 Bad Request: invalid code".to_string(),
            ));
        }

        Ok(MediumTokens {
            access_token: format!("mock-access-{}", code),
            refresh_token: format!("mock-refresh-{}", code),
            expires_at: Utc::now() + chrono::Duration::days(60),
        })
    }

    async fn get_profile(&self, _access_token: &str) -> Result<MediumProfile, AppError> {
        Ok(MediumProfile {
            id: MOCK_AUTHOR_ID.to_string(),
            username: "mockwriter".to_string(),
            name: "Mock Writer".to_string(),
            url: "https://medium.com/@mockwriter".to_string(),
        })
    }

    async fn publish_post(
        &self,
        _access_token: &str,
        author_id: &str,
        request: &CreatePostRequest,
    ) -> Result<PublishedPost, AppError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.behavior() {
            MockBehavior::Succeed => {
                let id = uuid::Uuid::new_v4().simple().to_string()[..12].to_string();
                if let Ok(mut created) = self.created.lock() {
                    created.push((author_id.to_string(), request.clone()));
                }
                Ok(PublishedPost {
                    url: format!("https://medium.com/p/{}", id),
                    id,
                })
            }
            MockBehavior::Reject(msg) => Err(AppError::PublishRejected(msg)),
            MockBehavior::Unavailable(msg) => Err(AppError::PublishUnavailable(msg)),
            MockBehavior::Revoked => Err(AppError::MediumReauthRequired),
            MockBehavior::EmptyId => Ok(PublishedPost {
                id: String::new(),
                url: String::new(),
            }),
        }
    }
}
