// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Medium API adapter.
//!
//! `MediumApi` is the seam between the publish workflow and the remote
//! service: `MediumClient` talks to `api.medium.com`, `MockMediumApi`
//! records calls in memory for tests and local runs.

pub mod client;
pub mod mock;

pub use client::MediumClient;
pub use mock::{MockBehavior, MockMediumApi};

use crate::error::AppError;
use crate::models::{License, PublishStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scopes requested during the OAuth flow.
pub const MEDIUM_OAUTH_SCOPE: &str = "basicProfile,publishPost";

const MEDIUM_AUTHORIZE_URL: &str = "https://medium.com/m/oauth/authorize";

/// Tokens returned by a successful code exchange.
#[derive(Debug, Clone)]
pub struct MediumTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authenticated Medium user (`GET /v1/me`).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct MediumProfile {
    pub id: String,
    pub username: String,
    pub name: String,
    pub url: String,
}

/// Body of a create-post call, in Medium's wire names.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: String,
    pub content_format: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    pub publish_status: PublishStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    pub notify_followers: bool,
    /// Publish into a publication instead of the author's profile
    #[serde(skip)]
    pub publication_id: Option<String>,
}

/// Identity of a post created on Medium.
#[derive(Debug, Clone)]
pub struct PublishedPost {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait MediumApi: Send + Sync {
    /// Trade an OAuth authorization code for tokens.
    ///
    /// Any failure is reported as `OAuthExchangeFailed`.
    async fn exchange_authorization_code(&self, code: &str) -> Result<MediumTokens, AppError>;

    /// Look up the account that owns `access_token`.
    async fn get_profile(&self, access_token: &str) -> Result<MediumProfile, AppError>;

    /// Create a post under `author_id` (or `request.publication_id`).
    ///
    /// # Errors
    ///
    /// - `PublishRejected` when Medium refuses the content
    /// - `PublishUnavailable` on transport errors, rate limiting and 5xx
    /// - `MediumReauthRequired` when the token was revoked remotely
    async fn publish_post(
        &self,
        access_token: &str,
        author_id: &str,
        request: &CreatePostRequest,
    ) -> Result<PublishedPost, AppError>;
}

/// Build the consent page URL the browser is sent to.
pub fn authorize_url(client_id: &str, redirect_url: &str, state: &str) -> String {
    format!(
        "{}?client_id={}&scope={}&state={}&response_type=code&redirect_uri={}",
        MEDIUM_AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(MEDIUM_OAUTH_SCOPE),
        urlencoding::encode(state),
        urlencoding::encode(redirect_url),
    )
}
