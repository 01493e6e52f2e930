// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the Medium REST API.
//!
//! Handles:
//! - OAuth code exchange
//! - Profile lookup (author ID)
//! - Post creation, for a user or a publication
//! - Mapping HTTP failures onto the publish error taxonomy

use super::{CreatePostRequest, MediumApi, MediumProfile, MediumTokens, PublishedPost};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const MEDIUM_API_BASE: &str = "https://api.medium.com/v1";

/// Medium API client.
#[derive(Clone)]
pub struct MediumClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl MediumClient {
    /// Create a client with OAuth credentials and a per-request timeout.
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_url: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("medium-publisher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            client_id,
            client_secret,
            redirect_url,
        })
    }

    /// Send a request and decode the `data` envelope Medium wraps results in.
    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let envelope: DataEnvelope<T> = response.json().await.map_err(|e| {
            AppError::PublishUnavailable(format!("Malformed Medium response: {}", e))
        })?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl MediumApi for MediumClient {
    async fn exchange_authorization_code(&self, code: &str) -> Result<MediumTokens, AppError> {
        let response = self
            .http
            .post(format!("{}/tokens", MEDIUM_API_BASE))
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::OAuthExchangeFailed(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::OAuthExchangeFailed(format!(
                "HTTP {}: {}",
                status,
                error_message(&body)
            )));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::OAuthExchangeFailed(format!("JSON parse error: {}", e)))?;

        let expires_at = DateTime::<Utc>::from_timestamp_millis(tokens.expires_at).ok_or_else(
            || AppError::OAuthExchangeFailed(format!("Invalid expiry: {}", tokens.expires_at)),
        )?;

        Ok(MediumTokens {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at,
        })
    }

    async fn get_profile(&self, access_token: &str) -> Result<MediumProfile, AppError> {
        let request = self
            .http
            .get(format!("{}/me", MEDIUM_API_BASE))
            .bearer_auth(access_token);
        self.send_json(request).await
    }

    async fn publish_post(
        &self,
        access_token: &str,
        author_id: &str,
        request: &CreatePostRequest,
    ) -> Result<PublishedPost, AppError> {
        let url = match &request.publication_id {
            Some(publication_id) => format!(
                "{}/publications/{}/posts",
                MEDIUM_API_BASE,
                urlencoding::encode(publication_id)
            ),
            None => format!(
                "{}/users/{}/posts",
                MEDIUM_API_BASE,
                urlencoding::encode(author_id)
            ),
        };

        let created: CreatedPost = self
            .send_json(self.http.post(url).bearer_auth(access_token).json(request))
            .await?;

        tracing::info!(medium_post_id = %created.id, "Medium post created");

        Ok(PublishedPost {
            id: created.id,
            url: created.url,
        })
    }
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    /// Milliseconds since the epoch
    expires_at: i64,
}

#[derive(Deserialize)]
struct CreatedPost {
    id: String,
    url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Deserialize)]
struct ErrorItem {
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

fn transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::PublishUnavailable("Medium request timed out".to_string())
    } else {
        AppError::PublishUnavailable(format!("Medium request failed: {}", e))
    }
}

/// Pull the human-readable message out of a Medium error body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .iter()
            .map(|e| match e.code {
                Some(code) => format!("{} (code {})", e.message, code),
                None => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.chars().take(200).collect(),
    }
}

/// Map a non-success status onto the publish error taxonomy.
fn classify_failure(status: StatusCode, body: &str) -> AppError {
    let message = error_message(body);

    match status {
        StatusCode::UNAUTHORIZED => {
            tracing::warn!("Medium rejected access token (401)");
            AppError::MediumReauthRequired
        }
        StatusCode::TOO_MANY_REQUESTS => {
            tracing::warn!("Medium rate limit hit (429)");
            AppError::PublishUnavailable(format!("Rate limited: {}", message))
        }
        s if s.is_server_error() => AppError::PublishUnavailable(format!("HTTP {}: {}", s, message)),
        s => AppError::PublishRejected(format!("HTTP {}: {}", s, message)),
    }
}
