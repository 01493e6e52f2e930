// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use crate::error::AppError;
use crate::time_utils::{format_utc_rfc3339, rfc3339, rfc3339_opt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account stored in Firestore.
///
/// Also the credential store for the linked Medium account: the OAuth
/// tokens live on the user document and are absent until the Medium
/// OAuth flow completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID (also used as document ID)
    pub user_id: String,
    /// Lowercased email address, unique across users
    pub email: String,
    /// Display name
    pub name: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Medium author ID, learned from `/v1/me` after OAuth
    #[serde(default)]
    pub medium_user_id: Option<String>,
    #[serde(default)]
    pub medium_access_token: Option<String>,
    #[serde(default)]
    pub medium_refresh_token: Option<String>,
    /// When the Medium access token expires
    #[serde(default, with = "rfc3339_opt")]
    pub medium_token_expires_at: Option<DateTime<Utc>>,
    #[serde(with = "rfc3339")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "rfc3339")]
    pub updated_at: DateTime<Utc>,
}

/// Medium credentials known to be usable at a given instant.
#[derive(Debug, Clone)]
pub struct MediumCredentials {
    pub medium_user_id: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl User {
    /// Create a fresh account with no Medium link.
    pub fn new(email: &str, name: &str, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            user_id: uuid::Uuid::new_v4().to_string(),
            email: normalize_email(email),
            name: name.trim().to_string(),
            password_hash,
            medium_user_id: None,
            medium_access_token: None,
            medium_refresh_token: None,
            medium_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Return the Medium credentials if they are present and unexpired.
    ///
    /// There is no refresh path: an expired token means the user has to run
    /// the OAuth flow again.
    pub fn medium_credentials(&self, now: DateTime<Utc>) -> Result<MediumCredentials, AppError> {
        match (
            &self.medium_user_id,
            &self.medium_access_token,
            self.medium_token_expires_at,
        ) {
            (Some(medium_user_id), Some(access_token), Some(expires_at)) if expires_at > now => {
                Ok(MediumCredentials {
                    medium_user_id: medium_user_id.clone(),
                    access_token: access_token.clone(),
                    expires_at,
                })
            }
            _ => Err(AppError::MediumReauthRequired),
        }
    }

    /// Store tokens from a completed OAuth exchange.
    pub fn link_medium(
        &mut self,
        medium_user_id: String,
        access_token: String,
        refresh_token: String,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        self.medium_user_id = Some(medium_user_id);
        self.medium_access_token = Some(access_token);
        self.medium_refresh_token = Some(refresh_token);
        self.medium_token_expires_at = Some(expires_at);
        self.updated_at = now;
    }

    /// Forget the Medium tokens (user-initiated disconnect).
    pub fn unlink_medium(&mut self, now: DateTime<Utc>) {
        self.medium_user_id = None;
        self.medium_access_token = None;
        self.medium_refresh_token = None;
        self.medium_token_expires_at = None;
        self.updated_at = now;
    }
}

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Public view of a user (no secrets).
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub medium_connected: bool,
    pub medium_user_id: Option<String>,
    pub medium_token_expires_at: Option<String>,
    pub created_at: String,
}

impl UserResponse {
    pub fn from_user(user: &User, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            medium_connected: user.medium_credentials(now).is_ok(),
            medium_user_id: user.medium_user_id.clone(),
            medium_token_expires_at: user.medium_token_expires_at.map(format_utc_rfc3339),
            created_at: format_utc_rfc3339(user.created_at),
        }
    }
}
