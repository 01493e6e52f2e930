// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Blog post model and its publish state machine.
//!
//! ```text
//! draft --schedule--> pending --claim--> publishing --ok--> published
//!                        ^                    |
//!                        +------failure-------+
//! ```
//!
//! A manual publish can also claim a `draft`; on failure it goes back to
//! wherever it came from.

use crate::error::AppError;
use crate::time_utils::{rfc3339, rfc3339_opt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of `Post::content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    #[default]
    Markdown,
    Html,
}

impl ContentFormat {
    /// Value of Medium's `contentFormat` field.
    pub fn as_medium_str(self) -> &'static str {
        match self {
            ContentFormat::Markdown => "markdown",
            ContentFormat::Html => "html",
        }
    }
}

/// Visibility requested on Medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Public,
    Draft,
    Unlisted,
}

/// Medium license identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum License {
    #[serde(rename = "all-rights-reserved")]
    AllRightsReserved,
    #[serde(rename = "cc-40-by")]
    Cc40By,
    #[serde(rename = "cc-40-by-sa")]
    Cc40BySa,
    #[serde(rename = "cc-40-by-nd")]
    Cc40ByNd,
    #[serde(rename = "cc-40-by-nc")]
    Cc40ByNc,
    #[serde(rename = "cc-40-by-nc-nd")]
    Cc40ByNcNd,
    #[serde(rename = "cc-40-by-nc-sa")]
    Cc40ByNcSa,
    #[serde(rename = "cc-40-zero")]
    Cc40Zero,
    #[serde(rename = "public-domain")]
    PublicDomain,
}

/// Local publish lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    Draft,
    Pending,
    Publishing,
    Published,
}

impl PublishState {
    pub fn as_str(self) -> &'static str {
        match self {
            PublishState::Draft => "draft",
            PublishState::Pending => "pending",
            PublishState::Publishing => "publishing",
            PublishState::Published => "published",
        }
    }
}

/// Why the last publish attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Medium refused the content; held until the post changes.
    Rejected,
    /// Transient; retried with backoff.
    Unavailable,
    /// Owner must reconnect Medium; retried every pass.
    ReauthRequired,
    /// Too many transient failures; held until the post changes.
    RetriesExhausted,
}

impl FailureKind {
    pub fn from_error(err: &AppError) -> Self {
        match err {
            AppError::PublishRejected(_) => FailureKind::Rejected,
            AppError::MediumReauthRequired => FailureKind::ReauthRequired,
            _ => FailureKind::Unavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(with = "rfc3339")]
    pub at: DateTime<Utc>,
}

/// User-editable fields of a post.
#[derive(Debug, Clone, Default)]
pub struct PostFields {
    pub title: String,
    pub content: String,
    pub content_format: ContentFormat,
    pub tags: Vec<String>,
    pub canonical_url: Option<String>,
    pub publish_status: PublishStatus,
    pub license: Option<License>,
    pub publication_id: Option<String>,
    pub notify_followers: bool,
}

/// Post document stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// UUID (also used as document ID)
    pub post_id: String,
    /// Owning user
    pub user_id: String,
    /// Medium post ID, set once published
    #[serde(default)]
    pub medium_post_id: Option<String>,
    #[serde(default)]
    pub medium_url: Option<String>,
    pub title: String,
    pub content: String,
    pub content_format: ContentFormat,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    pub publish_status: PublishStatus,
    #[serde(default)]
    pub license: Option<License>,
    #[serde(default)]
    pub publication_id: Option<String>,
    #[serde(default)]
    pub notify_followers: bool,
    #[serde(default, with = "rfc3339_opt")]
    pub scheduled_at: Option<DateTime<Utc>>,
    pub published: bool,
    pub publish_state: PublishState,

    // ─── Retry Bookkeeping ───────────────────────────────────────
    /// Consecutive scheduled attempts that failed transiently
    #[serde(default)]
    pub publish_attempts: u32,
    /// Earliest time the trigger may retry
    #[serde(default, with = "rfc3339_opt")]
    pub next_attempt_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_failure: Option<PublishFailure>,
    /// When the trigger may next pick this post up. `None` while the post is
    /// unscheduled, claimed, published or held. Stored so the due-post query
    /// can skip ineligible posts instead of filtering them afterwards.
    #[serde(default, with = "rfc3339_opt")]
    pub eligible_at: Option<DateTime<Utc>>,

    #[serde(with = "rfc3339")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "rfc3339")]
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(
        user_id: &str,
        fields: PostFields,
        scheduled_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut post = Self {
            post_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            medium_post_id: None,
            medium_url: None,
            title: String::new(),
            content: String::new(),
            content_format: ContentFormat::default(),
            tags: Vec::new(),
            canonical_url: None,
            publish_status: PublishStatus::default(),
            license: None,
            publication_id: None,
            notify_followers: false,
            scheduled_at: None,
            published: false,
            publish_state: PublishState::Draft,
            publish_attempts: 0,
            next_attempt_at: None,
            last_failure: None,
            eligible_at: None,
            created_at: now,
            updated_at: now,
        };
        post.set_fields(fields);
        post.set_schedule(scheduled_at, now);
        post
    }

    /// Held posts are skipped by the trigger until the user changes them.
    pub fn is_held(&self) -> bool {
        matches!(
            self.last_failure.as_ref().map(|f| f.kind),
            Some(FailureKind::Rejected | FailureKind::RetriesExhausted)
        )
    }

    /// Whether a trigger pass at `now` should attempt this post.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.published
            && self.publish_state == PublishState::Pending
            && self.scheduled_at.is_some_and(|at| at <= now)
            && self.next_attempt_at.map_or(true, |at| at <= now)
            && !self.is_held()
    }

    /// Refuse changes while a publish is in flight or after it succeeded.
    pub fn ensure_editable(&self) -> Result<(), AppError> {
        match self.publish_state {
            PublishState::Publishing => Err(AppError::Conflict(
                "Post is being published".to_string(),
            )),
            PublishState::Published => Err(AppError::Conflict(
                "Post is already published".to_string(),
            )),
            PublishState::Draft | PublishState::Pending => Ok(()),
        }
    }

    /// Replace the editable fields. Changed input lifts any hold.
    pub fn set_fields(&mut self, fields: PostFields) {
        self.title = fields.title;
        self.content = fields.content;
        self.content_format = fields.content_format;
        self.tags = fields.tags;
        self.canonical_url = fields.canonical_url;
        self.publish_status = fields.publish_status;
        self.license = fields.license;
        self.publication_id = fields.publication_id;
        self.notify_followers = fields.notify_followers;
        self.reset_retries();
        self.refresh_eligibility();
    }

    /// Snapshot of the editable fields.
    pub fn fields(&self) -> PostFields {
        PostFields {
            title: self.title.clone(),
            content: self.content.clone(),
            content_format: self.content_format,
            tags: self.tags.clone(),
            canonical_url: self.canonical_url.clone(),
            publish_status: self.publish_status,
            license: self.license,
            publication_id: self.publication_id.clone(),
            notify_followers: self.notify_followers,
        }
    }

    /// Schedule (or unschedule with `None`). Only valid before publishing.
    pub fn set_schedule(&mut self, scheduled_at: Option<DateTime<Utc>>, now: DateTime<Utc>) {
        self.scheduled_at = scheduled_at;
        self.publish_state = if scheduled_at.is_some() {
            PublishState::Pending
        } else {
            PublishState::Draft
        };
        self.reset_retries();
        self.refresh_eligibility();
        self.updated_at = now;
    }

    /// Claim the post for publishing, returning the state to restore on failure.
    pub fn mark_publishing(&mut self, now: DateTime<Utc>) -> PublishState {
        let previous = self.publish_state;
        self.publish_state = PublishState::Publishing;
        self.refresh_eligibility();
        self.updated_at = now;
        previous
    }

    pub fn mark_published(&mut self, medium_post_id: String, medium_url: String, now: DateTime<Utc>) {
        self.medium_post_id = Some(medium_post_id);
        self.medium_url = Some(medium_url);
        self.published = true;
        self.publish_state = PublishState::Published;
        self.reset_retries();
        self.refresh_eligibility();
        self.updated_at = now;
    }

    /// Return a claimed post to `previous` after a failed attempt.
    pub fn release(
        &mut self,
        previous: PublishState,
        failure: PublishFailure,
        publish_attempts: u32,
        next_attempt_at: Option<DateTime<Utc>>,
    ) {
        self.publish_state = previous;
        self.publish_attempts = publish_attempts;
        self.next_attempt_at = next_attempt_at;
        self.updated_at = failure.at;
        self.last_failure = Some(failure);
        self.refresh_eligibility();
    }

    /// Current hold, if any. Only an edit or reschedule clears it.
    pub fn hold(&self) -> Option<&PublishFailure> {
        self.last_failure.as_ref().filter(|_| self.is_held())
    }

    /// Undo a claim left behind by a process that stopped mid-publish.
    pub fn reset_interrupted(&mut self, now: DateTime<Utc>) {
        self.publish_state = if self.scheduled_at.is_some() {
            PublishState::Pending
        } else {
            PublishState::Draft
        };
        self.refresh_eligibility();
        self.updated_at = now;
    }

    /// Recompute `eligible_at` from the state and retry bookkeeping.
    fn refresh_eligibility(&mut self) {
        self.eligible_at = match self.scheduled_at {
            Some(at) if !self.published
                && self.publish_state == PublishState::Pending
                && !self.is_held() =>
            {
                Some(self.next_attempt_at.map_or(at, |next| next.max(at)))
            }
            _ => None,
        };
    }

    fn reset_retries(&mut self) {
        self.publish_attempts = 0;
        self.next_attempt_at = None;
        self.last_failure = None;
    }
}
