// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Publish workflow.
//!
//! Handles the core workflow for both manual and scheduled publishing:
//! 1. Atomically claim the post (`draft|pending -> publishing`)
//! 2. Resolve the owner's Medium credentials
//! 3. Normalize content to HTML and call Medium under a timeout
//! 4. Record the remote ID, or release the post and apply the retry policy
//!
//! The claim is the only way into step 3, so a post cannot be sent twice by
//! racing callers in this process.

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{ContentFormat, FailureKind, Post, PublishFailure, PublishState};
use crate::services::content;
use crate::services::medium::{CreatePostRequest, MediumApi, PublishedPost};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Upper bound on posts examined by one recovery sweep.
const RECOVERY_BATCH_LIMIT: u32 = 500;

/// Writes of a publish outcome are retried this many times in total.
const RECORD_ATTEMPTS: u32 = 3;

/// A claim older than the remote timeout plus this margin is abandoned.
const STALE_CLAIM_MARGIN_MINUTES: i64 = 5;

/// Backoff for transient failures of scheduled posts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::seconds(60),
            max_delay: Duration::hours(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempts` (1-based): doubling, capped.
    pub fn backoff(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(20);
        let delay = self.base_delay * 2i32.pow(exponent);
        delay.min(self.max_delay)
    }

    /// Retry bookkeeping after a failed scheduled attempt:
    /// `(kind, publish_attempts, next_attempt_at)`.
    fn after_failure(
        &self,
        kind: FailureKind,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> (FailureKind, u32, Option<DateTime<Utc>>) {
        match kind {
            FailureKind::Unavailable => {
                let attempts = attempts + 1;
                if attempts >= self.max_attempts {
                    (FailureKind::RetriesExhausted, attempts, None)
                } else {
                    (kind, attempts, Some(now + self.backoff(attempts)))
                }
            }
            FailureKind::Rejected | FailureKind::ReauthRequired | FailureKind::RetriesExhausted => {
                (kind, attempts, None)
            }
        }
    }
}

/// Who asked for the publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Manual,
    Scheduled,
}

/// Result of offering a post to the scheduled path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { medium_post_id: String },
    /// Not due any more, or claimed by someone else
    Skipped,
}

pub struct PublishService {
    db: Database,
    medium: Arc<dyn MediumApi>,
    retry: RetryPolicy,
    timeout: std::time::Duration,
}

impl PublishService {
    pub fn new(db: Database, medium: Arc<dyn MediumApi>, timeout: std::time::Duration) -> Self {
        Self {
            db,
            medium,
            retry: RetryPolicy::default(),
            timeout,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Publish a post right away on behalf of its owner.
    ///
    /// Returns the published post. Fails with `NotFound` for posts the user
    /// does not own and `Conflict` when a publish is in flight or done.
    pub async fn publish_now(&self, user_id: &str, post_id: &str) -> Result<Post> {
        let now = Utc::now();
        let (previous, post) = self
            .db
            .update_post_atomic(post_id, |post| {
                if post.user_id != user_id {
                    return Err(AppError::NotFound(format!("Post {}", post_id)));
                }
                post.ensure_editable()?;
                let previous = post.mark_publishing(now);
                Ok((previous, post.clone()))
            })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {}", post_id)))?;

        tracing::info!(post_id, user_id, "Manual publish started");

        let result = self.send(&post).await;
        self.finish(&post, previous, result, Trigger::Manual).await
    }

    /// Publish a post from the trigger, if it is still due at `now`.
    ///
    /// `Err` means an attempt was made and failed; the failure has already
    /// been recorded on the post.
    pub async fn publish_scheduled(&self, post_id: &str, now: DateTime<Utc>) -> Result<PublishOutcome> {
        let claimed = self
            .db
            .update_post_atomic(post_id, |post| {
                if !post.is_due(now) {
                    return Err(AppError::Conflict("Post is not due".to_string()));
                }
                let previous = post.mark_publishing(Utc::now());
                Ok((previous, post.clone()))
            })
            .await;

        let (previous, post) = match claimed {
            Ok(Some(claim)) => claim,
            Ok(None) | Err(AppError::Conflict(_)) => {
                tracing::debug!(post_id, "Skipping post (claimed elsewhere or no longer due)");
                return Ok(PublishOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };

        tracing::info!(post_id, user_id = %post.user_id, "Scheduled publish started");

        let result = self.send(&post).await;
        let published = self.finish(&post, previous, result, Trigger::Scheduled).await?;

        Ok(PublishOutcome::Published {
            medium_post_id: published.medium_post_id.unwrap_or_default(),
        })
    }

    /// Release posts stuck in `publishing` after an unclean shutdown.
    ///
    /// The remote call may or may not have happened, so the post can be
    /// published twice. Returns the number of posts released.
    pub async fn recover_interrupted(&self, now: DateTime<Utc>) -> Result<usize> {
        self.release_claims(now, None).await
    }

    /// Release claims that outlived any possible publish attempt, such as
    /// one whose outcome could not be written.
    pub async fn release_stale_claims(&self, now: DateTime<Utc>) -> Result<usize> {
        let max_age = Duration::from_std(self.timeout).unwrap_or(Duration::hours(1))
            + Duration::minutes(STALE_CLAIM_MARGIN_MINUTES);
        self.release_claims(now, Some(now - max_age)).await
    }

    /// Put `publishing` posts back, optionally only those claimed before `cutoff`.
    async fn release_claims(
        &self,
        now: DateTime<Utc>,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<usize> {
        let claimed_before_cutoff =
            |p: &Post| cutoff.map_or(true, |cutoff| p.updated_at <= cutoff);

        let stuck = self
            .db
            .find_posts_in_state(PublishState::Publishing, RECOVERY_BATCH_LIMIT)
            .await?;

        let mut released = 0;
        for post in stuck.into_iter().filter(|p| claimed_before_cutoff(p)) {
            let result = self
                .db
                .update_post_atomic(&post.post_id, |p| {
                    if p.publish_state != PublishState::Publishing || !claimed_before_cutoff(&*p) {
                        return Err(AppError::Conflict("Post state changed".to_string()));
                    }
                    p.reset_interrupted(now);
                    Ok(())
                })
                .await;

            match result {
                Ok(Some(())) => {
                    tracing::warn!(
                        post_id = %post.post_id,
                        stale = cutoff.is_some(),
                        "Released interrupted publish"
                    );
                    released += 1;
                }
                Ok(None) | Err(AppError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(released)
    }

    /// Resolve credentials and make the remote call.
    async fn send(&self, post: &Post) -> Result<PublishedPost> {
        let owner = self
            .db
            .get_user(&post.user_id)
            .await?
            .ok_or(AppError::MediumReauthRequired)?;
        let credentials = owner.medium_credentials(Utc::now())?;

        let request = build_request(post);
        let published = tokio::time::timeout(
            self.timeout,
            self.medium
                .publish_post(&credentials.access_token, &credentials.medium_user_id, &request),
        )
        .await
        .map_err(|_| AppError::PublishUnavailable("Medium request timed out".to_string()))??;

        if published.id.trim().is_empty() {
            // Something may exist remotely; do not retry blindly
            return Err(AppError::PublishRejected(
                "Medium returned no post ID".to_string(),
            ));
        }

        Ok(published)
    }

    /// Write to a claimed post, retrying storage errors a few times so the
    /// claim is not left behind.
    async fn record<F, T>(&self, post_id: &str, f: F) -> Result<Option<T>>
    where
        F: Fn(&mut Post) -> Result<T> + Send + Sync,
        T: Send,
    {
        let mut attempt = 1;
        loop {
            match self.db.update_post_atomic(post_id, |p| f(p)).await {
                Err(AppError::Database(e)) if attempt < RECORD_ATTEMPTS => {
                    tracing::warn!(post_id, attempt, error = %e, "Retrying publish outcome write");
                    tokio::time::sleep(std::time::Duration::from_millis(200 * u64::from(attempt)))
                        .await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Record the outcome of `send` on the claimed post.
    async fn finish(
        &self,
        post: &Post,
        previous: PublishState,
        result: Result<PublishedPost>,
        trigger: Trigger,
    ) -> Result<Post> {
        let now = Utc::now();
        let post_id = post.post_id.as_str();

        match result {
            Ok(published) => {
                let updated = self
                    .record(post_id, |p| {
                        p.mark_published(published.id.clone(), published.url.clone(), now);
                        Ok(p.clone())
                    })
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(anyhow::anyhow!(
                            "Post {} vanished while publishing",
                            post_id
                        ))
                    })?;

                tracing::info!(
                    post_id,
                    user_id = %post.user_id,
                    medium_post_id = %published.id,
                    "Post published"
                );
                Ok(updated)
            }
            Err(err) => {
                let message = err.to_string();
                let kind = FailureKind::from_error(&err);

                let recorded = self
                    .record(post_id, |p| {
                        let (kind, attempts, next_attempt_at) = match trigger {
                            Trigger::Manual => {
                                // Retrying held input by hand must not lift the hold
                                let kind = match p.hold() {
                                    Some(held) if kind != FailureKind::Rejected => held.kind,
                                    _ => kind,
                                };
                                (kind, p.publish_attempts, p.next_attempt_at)
                            }
                            Trigger::Scheduled => {
                                self.retry.after_failure(kind, p.publish_attempts, now)
                            }
                        };
                        let failure = PublishFailure {
                            kind,
                            message: message.clone(),
                            at: now,
                        };
                        p.release(previous, failure, attempts, next_attempt_at);
                        Ok(kind)
                    })
                    .await;

                match recorded {
                    Ok(Some(kind)) => tracing::warn!(
                        post_id,
                        user_id = %post.user_id,
                        failure = ?kind,
                        error = %message,
                        "Publish failed"
                    ),
                    Ok(None) => {}
                    Err(e) => tracing::error!(
                        post_id,
                        error = %e,
                        "Failed to record publish failure; claim is released by a later pass"
                    ),
                }

                Err(err)
            }
        }
    }
}

/// Build the Medium request for a post, always sending HTML.
pub fn build_request(post: &Post) -> CreatePostRequest {
    CreatePostRequest {
        title: post.title.clone(),
        content_format: ContentFormat::Html.as_medium_str().to_string(),
        content: content::convert(&post.content, post.content_format, ContentFormat::Html),
        tags: post.tags.clone(),
        canonical_url: post.canonical_url.clone(),
        publish_status: post.publish_status,
        license: post.license,
        notify_followers: post.notify_followers,
        publication_id: post.publication_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostFields;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::seconds(60));
        assert_eq!(policy.backoff(2), Duration::seconds(120));
        assert_eq!(policy.backoff(4), Duration::seconds(480));
        assert_eq!(policy.backoff(10), Duration::hours(1));
        assert_eq!(policy.backoff(u32::MAX), Duration::hours(1));
    }

    #[test]
    fn test_unavailable_exhausts_after_max_attempts() {
        let policy = RetryPolicy::default();
        let now = Utc::now();

        let (kind, attempts, next) = policy.after_failure(FailureKind::Unavailable, 0, now);
        assert_eq!(kind, FailureKind::Unavailable);
        assert_eq!(attempts, 1);
        assert_eq!(next, Some(now + Duration::seconds(60)));

        let (kind, attempts, next) = policy.after_failure(FailureKind::Unavailable, 4, now);
        assert_eq!(kind, FailureKind::RetriesExhausted);
        assert_eq!(attempts, 5);
        assert!(next.is_none());
    }

    #[test]
    fn test_reauth_is_not_counted() {
        let policy = RetryPolicy::default();
        let (kind, attempts, next) =
            policy.after_failure(FailureKind::ReauthRequired, 2, Utc::now());
        assert_eq!(kind, FailureKind::ReauthRequired);
        assert_eq!(attempts, 2);
        assert!(next.is_none());
    }

    #[test]
    fn test_build_request_renders_markdown() {
        let fields = PostFields {
            title: "T".to_string(),
            content: "# H".to_string(),
            tags: vec!["rust".to_string()],
            ..PostFields::default()
        };
        let post = Post::new("u1", fields, None, Utc::now());

        let request = build_request(&post);
        assert_eq!(request.content_format, "html");
        assert_eq!(request.content.trim(), "<h1>H</h1>");
        assert_eq!(request.tags, vec!["rust".to_string()]);
    }
}
