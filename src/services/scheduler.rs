// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduled publish trigger.
//!
//! A single tokio task wakes on a fixed interval (or early, when a request
//! schedules something that is already due), finds due posts and hands each
//! one to `PublishService::publish_scheduled`. A pass never stops the loop:
//! every error is logged and the next tick runs normally.

use crate::db::Database;
use crate::error::AppError;
use crate::services::publisher::{PublishOutcome, PublishService};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

const MAX_CONCURRENT_PUBLISHES: usize = 4;

/// Upper bound on posts handled in one pass; the rest wait for the next.
const DUE_BATCH_LIMIT: u32 = 100;

/// `tokio::time::interval` panics on a zero period.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Counts for one pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub due: usize,
    pub published: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Cheap handle for waking the trigger from request handlers.
#[derive(Clone, Default)]
pub struct SchedulerHandle {
    notify: Arc<Notify>,
}

impl SchedulerHandle {
    /// Run a pass as soon as possible instead of waiting for the next tick.
    pub fn trigger_now(&self) {
        self.notify.notify_one();
    }
}

pub struct Scheduler {
    db: Database,
    publisher: Arc<PublishService>,
    interval: Duration,
    handle: SchedulerHandle,
}

impl Scheduler {
    pub fn new(
        db: Database,
        publisher: Arc<PublishService>,
        interval: Duration,
        handle: SchedulerHandle,
    ) -> Self {
        Self {
            db,
            publisher,
            interval: interval.max(MIN_INTERVAL),
            handle,
        }
    }

    /// Publish everything due at `now`.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> PassSummary {
        if let Err(e) = self.publisher.release_stale_claims(now).await {
            tracing::error!(error = %e, "Failed to release stale claims");
        }

        let due = match self.db.find_due_posts(now, DUE_BATCH_LIMIT).await {
            Ok(due) => due,
            Err(e) => {
                tracing::error!(error = %e, "Failed to query due posts");
                return PassSummary::default();
            }
        };

        let mut summary = PassSummary {
            due: due.len(),
            ..PassSummary::default()
        };
        if due.is_empty() {
            return summary;
        }

        let results: Vec<(String, Result<PublishOutcome, AppError>)> =
            stream::iter(due.into_iter().map(|post| post.post_id))
                .map(|post_id| async move {
                    let result = self.publisher.publish_scheduled(&post_id, now).await;
                    (post_id, result)
                })
                .buffer_unordered(MAX_CONCURRENT_PUBLISHES)
                .collect()
                .await;

        for (post_id, result) in results {
            match result {
                Ok(PublishOutcome::Published { .. }) => summary.published += 1,
                Ok(PublishOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    tracing::debug!(post_id = %post_id, error = %e, "Scheduled publish failed");
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Loop until `cancel` fires. An in-progress pass is allowed to finish.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_secs = self.interval.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
                _ = self.handle.notify.notified() => {
                    tracing::debug!("Scheduler woken early");
                }
            }

            let summary = self.run_pass(Utc::now()).await;
            if summary.due > 0 {
                tracing::info!(
                    due = summary.due,
                    published = summary.published,
                    failed = summary.failed,
                    skipped = summary.skipped,
                    "Scheduler pass complete"
                );
            }
        }

        tracing::info!("Scheduler stopped");
    }
}
