// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! medium-publisher: write posts locally, publish them to Medium now or later.
//!
//! This crate provides the backend API: accounts and sessions, Medium
//! OAuth, post storage, a scheduled publish trigger, markdown/HTML
//! conversion and image uploads.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use middleware::RateLimiter;
use services::{MediumApi, PublishService, Scheduler, SchedulerHandle};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub medium: Arc<dyn MediumApi>,
    pub publisher: Arc<PublishService>,
    /// Wakes the trigger when a post becomes due immediately
    pub scheduler: SchedulerHandle,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config, db: Database, medium: Arc<dyn MediumApi>) -> Self {
        let publisher = Arc::new(PublishService::new(
            db.clone(),
            medium.clone(),
            config.medium_timeout,
        ));
        let rate_limiter = RateLimiter::new(
            config.rate_limit_max_requests,
            middleware::rate_limit::DEFAULT_WINDOW_SECS,
        );

        Self {
            config,
            db,
            medium,
            publisher,
            scheduler: SchedulerHandle::default(),
            rate_limiter,
        }
    }

    /// Build the trigger task bound to this state's handle.
    pub fn build_scheduler(&self) -> Scheduler {
        Scheduler::new(
            self.db.clone(),
            self.publisher.clone(),
            self.config.scheduler_interval,
            self.scheduler.clone(),
        )
    }
}
