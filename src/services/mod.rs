// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod content;
pub mod medium;
pub mod oauth_state;
pub mod password;
pub mod publisher;
pub mod scheduler;
pub mod uploads;

pub use medium::{MediumApi, MediumClient, MockMediumApi};
pub use publisher::{PublishOutcome, PublishService, RetryPolicy};
pub use scheduler::{PassSummary, Scheduler, SchedulerHandle};
