// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client fixed-window rate limiting.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;

pub const DEFAULT_MAX_REQUESTS: u32 = 300;
pub const DEFAULT_WINDOW_SECS: i64 = 15 * 60;

/// Tracked clients before stale windows are swept.
const PRUNE_THRESHOLD: usize = 10_000;

/// Counts requests per client per window.
pub struct RateLimiter {
    max_requests: u32,
    window_secs: i64,
    /// client key -> (window start, count)
    windows: DashMap<String, (i64, u32)>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECS)
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: i64) -> Self {
        Self {
            max_requests,
            window_secs: window_secs.max(1),
            windows: DashMap::new(),
        }
    }

    fn window_start(&self, now: i64) -> i64 {
        (now / self.window_secs) * self.window_secs
    }

    /// Record a request; `false` means the client is over its limit.
    pub fn check_and_record(&self, client: &str, now: i64) -> bool {
        if self.windows.len() > PRUNE_THRESHOLD {
            self.prune(now);
        }

        let window = self.window_start(now);
        let mut entry = self.windows.entry(client.to_string()).or_insert((window, 0));

        if entry.0 != window {
            *entry = (window, 0);
        }
        if entry.1 >= self.max_requests {
            return false;
        }
        entry.1 += 1;
        true
    }

    /// Drop windows older than the current one.
    pub fn prune(&self, now: i64) {
        let window = self.window_start(now);
        self.windows.retain(|_, (start, _)| *start == window);
    }
}

/// Peer address, or the first `X-Forwarded-For` hop when a trusted proxy
/// sets that header.
fn client_key(request: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(forwarded) = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .filter(|h| !h.is_empty())
        {
            return forwarded.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_key(&request, state.config.trust_proxy_headers);
    let now = chrono::Utc::now().timestamp();

    if !state.rate_limiter.check_and_record(&client, now) {
        tracing::warn!(client = %client, "Rate limit exceeded");
        return Err(AppError::TooManyRequests);
    }

    Ok(next.run(request).await)
}
