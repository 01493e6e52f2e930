// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Current-user routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::UserResponse;
use crate::AppState;
use axum::{
    extract::State,
    routing::{delete, get},
    Extension, Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/me/medium", delete(disconnect_medium))
}

/// Profile plus Medium link status.
async fn get_me(Extension(auth): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse::from_user(&auth.user, Utc::now()))
}

/// Forget the stored Medium tokens. Scheduled posts will wait for a reconnect.
async fn disconnect_medium(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let now = Utc::now();
    let mut user = state
        .db
        .get_user(&auth.user.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    user.unlink_medium(now);
    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %user.user_id, "Medium account disconnected");
    Ok(Json(UserResponse::from_user(&user, now)))
}
