// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image upload endpoint.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::uploads::{store_image, StoredUpload, MAX_UPLOAD_BYTES};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use std::sync::Arc;

/// Multipart form field carrying the image.
const IMAGE_FIELD: &str = "image";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/uploads", post(upload_image))
        // Room for multipart framing around a maximum-size image
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
}

async fn upload_image(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredUpload>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Upload read failed: {}", e)))?;

        let stored = store_image(&state.config.upload_dir, content_type.as_deref(), &bytes).await?;
        tracing::info!(
            user_id = %auth.user.user_id,
            filename = %stored.filename,
            "Image uploaded"
        );
        return Ok((StatusCode::CREATED, Json(stored)));
    }

    Err(AppError::BadRequest(format!(
        "Missing '{}' field",
        IMAGE_FIELD
    )))
}
