// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stateless markdown/HTML conversion for the editor preview.

use crate::error::{AppError, Result};
use crate::models::ContentFormat;
use crate::services::content;
use crate::AppState;
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MAX_CONVERT_BYTES: usize = 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/content/convert", post(convert))
}

#[derive(Deserialize)]
pub struct ConvertRequest {
    content: String,
    from: ContentFormat,
    to: ContentFormat,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConvertResponse {
    pub content: String,
    pub format: ContentFormat,
}

async fn convert(Json(body): Json<ConvertRequest>) -> Result<Json<ConvertResponse>> {
    if body.content.len() > MAX_CONVERT_BYTES {
        return Err(AppError::BadRequest(format!(
            "Content exceeds {} bytes",
            MAX_CONVERT_BYTES
        )));
    }

    Ok(Json(ConvertResponse {
        content: content::convert(&body.content, body.from, body.to),
        format: body.to,
    }))
}
