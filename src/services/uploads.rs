// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image upload storage.

use crate::error::AppError;
use serde::Serialize;
use std::path::Path;

/// Largest accepted image.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// URL prefix uploaded files are served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageType {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(ImageType::Png),
            "image/jpeg" | "image/jpg" => Some(ImageType::Jpeg),
            "image/gif" => Some(ImageType::Gif),
            "image/webp" => Some(ImageType::Webp),
            _ => None,
        }
    }

    /// Identify the image from its leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageType::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageType::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageType::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageType::Webp)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageType::Png => "png",
            ImageType::Jpeg => "jpg",
            ImageType::Gif => "gif",
            ImageType::Webp => "webp",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageType::Png => "image/png",
            ImageType::Jpeg => "image/jpeg",
            ImageType::Gif => "image/gif",
            ImageType::Webp => "image/webp",
        }
    }
}

/// Response body for a stored upload.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StoredUpload {
    pub url: String,
    pub filename: String,
    pub content_type: String,
    pub size: usize,
}

/// Validate and write an image under `dir` with a fresh random name.
///
/// The declared content type must be an accepted image type and must agree
/// with the file's magic bytes.
pub async fn store_image(
    dir: &Path,
    declared_content_type: Option<&str>,
    bytes: &[u8],
) -> Result<StoredUpload, AppError> {
    let declared = declared_content_type
        .and_then(ImageType::from_content_type)
        .ok_or_else(|| {
            AppError::BadRequest("Only PNG, JPEG, GIF and WebP images are accepted".to_string())
        })?;

    if bytes.is_empty() {
        return Err(AppError::BadRequest("Empty upload".to_string()));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest(format!(
            "Image exceeds {} bytes",
            MAX_UPLOAD_BYTES
        )));
    }
    if ImageType::sniff(bytes) != Some(declared) {
        return Err(AppError::BadRequest(
            "File contents do not match the declared image type".to_string(),
        ));
    }

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Create upload dir failed: {}", e)))?;

    let filename = format!("{}.{}", uuid::Uuid::new_v4(), declared.extension());
    tokio::fs::write(dir.join(&filename), bytes)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Write upload failed: {}", e)))?;

    tracing::info!(filename = %filename, size = bytes.len(), "Stored upload");

    Ok(StoredUpload {
        url: format!("{}/{}", UPLOADS_URL_PREFIX, filename),
        filename,
        content_type: declared.content_type().to_string(),
        size: bytes.len(),
    })
}
