// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post CRUD, scheduling and publish-now routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    ContentFormat, FailureKind, License, Post, PostFields, PublishState, PublishStatus,
};
use crate::services::content;
use crate::time_utils::{format_utc_rfc3339, parse_utc_rfc3339};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_PER_PAGE: u32 = 100;
const MAX_TAGS: usize = 5;
const MAX_TAG_LEN: usize = 25;

/// Post routes that need only a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route(
            "/api/posts/{id}/schedule",
            put(schedule_post).delete(unschedule_post),
        )
}

/// Routes that talk to Medium (session plus Medium guard).
pub fn publish_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/posts/{id}/publish", post(publish_post))
}

// ─── Request Bodies ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct PostInput {
    #[validate(length(min = 1, max = 100))]
    title: String,
    #[validate(length(min = 1, max = 500_000))]
    content: String,
    #[serde(default)]
    content_format: ContentFormat,
    #[serde(default)]
    tags: Vec<String>,
    #[validate(url)]
    #[serde(default)]
    canonical_url: Option<String>,
    #[serde(default)]
    publish_status: PublishStatus,
    #[serde(default)]
    license: Option<License>,
    #[validate(length(min = 1, max = 100))]
    #[serde(default)]
    publication_id: Option<String>,
    #[serde(default)]
    notify_followers: bool,
}

impl PostInput {
    fn into_fields(self) -> Result<PostFields> {
        self.validate()?;

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            let tag = tag.trim().to_string();
            if tag.is_empty() || tags.contains(&tag) {
                continue;
            }
            if tag.chars().count() > MAX_TAG_LEN {
                return Err(AppError::BadRequest(format!(
                    "Tag '{}' is longer than {} characters",
                    tag, MAX_TAG_LEN
                )));
            }
            tags.push(tag);
        }
        if tags.len() > MAX_TAGS {
            return Err(AppError::BadRequest(format!(
                "At most {} tags are allowed",
                MAX_TAGS
            )));
        }

        Ok(PostFields {
            title: self.title.trim().to_string(),
            content: self.content,
            content_format: self.content_format,
            tags,
            canonical_url: self.canonical_url,
            publish_status: self.publish_status,
            license: self.license,
            publication_id: self.publication_id,
            notify_followers: self.notify_followers,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePostInput {
    #[serde(flatten)]
    post: PostInput,
    #[serde(default)]
    scheduled_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleInput {
    scheduled_at: String,
}

fn parse_schedule(raw: &str) -> Result<DateTime<Utc>> {
    parse_utc_rfc3339(raw).ok_or_else(|| {
        AppError::BadRequest("Invalid 'scheduled_at': must be RFC3339 datetime".to_string())
    })
}

// ─── Responses ───────────────────────────────────────────────

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FailureResponse {
    pub kind: FailureKind,
    pub message: String,
    pub at: String,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PostResponse {
    pub post_id: String,
    pub title: String,
    pub content: String,
    pub content_format: ContentFormat,
    pub tags: Vec<String>,
    pub canonical_url: Option<String>,
    pub publish_status: PublishStatus,
    pub license: Option<License>,
    pub publication_id: Option<String>,
    pub notify_followers: bool,
    pub scheduled_at: Option<String>,
    pub published: bool,
    pub publish_state: PublishState,
    pub medium_post_id: Option<String>,
    pub medium_url: Option<String>,
    /// Failed scheduled attempts since the post last changed
    pub publish_attempts: u32,
    pub next_attempt_at: Option<String>,
    pub last_failure: Option<FailureResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            post_id: post.post_id,
            title: post.title,
            content: post.content,
            content_format: post.content_format,
            tags: post.tags,
            canonical_url: post.canonical_url,
            publish_status: post.publish_status,
            license: post.license,
            publication_id: post.publication_id,
            notify_followers: post.notify_followers,
            scheduled_at: post.scheduled_at.map(format_utc_rfc3339),
            published: post.published,
            publish_state: post.publish_state,
            medium_post_id: post.medium_post_id,
            medium_url: post.medium_url,
            publish_attempts: post.publish_attempts,
            next_attempt_at: post.next_attempt_at.map(format_utc_rfc3339),
            last_failure: post.last_failure.map(|f| FailureResponse {
                kind: f.kind,
                message: f.message,
                at: format_utc_rfc3339(f.at),
            }),
            created_at: format_utc_rfc3339(post.created_at),
            updated_at: format_utc_rfc3339(post.updated_at),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PostsResponse {
    pub posts: Vec<PostResponse>,
    pub page: u32,
    pub per_page: u32,
    pub has_more: bool,
}

// ─── Handlers ────────────────────────────────────────────────

/// Load a post the caller owns; other users' posts look absent.
async fn load_owned(state: &AppState, user_id: &str, post_id: &str) -> Result<Post> {
    state
        .db
        .get_post(post_id)
        .await?
        .filter(|p| p.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("Post {}", post_id)))
}

/// Apply `f` to an owned, editable post.
async fn edit_owned<F>(state: &AppState, user_id: &str, post_id: &str, f: F) -> Result<Post>
where
    F: FnOnce(&mut Post) + Send,
{
    state
        .db
        .update_post_atomic(post_id, |post| {
            if post.user_id != user_id {
                return Err(AppError::NotFound(format!("Post {}", post_id)));
            }
            post.ensure_editable()?;
            f(post);
            Ok(post.clone())
        })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {}", post_id)))
}

/// Wake the trigger if the post is already due.
fn nudge_scheduler(state: &AppState, post: &Post) {
    if post.is_due(Utc::now()) {
        state.scheduler.trigger_now();
    }
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_per_page")]
    per_page: u32,
    #[serde(default)]
    state: Option<PublishState>,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    20
}

async fn list_posts(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListQuery>,
) -> Result<Json<PostsResponse>> {
    if params.page < 1 {
        return Err(AppError::BadRequest(
            "Page must be greater than 0".to_string(),
        ));
    }
    if params.per_page < 1 || params.per_page > MAX_PER_PAGE {
        return Err(AppError::BadRequest(format!(
            "per_page must be between 1 and {}",
            MAX_PER_PAGE
        )));
    }

    let offset = (params.page - 1)
        .checked_mul(params.per_page)
        .ok_or_else(|| AppError::BadRequest("Page number causes overflow".to_string()))?;

    // One extra row tells us whether another page exists
    let mut posts = state
        .db
        .list_posts_for_user(
            &auth.user.user_id,
            params.state,
            params.per_page + 1,
            offset,
        )
        .await?;

    let has_more = posts.len() > params.per_page as usize;
    posts.truncate(params.per_page as usize);

    Ok(Json(PostsResponse {
        posts: posts.into_iter().map(PostResponse::from).collect(),
        page: params.page,
        per_page: params.per_page,
        has_more,
    }))
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    let scheduled_at = body.scheduled_at.as_deref().map(parse_schedule).transpose()?;
    let fields = body.post.into_fields()?;

    let post = Post::new(&auth.user.user_id, fields, scheduled_at, Utc::now());
    state.db.create_post(&post).await?;

    tracing::info!(
        post_id = %post.post_id,
        user_id = %post.user_id,
        state = post.publish_state.as_str(),
        "Post created"
    );

    nudge_scheduler(&state, &post);
    Ok((StatusCode::CREATED, Json(post.into())))
}

#[derive(Deserialize)]
struct GetPostQuery {
    /// Convert content to this format in the response
    #[serde(default)]
    format: Option<ContentFormat>,
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Query(params): Query<GetPostQuery>,
) -> Result<Json<PostResponse>> {
    let mut post = load_owned(&state, &auth.user.user_id, &post_id).await?;

    if let Some(format) = params.format {
        post.content = content::convert(&post.content, post.content_format, format);
        post.content_format = format;
    }

    Ok(Json(post.into()))
}

async fn update_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Json(body): Json<PostInput>,
) -> Result<Json<PostResponse>> {
    let fields = body.into_fields()?;
    let now = Utc::now();

    let post = edit_owned(&state, &auth.user.user_id, &post_id, |post| {
        post.set_fields(fields);
        post.updated_at = now;
    })
    .await?;

    tracing::info!(post_id = %post.post_id, "Post updated");
    nudge_scheduler(&state, &post);
    Ok(Json(post.into()))
}

async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<StatusCode> {
    let user_id = auth.user.user_id.as_str();
    let deleted = state
        .db
        .delete_post(&post_id, |post| {
            if post.user_id != user_id {
                return Err(AppError::NotFound(format!("Post {}", post_id)));
            }
            if post.publish_state == PublishState::Publishing {
                return Err(AppError::Conflict("Post is being published".to_string()));
            }
            Ok(())
        })
        .await?;

    if !deleted {
        return Err(AppError::NotFound(format!("Post {}", post_id)));
    }

    tracing::info!(post_id = %post_id, user_id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn schedule_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Json(body): Json<ScheduleInput>,
) -> Result<Json<PostResponse>> {
    let scheduled_at = parse_schedule(&body.scheduled_at)?;
    let now = Utc::now();

    let post = edit_owned(&state, &auth.user.user_id, &post_id, |post| {
        post.set_schedule(Some(scheduled_at), now);
    })
    .await?;

    tracing::info!(
        post_id = %post.post_id,
        scheduled_at = %format_utc_rfc3339(scheduled_at),
        "Post scheduled"
    );
    nudge_scheduler(&state, &post);
    Ok(Json(post.into()))
}

async fn unschedule_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>> {
    let now = Utc::now();
    let post = edit_owned(&state, &auth.user.user_id, &post_id, |post| {
        post.set_schedule(None, now);
    })
    .await?;

    tracing::info!(post_id = %post.post_id, "Post unscheduled");
    Ok(Json(post.into()))
}

async fn publish_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>> {
    let post = state
        .publisher
        .publish_now(&auth.user.user_id, &post_id)
        .await?;
    Ok(Json(post.into()))
}
