// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account sessions and Medium OAuth routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, removal_cookie, session_cookie, AuthUser};
use crate::models::{User, UserResponse};
use crate::services::{medium, oauth_state, password};
use crate::AppState;

/// Routes reachable without a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/medium/callback", get(medium_callback))
}

/// Routes that need a session (guard applied in routes/mod.rs).
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/medium", get(medium_start))
}

// ─── Local Accounts ──────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(length(min = 8, max = 256))]
    password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// Session response; the token is also set as an HttpOnly cookie.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
}

fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let token = create_jwt(&user.user_id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let jar = jar.add(session_cookie(token.clone(), state.config.secure_cookies()));
    Ok((
        jar,
        Json(SessionResponse {
            token,
            user: UserResponse::from_user(user, Utc::now()),
        }),
    ))
}

async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> Result<Response> {
    body.validate()?;

    let password_hash = password::hash_password_blocking(body.password).await?;
    let user = User::new(&body.email, &body.name, password_hash, Utc::now());
    state.db.create_user(&user).await?;

    tracing::info!(user_id = %user.user_id, "User registered");

    let (jar, json) = start_session(&state, jar, &user)?;
    Ok((StatusCode::CREATED, jar, json).into_response())
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let Some(user) = state.db.get_user_by_email(&body.email).await? else {
        password::verify_missing_account_blocking(body.password).await?;
        return Err(AppError::Unauthorized);
    };

    let valid =
        password::verify_password_blocking(body.password, user.password_hash.clone()).await?;
    if !valid {
        tracing::info!(user_id = %user.user_id, "Login rejected: bad password");
        return Err(AppError::Unauthorized);
    }

    tracing::info!(user_id = %user.user_id, "User logged in");
    start_session(&state, jar, &user)
}

/// Clear the session cookie. Tokens are stateless, so there is nothing to revoke.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (StatusCode, CookieJar) {
    let jar = jar.add(removal_cookie(state.config.secure_cookies()));
    (StatusCode::NO_CONTENT, jar)
}

// ─── Medium OAuth ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct MediumStartParams {
    /// `json` returns the consent URL instead of redirecting
    #[serde(default)]
    mode: Option<String>,
}

#[derive(Serialize)]
pub struct AuthorizeUrlResponse {
    pub authorize_url: String,
}

/// Start OAuth flow - redirect to Medium's consent page.
async fn medium_start(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<MediumStartParams>,
) -> Result<Response> {
    let oauth_state =
        oauth_state::create_state(&auth.user.user_id, &state.config.oauth_state_key, Utc::now())
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("OAuth state signing failed")))?;

    let authorize_url = medium::authorize_url(
        &state.config.medium_client_id,
        &state.config.medium_redirect_url,
        &oauth_state,
    );

    tracing::info!(user_id = %auth.user.user_id, "Starting Medium OAuth flow");

    if params.mode.as_deref() == Some("json") {
        return Ok(Json(AuthorizeUrlResponse { authorize_url }).into_response());
    }
    Ok(Redirect::temporary(&authorize_url).into_response())
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens and link them to the user.
async fn medium_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let settings_url = format!("{}/settings", state.config.frontend_url);

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Medium");
        return Ok(Redirect::temporary(&format!(
            "{}?medium=error&reason={}",
            settings_url,
            urlencoding::encode(&error)
        )));
    }

    let user_id = params
        .state
        .as_deref()
        .and_then(|s| oauth_state::verify_state(s, &state.config.oauth_state_key, Utc::now()))
        .ok_or_else(|| AppError::BadRequest("Invalid or expired OAuth state".to_string()))?;

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let tokens = state.medium.exchange_authorization_code(&code).await?;
    let profile = state
        .medium
        .get_profile(&tokens.access_token)
        .await
        .map_err(|e| AppError::OAuthExchangeFailed(format!("Profile lookup failed: {}", e)))?;

    let mut user = state
        .db
        .get_user(&user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    user.link_medium(
        profile.id,
        tokens.access_token,
        tokens.refresh_token,
        tokens.expires_at,
        Utc::now(),
    );
    state.db.upsert_user(&user).await?;

    tracing::info!(
        user_id = %user.user_id,
        medium_username = %profile.username,
        "Medium account connected"
    );

    Ok(Redirect::temporary(&format!(
        "{}?medium=connected",
        settings_url
    )))
}
