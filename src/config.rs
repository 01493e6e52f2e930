// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use hkdf::Hkdf;
use sha2::Sha256;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Where User and Post documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// `firestore://<project-id>`
    Firestore { project_id: String },
    /// `memory://` (single instance, not durable)
    Memory,
}

impl DatabaseUrl {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw == "memory://" || raw == "memory" {
            return Ok(DatabaseUrl::Memory);
        }

        match raw.strip_prefix("firestore://") {
            Some(project_id) if !project_id.is_empty() && !project_id.contains('/') => {
                Ok(DatabaseUrl::Firestore {
                    project_id: project_id.to_string(),
                })
            }
            _ => Err(ConfigError::Invalid("DATABASE_URL", raw.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Medium OAuth client ID (public)
    pub medium_client_id: String,
    /// Callback URL registered with Medium
    pub medium_redirect_url: String,
    /// Frontend URL for CORS and post-OAuth redirects
    pub frontend_url: String,
    /// Document store location
    pub database_url: DatabaseUrl,
    /// Server port
    pub port: u16,
    /// Period of the scheduled publish trigger
    pub scheduler_interval: Duration,
    /// Per-call timeout for Medium API requests
    pub medium_timeout: Duration,
    /// Directory for uploaded images
    pub upload_dir: PathBuf,
    /// Requests allowed per client per rate-limit window
    pub rate_limit_max_requests: u32,
    /// Key rate limits on `X-Forwarded-For` (only behind a trusted proxy)
    pub trust_proxy_headers: bool,

    // --- Secrets ---
    /// Medium OAuth client secret
    pub medium_client_secret: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the OAuth `state` parameter, derived from the session secret
    pub oauth_state_key: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        let jwt_signing_key = b"test_jwt_key_32_bytes_minimum!!".to_vec();
        Self {
            medium_client_id: "test_client_id".to_string(),
            medium_redirect_url: "http://localhost:8080/auth/medium/callback".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            database_url: DatabaseUrl::Memory,
            port: 8080,
            scheduler_interval: Duration::from_secs(60),
            medium_timeout: Duration::from_secs(5),
            upload_dir: env::temp_dir().join("medium-publisher-uploads"),
            rate_limit_max_requests: crate::middleware::rate_limit::DEFAULT_MAX_REQUESTS,
            trust_proxy_headers: false,
            medium_client_secret: "test_secret".to_string(),
            oauth_state_key: derive_oauth_state_key(&jwt_signing_key),
            jwt_signing_key,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("SESSION_SECRET")
            .map_err(|_| ConfigError::Missing("SESSION_SECRET"))?
            .into_bytes();
        if jwt_signing_key.len() < 32 {
            return Err(ConfigError::Invalid(
                "SESSION_SECRET",
                "must be at least 32 bytes".to_string(),
            ));
        }

        Ok(Self {
            medium_client_id: env::var("MEDIUM_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("MEDIUM_CLIENT_ID"))?,
            medium_redirect_url: env::var("MEDIUM_REDIRECT_URL")
                .map_err(|_| ConfigError::Missing("MEDIUM_REDIRECT_URL"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            database_url: DatabaseUrl::parse(
                &env::var("DATABASE_URL").unwrap_or_else(|_| "memory://".to_string()),
            )?,
            port: parse_or_default("PORT", 8080)?,
            scheduler_interval: non_zero_secs(
                "SCHEDULER_INTERVAL_SECS",
                parse_or_default("SCHEDULER_INTERVAL_SECS", 60)?,
            )?,
            medium_timeout: non_zero_secs(
                "MEDIUM_TIMEOUT_SECS",
                parse_or_default("MEDIUM_TIMEOUT_SECS", 30)?,
            )?,
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            rate_limit_max_requests: parse_or_default(
                "RATE_LIMIT_MAX_REQUESTS",
                crate::middleware::rate_limit::DEFAULT_MAX_REQUESTS,
            )?,
            trust_proxy_headers: parse_or_default("TRUST_PROXY_HEADERS", false)?,

            medium_client_secret: env::var("MEDIUM_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MEDIUM_CLIENT_SECRET"))?,
            oauth_state_key: derive_oauth_state_key(&jwt_signing_key),
            jwt_signing_key,
        })
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

fn parse_or_default<T: std::str::FromStr>(
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

fn non_zero_secs(name: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid(name, "must be at least 1 second".to_string()));
    }
    Ok(Duration::from_secs(secs))
}

/// Derive a separate key for OAuth state signing so the session key is never
/// used for two purposes.
fn derive_oauth_state_key(session_secret: &[u8]) -> Vec<u8> {
    let hk = Hkdf::<Sha256>::new(None, session_secret);
    let mut okm = [0u8; 32];
    // 32 bytes is always a valid HKDF-SHA256 output length
    hk.expand(b"medium-publisher oauth state", &mut okm)
        .unwrap_or_default();
    okm.to_vec()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
