// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed OAuth `state` parameter.
//!
//! The Medium consent redirect carries `base64url(user_id|timestamp_hex|sig_hex)`
//! so the callback, which arrives without our session cookie guarantees,
//! knows which user started the flow and that we issued the value.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// How long a consent round trip may take.
pub const STATE_MAX_AGE_SECS: i64 = 10 * 60;

fn sign(payload: &str, key: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(payload.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Create a state value binding `user_id` to the current time.
pub fn create_state(user_id: &str, key: &[u8], now: DateTime<Utc>) -> Option<String> {
    let payload = format!("{}|{:x}", user_id, now.timestamp_millis());
    let signature = sign(&payload, key)?;
    Some(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify a state value and return the user ID it was issued for.
pub fn verify_state(state: &str, key: &[u8], now: DateTime<Utc>) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;

    let mut parts = decoded.splitn(3, '|');
    let (user_id, timestamp_hex, signature_hex) = (parts.next()?, parts.next()?, parts.next()?);
    if user_id.is_empty() {
        return None;
    }

    let expected = sign(&format!("{}|{}", user_id, timestamp_hex), key)?;
    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::warn!("OAuth state signature mismatch");
        return None;
    }

    let issued_ms = i64::from_str_radix(timestamp_hex, 16).ok()?;
    let age_ms = now.timestamp_millis() - issued_ms;
    if !(0..=STATE_MAX_AGE_SECS * 1000).contains(&age_ms) {
        tracing::warn!(age_ms, "OAuth state expired");
        return None;
    }

    Some(user_id.to_string())
}
