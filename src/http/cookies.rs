//! Cookie header helpers.
//!
//! # Responsibilities
//! - Build `Set-Cookie` header values with Expires, Max-Age and Path
//! - Parse the request `Cookie` header
//! - Obscure/reveal values with a shared secret
//!
//! # Design Decisions
//! - Pure functions; the caller decides which response carries the header
//! - An empty secret means "no obscuring", same as no secret

use chrono::{DateTime, TimeDelta, Utc};

use crate::http::response::Header;
use crate::security::obscure::{self, DEFAULT_ROUNDS};

pub const SET_COOKIE: &str = "Set-Cookie";

/// Days a cookie lives when callers do not say otherwise.
pub const DEFAULT_COOKIE_DAYS: u32 = 365;

const SECONDS_PER_DAY: u64 = 86_400;

/// `Set-Cookie` header for `name=value`, expiring in `days` days.
pub fn cookie_header(name: &str, value: &str, secret: Option<&str>, days: u32) -> Header {
    // far-future day counts saturate instead of overflowing the calendar
    let expires = Utc::now()
        .checked_add_signed(TimeDelta::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let value = match secret {
        Some(secret) => obscure_value(secret, value),
        None => value.to_string(),
    };
    (
        SET_COOKIE.to_string(),
        format!(
            "{}={}; Expires={}; Max-Age={}; Path=/",
            name,
            value,
            expires.format("%a, %d %b %Y %H:%M:%S GMT"),
            u64::from(days) * SECONDS_PER_DAY
        ),
    )
}

/// Header that makes the client drop cookie `name`.
pub fn delete_cookie_header(name: &str) -> Header {
    cookie_header(name, "", None, 0)
}

/// Obscure a cookie value with `secret`.
pub fn obscure_value(secret: &str, value: &str) -> String {
    if secret.is_empty() {
        return value.to_string();
    }
    match obscure::encrypt(secret.as_bytes(), value.as_bytes(), DEFAULT_ROUNDS) {
        Ok(hidden) => hidden,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to obscure cookie value, sending it as is");
            value.to_string()
        }
    }
}

/// Reverse [`obscure_value`]. `None` when the value was not obscured with
/// this secret.
pub fn reveal_value(secret: &str, raw: &str) -> Option<String> {
    if secret.is_empty() {
        return Some(raw.to_string());
    }
    let bytes = obscure::decrypt(secret.as_bytes(), raw, DEFAULT_ROUNDS).ok()?;
    String::from_utf8(bytes).ok()
}

/// Parse a `Cookie` request header into `(name, value)` pairs.
/// Malformed pieces are skipped.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|piece| {
            let (name, value) = piece.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
