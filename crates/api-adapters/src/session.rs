//! Session extraction and cookie plumbing.
//!
//! Tokens travel in the `auth-token` cookie; a bearer `Authorization` header
//! is accepted anywhere the cookie is.

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use domains::{AppError, SessionClaims};

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "auth-token";

/// Default session cookie lifetime.
pub const DAY_SECS: u64 = 24 * 60 * 60;
/// Lifetime for rememberMe logins and fresh registrations.
pub const REMEMBER_SECS: u64 = 30 * DAY_SECS;

/// A verified session: the raw token plus its decoded claims.
pub struct Session {
    pub token: String,
    pub claims: SessionClaims,
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or_else(|| {
            ApiError(AppError::Unauthorized(
                "No authentication token found".into(),
            ))
        })?;
        let claims = state.credentials.verify_token(&token)?;
        Ok(Session { token, claims })
    }
}

/// The session cookie when present, otherwise the bearer header.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, SESSION_COOKIE).or_else(|| bearer_token(headers))
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((k, v)) = pair.split_once('=') {
                if k.trim() == name && !v.trim().is_empty() {
                    return Some(v.trim().to_owned());
                }
            }
        }
    }
    None
}

/// `Set-Cookie` value for a fresh session.
pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that expires the session immediately.
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}
