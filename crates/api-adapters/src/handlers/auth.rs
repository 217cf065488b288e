//! Session endpoints: login, register, logout, me, and the two
//! identity-provider bridges.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use domains::AppError;
use serde::Deserialize;
use serde_json::{json, Value};
use services::RegisterInput;

use super::non_empty;
use crate::error::ApiResult;
use crate::session::{
    bearer_token, clear_session_cookie, session_cookie, Session, DAY_SECS, REMEMBER_SECS,
};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default, rename = "rememberMe")]
    remember_me: bool,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> ApiResult<impl IntoResponse> {
    let result = state.auth.login(&body.email, &body.password).await;
    let outcome = match &result {
        Ok(_) => "success",
        Err(AppError::RateLimited { .. }) => "locked_out",
        Err(AppError::Unauthorized(_)) => "rejected",
        Err(_) => "error",
    };
    state.metrics.observe_login(outcome);
    let (user, token) = result?;

    let max_age = if body.remember_me {
        REMEMBER_SECS
    } else {
        DAY_SECS
    };
    let cookie = session_cookie(&token, max_age, state.cookie_secure);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "success": true,
            "user": user,
            "message": "Login successful",
            "token": token,
        })),
    ))
}

#[derive(Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default, rename = "confirmPassword")]
    confirm_password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> ApiResult<impl IntoResponse> {
    let (user, token) = state
        .directory
        .register(RegisterInput {
            username: body.username,
            email: body.email,
            password: body.password,
            confirm_password: body.confirm_password,
        })
        .await?;

    let cookie = session_cookie(&token, REMEMBER_SECS, state.cookie_secure);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "success": true,
            "user": user,
            "message": "Registration successful",
            "token": token,
        })),
    ))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie(state.cookie_secure))],
        Json(json!({
            "success": true,
            "message": "Logout successful",
        })),
    )
}

pub async fn me(State(state): State<AppState>, session: Session) -> ApiResult<Json<Value>> {
    let user = state.auth.current_user(&session.token).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

#[derive(Deserialize)]
pub struct ProviderUserBody {
    email: Option<String>,
    username: Option<String>,
}

/// Reconciles a provider-authenticated identity into the local directory.
/// Clients call this on authenticated page loads, so it must be idempotent.
pub async fn provider_user(
    State(state): State<AppState>,
    Json(body): Json<ProviderUserBody>,
) -> ApiResult<Json<Value>> {
    let Some(email) = non_empty(body.email) else {
        return Err(AppError::validation("Email is required").into());
    };
    let suggested = non_empty(body.username);

    let user = state
        .directory
        .reconcile_provider_identity(&email, suggested.as_deref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "user": {
            "id": user.id,
            "email": user.email,
            "username": user.username,
            "user_role": user.user_role,
        }
    })))
}

#[derive(Deserialize)]
pub struct FixUsernameBody {
    email: Option<String>,
    username: Option<String>,
}

/// Pushes the local username into the provider's user metadata. The bearer
/// token must be a provider session, and it must belong to the named account.
pub async fn fix_username(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<FixUsernameBody>,
) -> ApiResult<Json<Value>> {
    let (Some(email), Some(username)) = (non_empty(body.email), non_empty(body.username)) else {
        return Err(AppError::validation("Email and username are required").into());
    };

    let token = bearer_token(&headers).ok_or_else(|| {
        AppError::Unauthorized("No authentication token found".into())
    })?;
    let provider = state
        .provider
        .as_ref()
        .ok_or_else(|| AppError::Internal("identity provider is not configured".into()))?;

    let identity = provider.resolve(&token).await?;
    if !identity.email.eq_ignore_ascii_case(&email) {
        return Err(
            AppError::Forbidden("Session does not match the requested account".into()).into(),
        );
    }

    provider.set_username(&token, &username).await?;
    tracing::info!(%email, %username, "provider username updated");
    Ok(Json(json!({
        "success": true,
        "message": "Username updated successfully",
    })))
}
