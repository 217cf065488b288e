//! User directory endpoints. Both require an authenticated session; page
//! bounds are rejected here rather than clamped.

use axum::extract::{Query, State};
use axum::Json;
use domains::{AppError, PageRequest, Role, User, UserFilter};
use serde::Deserialize;
use serde_json::{json, Value};
use services::{AdminNewUser, USERS_PAGE_SIZE};

use super::non_empty;
use crate::error::ApiResult;
use crate::session::Session;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UsersQuery {
    page: Option<String>,
    limit: Option<String>,
    role: Option<String>,
    search: Option<String>,
    active: Option<String>,
}

fn invalid_pagination() -> AppError {
    AppError::validation("Invalid pagination parameters")
}

/// Strict variant of page parsing: anything non-numeric or out of range is a
/// 400, unlike the forum listings which clamp.
fn parse_page(query: &UsersQuery) -> Result<PageRequest, AppError> {
    let page = match &query.page {
        None => 1,
        Some(raw) => raw.parse::<u32>().map_err(|_| invalid_pagination())?,
    };
    let limit = match &query.limit {
        None => USERS_PAGE_SIZE,
        Some(raw) => raw.parse::<u32>().map_err(|_| invalid_pagination())?,
    };
    if page < 1 || limit < 1 || limit > PageRequest::MAX_LIMIT {
        return Err(invalid_pagination());
    }
    Ok(PageRequest { page, limit })
}

fn directory_row(user: &User) -> Value {
    json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "user_role": user.user_role,
        "role_name": user.user_role.name(),
        "created_at": user.created_at,
        "updated_at": user.updated_at,
        "last_login": user.last_login,
        "is_active": user.is_active,
    })
}

pub async fn list(
    State(state): State<AppState>,
    _session: Session,
    Query(query): Query<UsersQuery>,
) -> ApiResult<Json<Value>> {
    let page = parse_page(&query)?;
    let filter = UserFilter {
        role: query
            .role
            .as_deref()
            .and_then(|raw| raw.parse::<i16>().ok())
            .and_then(Role::from_code),
        active: query.active.as_deref().map(|raw| raw == "true"),
        search: non_empty(query.search.clone()),
    };

    let (users, pagination) = state.directory.list_users(filter, page).await?;
    let rows: Vec<Value> = users.iter().map(directory_row).collect();

    Ok(Json(json!({
        "success": true,
        "users": rows,
        "pagination": pagination,
        "filters": {
            "role": query.role,
            "search": query.search,
            "active": query.active,
        }
    })))
}

#[derive(Deserialize)]
pub struct CreateUserBody {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    user_role: Option<i16>,
}

pub async fn create(
    State(state): State<AppState>,
    _session: Session,
    Json(body): Json<CreateUserBody>,
) -> ApiResult<Json<Value>> {
    let user = state
        .directory
        .admin_create(AdminNewUser {
            username: body.username,
            email: body.email,
            password: body.password,
            user_role: body.user_role,
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "user": {
            "id": user.id,
            "username": user.username,
            "email": user.email,
            "user_role": user.user_role,
            "role_name": user.user_role.name(),
            "created_at": user.created_at,
            "is_active": user.is_active,
        },
        "message": "User created successfully",
    })))
}
