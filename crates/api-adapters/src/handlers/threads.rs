//! Thread listing, creation, detail, update and deletion.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domains::{AppError, NewThread, PageRequest, SortOrder, ThreadFilter, ThreadPatch, ThreadSort};
use serde::Deserialize;
use serde_json::{json, Value};
use services::THREADS_PAGE_SIZE;
use uuid::Uuid;

use super::non_empty;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ThreadListQuery {
    #[serde(rename = "categoryId")]
    category_id: Option<Uuid>,
    page: Option<u32>,
    limit: Option<u32>,
    #[serde(rename = "sortBy")]
    sort_by: Option<String>,
    #[serde(rename = "sortOrder")]
    sort_order: Option<String>,
    search: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ThreadListQuery>,
) -> ApiResult<Json<Value>> {
    let filter = ThreadFilter {
        category_id: query.category_id,
        search: non_empty(query.search),
        sort_by: query
            .sort_by
            .as_deref()
            .map(ThreadSort::parse)
            .unwrap_or_default(),
        sort_order: query
            .sort_order
            .as_deref()
            .map(SortOrder::parse)
            .unwrap_or_default(),
    };
    let page = PageRequest::clamped(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(THREADS_PAGE_SIZE),
    );

    let (threads, pagination) = state.forum.list_threads(filter, page).await?;
    Ok(Json(json!({
        "threads": threads,
        "pagination": pagination,
    })))
}

#[derive(Deserialize)]
pub struct CreateThreadBody {
    title: Option<String>,
    content: Option<String>,
    category_id: Option<Uuid>,
    author_id: Option<Uuid>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateThreadBody>,
) -> ApiResult<impl IntoResponse> {
    let (Some(title), Some(content), Some(category_id), Some(author_id)) = (
        non_empty(body.title),
        non_empty(body.content),
        body.category_id,
        body.author_id,
    ) else {
        return Err(AppError::validation(
            "Title, content, category_id, and author_id are required",
        )
        .into());
    };

    let thread = state
        .forum
        .create_thread(NewThread {
            title,
            content,
            category_id,
            author_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "thread": thread }))))
}

pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let (thread, comments) = state.forum.get_thread(id).await?;
    Ok(Json(json!({
        "thread": thread,
        "comments": comments,
    })))
}

#[derive(Deserialize)]
pub struct UpdateThreadBody {
    title: Option<String>,
    content: Option<String>,
    category_id: Option<Uuid>,
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateThreadBody>,
) -> ApiResult<Json<Value>> {
    let (Some(title), Some(content)) = (non_empty(body.title), non_empty(body.content)) else {
        return Err(AppError::validation("Title and content are required").into());
    };

    let thread = state
        .forum
        .update_thread(
            id,
            ThreadPatch {
                title,
                content,
                category_id: body.category_id,
            },
        )
        .await?;
    Ok(Json(json!({ "thread": thread })))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    state.forum.delete_thread(id).await?;
    Ok(Json(json!({ "message": "Thread deleted successfully" })))
}
