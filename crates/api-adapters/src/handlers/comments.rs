//! Comment listing and creation.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domains::{AppError, NewComment, PageRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use services::COMMENTS_PAGE_SIZE;
use uuid::Uuid;

use super::non_empty;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CommentListQuery {
    #[serde(rename = "threadId")]
    thread_id: Option<Uuid>,
    page: Option<u32>,
    limit: Option<u32>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CommentListQuery>,
) -> ApiResult<Json<Value>> {
    let Some(thread_id) = query.thread_id else {
        return Err(AppError::validation("threadId is required").into());
    };
    let page = PageRequest::clamped(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(COMMENTS_PAGE_SIZE),
    );

    let (comments, pagination) = state.forum.list_comments(thread_id, page).await?;
    Ok(Json(json!({
        "comments": comments,
        "pagination": pagination,
    })))
}

#[derive(Deserialize)]
pub struct CreateCommentBody {
    thread_id: Option<Uuid>,
    author_id: Option<Uuid>,
    parent_id: Option<Uuid>,
    content: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateCommentBody>,
) -> ApiResult<impl IntoResponse> {
    let (Some(thread_id), Some(author_id), Some(content)) =
        (body.thread_id, body.author_id, non_empty(body.content))
    else {
        return Err(AppError::validation("thread_id, author_id, and content are required").into());
    };

    let comment = state
        .forum
        .create_comment(NewComment {
            thread_id,
            author_id,
            parent_id: body.parent_id,
            content,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "comment": comment }))))
}
