//! Emoji reactions: add, remove, and the grouped listing.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domains::{AppError, ReactionKey, TargetType};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::non_empty;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ReactionBody {
    user_id: Option<Uuid>,
    content_type: Option<String>,
    content_id: Option<Uuid>,
    emoji: Option<String>,
}

impl ReactionBody {
    /// All four fields are mandatory for both adding and removing.
    fn into_key(self) -> Result<ReactionKey, AppError> {
        let (Some(user_id), Some(content_type), Some(content_id), Some(emoji)) = (
            self.user_id,
            non_empty(self.content_type),
            self.content_id,
            non_empty(self.emoji),
        ) else {
            return Err(AppError::validation("Missing required fields"));
        };
        let target_type = TargetType::parse(&content_type)
            .ok_or_else(|| AppError::validation("Invalid content_type"))?;
        Ok(ReactionKey {
            user_id,
            target_type,
            target_id: content_id,
            emoji,
        })
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<ReactionBody>,
) -> ApiResult<impl IntoResponse> {
    let reaction = state.forum.react(body.into_key()?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "reaction": reaction }))))
}

pub async fn remove(
    State(state): State<AppState>,
    Json(body): Json<ReactionBody>,
) -> ApiResult<Json<Value>> {
    state.forum.unreact(body.into_key()?).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
pub struct ReactionListQuery {
    content_type: Option<String>,
    content_id: Option<Uuid>,
    user_id: Option<Uuid>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ReactionListQuery>,
) -> ApiResult<Json<Value>> {
    let (Some(content_type), Some(content_id)) =
        (non_empty(query.content_type), query.content_id)
    else {
        return Err(AppError::validation("Missing content_type or content_id").into());
    };
    let target_type = TargetType::parse(&content_type)
        .ok_or_else(|| AppError::validation("Invalid content_type"))?;

    let reactions = state
        .forum
        .get_reactions(target_type, content_id, query.user_id)
        .await?;
    Ok(Json(json!({ "reactions": reactions })))
}
