//! Category listing and creation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domains::NewCategory;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let categories = state.forum.list_categories().await?;
    Ok(Json(json!({ "categories": categories })))
}

#[derive(Deserialize)]
pub struct CreateCategoryBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    slug: String,
    description: Option<String>,
    color: Option<String>,
    icon: Option<String>,
    sort_order: Option<i32>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryBody>,
) -> ApiResult<impl IntoResponse> {
    let category = state
        .forum
        .create_category(NewCategory {
            name: body.name,
            slug: body.slug,
            description: body.description,
            color: body.color,
            icon: body.icon,
            sort_order: body.sort_order,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "category": category }))))
}
