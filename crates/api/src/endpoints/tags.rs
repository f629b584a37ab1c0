//! Tag endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use foodgram_common::AppResult;
use foodgram_core::{CreateTagInput, UpdateTagInput};
use foodgram_db::entities::tag;
use serde::Serialize;

use crate::{extractors::AdminUser, middleware::AppState, response::no_content};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route(
            "/{id}",
            get(get_tag).patch(update_tag).delete(delete_tag),
        )
}

/// Tag response.
#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: String,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<tag::Model> for TagResponse {
    fn from(tag: tag::Model) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

/// All tags, unpaginated.
async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Vec<TagResponse>>> {
    let tags = state.tag_service.list().await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<TagResponse>> {
    Ok(Json(state.tag_service.get(&id).await?.into()))
}

async fn create_tag(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTagInput>,
) -> AppResult<impl IntoResponse> {
    let tag = state.tag_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(TagResponse::from(tag))))
}

async fn update_tag(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTagInput>,
) -> AppResult<Json<TagResponse>> {
    Ok(Json(state.tag_service.update(&id, input).await?.into()))
}

async fn delete_tag(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.tag_service.delete(&id).await?;
    Ok(no_content())
}
