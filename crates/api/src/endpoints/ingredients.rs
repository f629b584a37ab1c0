//! Ingredient catalog endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use foodgram_common::AppResult;
use foodgram_core::{IngredientInput, UpdateIngredientInput};
use foodgram_db::entities::ingredient;
use serde::{Deserialize, Serialize};

use crate::{extractors::AdminUser, middleware::AppState, response::no_content};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search_ingredients).post(create_ingredient))
        .route(
            "/{id}",
            get(get_ingredient)
                .patch(update_ingredient)
                .delete(delete_ingredient),
        )
}

/// Ingredient response.
#[derive(Debug, Serialize)]
pub struct IngredientResponse {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
}

impl From<ingredient::Model> for IngredientResponse {
    fn from(ingredient: ingredient::Model) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

/// Ingredient search query.
#[derive(Debug, Default, Deserialize)]
pub struct SearchIngredientsQuery {
    /// Case-insensitive name prefix
    pub name: Option<String>,
}

/// Search ingredients by name prefix, ordered by name.
async fn search_ingredients(
    State(state): State<AppState>,
    Query(query): Query<SearchIngredientsQuery>,
) -> AppResult<Json<Vec<IngredientResponse>>> {
    let ingredients = state
        .ingredient_service
        .search(query.name.as_deref())
        .await?;
    Ok(Json(
        ingredients
            .into_iter()
            .map(IngredientResponse::from)
            .collect(),
    ))
}

async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<IngredientResponse>> {
    Ok(Json(state.ingredient_service.get(&id).await?.into()))
}

async fn create_ingredient(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(input): Json<IngredientInput>,
) -> AppResult<impl IntoResponse> {
    let ingredient = state.ingredient_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(IngredientResponse::from(ingredient))))
}

async fn update_ingredient(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateIngredientInput>,
) -> AppResult<Json<IngredientResponse>> {
    Ok(Json(state.ingredient_service.update(&id, input).await?.into()))
}

async fn delete_ingredient(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.ingredient_service.delete(&id).await?;
    Ok(no_content())
}
