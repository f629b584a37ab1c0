//! Recipe endpoints, including favorites and the shopping cart.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use foodgram_common::{AppError, AppResult, DocumentFormat};
use foodgram_core::{
    CreateRecipeInput, RecipeDetail, RecipeQuery, UpdateRecipeInput, renderer_for,
};
use foodgram_db::entities::{recipe, relation::RelationKind, user};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{tags::TagResponse, users::UserResponse};
use crate::{
    extractors::{ActiveUser, MaybeAuthUser},
    middleware::AppState,
    response::{Attachment, Page, PageQuery, no_content},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_recipes).post(create_recipe))
        .route("/download_shopping_cart", get(download_shopping_cart))
        .route(
            "/{id}",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route("/{id}/favorite", post(add_favorite).delete(remove_favorite))
        .route(
            "/{id}/shopping_cart",
            post(add_to_cart).delete(remove_from_cart),
        )
}

/// Ingredient line of a recipe.
#[derive(Debug, Serialize)]
pub struct RecipeIngredientResponse {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe representation.
#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: String,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
}

impl From<RecipeDetail> for RecipeResponse {
    fn from(detail: RecipeDetail) -> Self {
        let RecipeDetail {
            recipe,
            author,
            author_is_subscribed,
            tags,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
        } = detail;

        Self {
            id: recipe.id,
            tags: tags.into_iter().map(TagResponse::from).collect(),
            author: UserResponse::new(author, author_is_subscribed),
            ingredients: ingredients
                .into_iter()
                .map(|row| RecipeIngredientResponse {
                    id: row.id,
                    name: row.name,
                    measurement_unit: row.measurement_unit,
                    amount: row.amount,
                })
                .collect(),
            is_favorited,
            is_in_shopping_cart,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Short recipe representation used by favorites, cart and subscriptions.
#[derive(Debug, Serialize)]
pub struct ShortRecipeResponse {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl From<recipe::Model> for ShortRecipeResponse {
    fn from(recipe: recipe::Model) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Recipe list query. `tags` may repeat.
#[derive(Debug, Default, Deserialize)]
pub struct ListRecipesQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

/// `1` and `true` switch a flag filter on.
fn flag_set(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "True"))
}

/// Shopping list download query.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    pub format: Option<DocumentFormat>,
}

fn ensure_can_edit(user: &user::Model, recipe: &recipe::Model) -> AppResult<()> {
    if recipe.author_id == user.id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the author can change this recipe".to_string(),
        ))
    }
}

async fn detail(
    state: &AppState,
    viewer: Option<&str>,
    recipe: recipe::Model,
) -> AppResult<RecipeResponse> {
    let id = recipe.id.clone();
    state
        .recipe_service
        .details(viewer, vec![recipe])
        .await?
        .into_iter()
        .next()
        .map(RecipeResponse::from)
        .ok_or(AppError::RecipeNotFound(id))
}

/// List recipes, newest first.
async fn list_recipes(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    axum_extra::extract::Query(query): axum_extra::extract::Query<ListRecipesQuery>,
) -> AppResult<Json<Page<RecipeResponse>>> {
    let window = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .window(&state.pagination);
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());

    let filter = RecipeQuery {
        author_id: query.author,
        tag_slugs: query.tags,
        is_favorited: flag_set(query.is_favorited.as_deref()),
        is_in_shopping_cart: flag_set(query.is_in_shopping_cart.as_deref()),
    };

    let (recipes, count) = state
        .recipe_service
        .list(viewer_id, filter, window.limit, window.offset)
        .await?;
    let results = state
        .recipe_service
        .details(viewer_id, recipes)
        .await?
        .into_iter()
        .map(RecipeResponse::from)
        .collect();

    Ok(Json(Page::new(results, count, window)))
}

async fn get_recipe(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<RecipeResponse>> {
    let recipe = state.recipe_service.get(&id).await?;
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    Ok(Json(detail(&state, viewer_id, recipe).await?))
}

async fn create_recipe(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Json(input): Json<CreateRecipeInput>,
) -> AppResult<impl IntoResponse> {
    let recipe = state.recipe_service.create(&user.id, input).await?;
    let response = detail(&state, Some(&user.id), recipe).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_recipe(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateRecipeInput>,
) -> AppResult<Json<RecipeResponse>> {
    let recipe = state.recipe_service.get(&id).await?;
    ensure_can_edit(&user, &recipe)?;

    let updated = state.recipe_service.update(&id, input).await?;
    Ok(Json(detail(&state, Some(&user.id), updated).await?))
}

async fn delete_recipe(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let recipe = state.recipe_service.get(&id).await?;
    ensure_can_edit(&user, &recipe)?;

    state.recipe_service.delete(&id).await?;
    Ok(no_content())
}

async fn add_relation(
    state: &AppState,
    kind: RelationKind,
    user: &user::Model,
    recipe_id: &str,
) -> AppResult<impl IntoResponse + use<>> {
    state
        .relation_service
        .add(kind, &user.id, recipe_id)
        .await?;
    let recipe = state.recipe_service.get(recipe_id).await?;
    Ok((StatusCode::CREATED, Json(ShortRecipeResponse::from(recipe))))
}

async fn remove_relation(
    state: &AppState,
    kind: RelationKind,
    user: &user::Model,
    recipe_id: &str,
) -> AppResult<impl IntoResponse + use<>> {
    state
        .relation_service
        .remove(kind, &user.id, recipe_id)
        .await?;
    Ok(no_content())
}

async fn add_favorite(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    add_relation(&state, RelationKind::Favorite, &user, &id).await
}

async fn remove_favorite(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    remove_relation(&state, RelationKind::Favorite, &user, &id).await
}

async fn add_to_cart(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    add_relation(&state, RelationKind::Cart, &user, &id).await
}

async fn remove_from_cart(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    remove_relation(&state, RelationKind::Cart, &user, &id).await
}

/// Download the caller's aggregated shopping list as a document.
async fn download_shopping_cart(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> AppResult<Attachment> {
    let items = state
        .shopping_list_service
        .build(user.as_ref().map(|u| u.id.as_str()))
        .await?;
    let user = user.ok_or(AppError::Unauthorized)?;

    let format = query.format.unwrap_or(state.export.default_format);
    let document = renderer_for(format, &state.export)?.render(&user.full_name(), &items)?;

    info!(
        user_id = %user.id,
        format = ?format,
        items = items.len(),
        "Shopping list downloaded"
    );
    Ok(Attachment(document))
}
