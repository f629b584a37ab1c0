//! User, subscription and password endpoints.

use std::collections::{HashMap, HashSet};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use foodgram_common::{AppError, AppResult};
use foodgram_core::{CreateUserInput, SetPasswordInput};
use foodgram_db::entities::{relation::RelationKind, user};
use serde::{Deserialize, Serialize};

use super::recipes::ShortRecipeResponse;
use crate::{
    extractors::{ActiveUser, AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{Page, PageQuery, no_content},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(signup))
        .route("/me", get(me))
        .route("/set_password", post(set_password))
        .route("/subscriptions", get(subscriptions))
        .route("/{id}", get(get_user))
        .route("/{id}/subscribe", post(subscribe).delete(unsubscribe))
}

/// Public user representation.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub email: String,
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserResponse {
    #[must_use]
    pub fn new(user: user::Model, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

/// Returned right after signing up.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub email: String,
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// A followed author with their recipes.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<ShortRecipeResponse>,
    pub recipes_count: u64,
}

/// Subscription list query.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub recipes_limit: Option<u64>,
}

/// Subscribe request query.
#[derive(Debug, Default, Deserialize)]
pub struct SubscribeQuery {
    pub recipes_limit: Option<u64>,
}

/// Build subscription entries for `authors` with two queries in total.
async fn subscription_entries(
    state: &AppState,
    authors: Vec<user::Model>,
    recipes_limit: Option<u64>,
) -> AppResult<Vec<SubscriptionResponse>> {
    let author_ids: Vec<String> = authors.iter().map(|a| a.id.clone()).collect();
    let mut recipes = state
        .recipe_service
        .by_authors(&author_ids, recipes_limit)
        .await?;
    let counts = state.recipe_service.count_by_authors(&author_ids).await?;

    Ok(authors
        .into_iter()
        .map(|author| SubscriptionResponse {
            recipes: recipes
                .remove(&author.id)
                .unwrap_or_default()
                .into_iter()
                .map(ShortRecipeResponse::from)
                .collect(),
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
            user: UserResponse::new(author, true),
        })
        .collect())
}

/// Sign up.
async fn signup(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> AppResult<impl IntoResponse> {
    let user = state.user_service.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }),
    ))
}

/// List users, oldest first.
async fn list_users(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<UserResponse>>> {
    let window = query.window(&state.pagination);
    let count = state.user_service.count().await?;
    let users = state
        .user_service
        .list(window.limit, window.offset)
        .await?;

    let subscribed = match &viewer {
        Some(viewer) => {
            let ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();
            state
                .relation_service
                .objects_of(RelationKind::Follow, &viewer.id, &ids)
                .await?
        }
        None => HashSet::new(),
    };

    let results = users
        .into_iter()
        .map(|u| {
            let is_subscribed = subscribed.contains(&u.id);
            UserResponse::new(u, is_subscribed)
        })
        .collect();

    Ok(Json(Page::new(results, count, window)))
}

/// The current user.
async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::new(user, false))
}

/// A user's profile.
async fn get_user(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let user = state.user_service.get(&id).await?;
    let is_subscribed = match &viewer {
        Some(viewer) => {
            state
                .relation_service
                .exists(RelationKind::Follow, &viewer.id, &user.id)
                .await?
        }
        None => false,
    };
    Ok(Json(UserResponse::new(user, is_subscribed)))
}

/// Change the caller's password.
async fn set_password(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Json(input): Json<SetPasswordInput>,
) -> AppResult<impl IntoResponse> {
    state.user_service.set_password(&user.id, input).await?;
    Ok(no_content())
}

/// Authors the caller follows, most recently followed first.
async fn subscriptions(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SubscriptionsQuery>,
) -> AppResult<Json<Page<SubscriptionResponse>>> {
    let window = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .window(&state.pagination);

    let count = state
        .relation_service
        .count_objects(RelationKind::Follow, &user.id)
        .await?;
    let author_ids = state
        .relation_service
        .list_objects(RelationKind::Follow, &user.id, window.limit, window.offset)
        .await?;

    let mut authors: HashMap<String, user::Model> = state
        .user_service
        .get_many(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();
    let ordered = author_ids
        .iter()
        .filter_map(|id| authors.remove(id))
        .collect();

    let results = subscription_entries(&state, ordered, query.recipes_limit).await?;

    Ok(Json(Page::new(results, count, window)))
}

/// Follow an author.
async fn subscribe(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SubscribeQuery>,
) -> AppResult<impl IntoResponse> {
    state
        .relation_service
        .add(RelationKind::Follow, &user.id, &id)
        .await?;

    let author = state.user_service.get(&id).await?;
    let entry = subscription_entries(&state, vec![author], query.recipes_limit)
        .await?
        .pop()
        .ok_or(AppError::UserNotFound(id))?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Unfollow an author.
async fn unsubscribe(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state
        .relation_service
        .remove(RelationKind::Follow, &user.id, &id)
        .await?;
    Ok(no_content())
}
