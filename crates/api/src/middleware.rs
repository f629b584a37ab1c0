//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use foodgram_common::config::{ExportConfig, PaginationConfig};
use foodgram_core::{
    IngredientService, RecipeService, RelationService, ShoppingListService, TagService,
    UserService,
};
use tracing::debug;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub tag_service: TagService,
    pub ingredient_service: IngredientService,
    pub recipe_service: RecipeService,
    pub relation_service: RelationService,
    pub shopping_list_service: ShoppingListService,
    pub export: ExportConfig,
    pub pagination: PaginationConfig,
}

/// Token from an `Authorization: Token <t>` or `Authorization: Bearer <t>` header.
fn bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Token ")
        .or_else(|| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware.
///
/// A valid token puts the user into the request extensions; anything else
/// leaves the request anonymous and lets the extractors decide.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = bearer_token(auth_str)
    {
        match state.user_service.authenticate_by_token(token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => debug!(error = %e, "Ignoring invalid token"),
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_accepts_both_schemes() {
        assert_eq!(bearer_token("Token abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
    }

    #[test]
    fn test_bearer_token_rejects_other_values() {
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Token "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
