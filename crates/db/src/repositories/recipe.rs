//! Recipe repository.

use std::collections::HashMap;
use std::sync::Arc;

use super::RelationRepository;
use crate::entities::{
    IngredientAmount, Recipe, RecipeTag, Tag, UserRelation, ingredient, ingredient_amount,
    recipe, recipe_tag,
    relation::{self, RelationKind},
    tag,
};
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Select, TransactionTrait,
    sea_query::{Expr, Query},
};

/// Recipe list filters. Empty fields do not restrict the result.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author_id: Option<String>,
    /// Recipes carrying any of these tag slugs
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<String>,
    pub in_cart_of: Option<String>,
}

/// Ingredient amount and tag link rows written together with a recipe.
#[derive(Debug, Clone, Default)]
pub struct RecipeParts {
    pub amounts: Vec<ingredient_amount::ActiveModel>,
    pub tags: Vec<recipe_tag::ActiveModel>,
}

/// One ingredient line of a recipe, joined with the catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct RecipeIngredientRow {
    pub recipe_id: String,
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Recipe repository for database operations.
#[derive(Clone)]
pub struct RecipeRepository {
    db: Arc<DatabaseConnection>,
}

impl RecipeRepository {
    /// Create a new recipe repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn filtered(filter: &RecipeFilter) -> Select<Recipe> {
        let mut query = Recipe::find();

        if let Some(author_id) = &filter.author_id {
            query = query.filter(recipe::Column::AuthorId.eq(author_id.as_str()));
        }

        if !filter.tag_slugs.is_empty() {
            query = query.filter(
                recipe::Column::Id.in_subquery(
                    Query::select()
                        .column((RecipeTag, recipe_tag::Column::RecipeId))
                        .from(RecipeTag)
                        .inner_join(
                            Tag,
                            Expr::col((Tag, tag::Column::Id))
                                .equals((RecipeTag, recipe_tag::Column::TagId)),
                        )
                        .and_where(Expr::col((Tag, tag::Column::Slug)).is_in(filter.tag_slugs.clone()))
                        .to_owned(),
                ),
            );
        }

        if let Some(user_id) = &filter.favorited_by {
            query = query.filter(recipe::Column::Id.in_subquery(
                RelationRepository::object_ids_query(RelationKind::Favorite, user_id),
            ));
        }

        if let Some(user_id) = &filter.in_cart_of {
            query = query.filter(recipe::Column::Id.in_subquery(
                RelationRepository::object_ids_query(RelationKind::Cart, user_id),
            ));
        }

        query
    }

    async fn insert_parts<C: ConnectionTrait>(conn: &C, parts: RecipeParts) -> AppResult<()> {
        if !parts.amounts.is_empty() {
            IngredientAmount::insert_many(parts.amounts)
                .exec_without_returning(conn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        if !parts.tags.is_empty() {
            RecipeTag::insert_many(parts.tags)
                .exec_without_returning(conn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Ok(())
    }

    /// Find a recipe by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<recipe::Model>> {
        Recipe::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a recipe by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<recipe::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::RecipeNotFound(id.to_string()))
    }

    /// List recipes matching `filter`, newest first (paginated).
    pub async fn list(
        &self,
        filter: &RecipeFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<recipe::Model>> {
        Self::filtered(filter)
            .order_by_desc(recipe::Column::CreatedAt)
            .order_by_desc(recipe::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count recipes matching `filter`.
    pub async fn count(&self, filter: &RecipeFilter) -> AppResult<u64> {
        Self::filtered(filter)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Recipes by any of `author_ids`, newest first, at most `limit_per_author`
    /// for each author.
    pub async fn find_by_authors(
        &self,
        author_ids: &[String],
        limit_per_author: Option<u64>,
    ) -> AppResult<HashMap<String, Vec<recipe::Model>>> {
        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let recipes = Recipe::find()
            .filter(recipe::Column::AuthorId.is_in(author_ids.iter().cloned()))
            .order_by_desc(recipe::Column::CreatedAt)
            .order_by_desc(recipe::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let limit = limit_per_author
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);
        let mut by_author: HashMap<String, Vec<recipe::Model>> = HashMap::new();
        for recipe in recipes {
            let entry = by_author.entry(recipe.author_id.clone()).or_default();
            if entry.len() < limit {
                entry.push(recipe);
            }
        }
        Ok(by_author)
    }

    /// Recipe counts of `author_ids`. Authors without recipes are absent.
    pub async fn count_by_authors(&self, author_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, i64)> = Recipe::find()
            .select_only()
            .column(recipe::Column::AuthorId)
            .column_as(recipe::Column::Id.count(), "count")
            .filter(recipe::Column::AuthorId.is_in(author_ids.iter().cloned()))
            .group_by(recipe::Column::AuthorId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(author_id, count)| (author_id, u64::try_from(count).unwrap_or(0)))
            .collect())
    }

    /// Ingredient lines of the given recipes, ordered by ingredient name.
    pub async fn find_ingredients_for(
        &self,
        recipe_ids: &[String],
    ) -> AppResult<Vec<RecipeIngredientRow>> {
        if recipe_ids.is_empty() {
            return Ok(vec![]);
        }

        IngredientAmount::find()
            .select_only()
            .column_as(ingredient_amount::Column::RecipeId, "recipe_id")
            .column_as(ingredient::Column::Id, "id")
            .column_as(ingredient::Column::Name, "name")
            .column_as(ingredient::Column::MeasurementUnit, "measurement_unit")
            .column_as(ingredient_amount::Column::Amount, "amount")
            .join(
                JoinType::InnerJoin,
                ingredient_amount::Relation::Ingredient.def(),
            )
            .filter(ingredient_amount::Column::RecipeId.is_in(recipe_ids.to_vec()))
            .order_by_asc(ingredient::Column::Name)
            .into_model::<RecipeIngredientRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a recipe with its ingredient amounts and tags in one transaction.
    pub async fn create(
        &self,
        model: recipe::ActiveModel,
        parts: RecipeParts,
    ) -> AppResult<recipe::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let recipe = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Self::insert_parts(&txn, parts).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(recipe)
    }

    /// Update a recipe. With `parts`, ingredient amounts and tags are
    /// replaced wholesale in the same transaction.
    pub async fn update(
        &self,
        model: recipe::ActiveModel,
        parts: Option<RecipeParts>,
    ) -> AppResult<recipe::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let recipe = model
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(parts) = parts {
            IngredientAmount::delete_many()
                .filter(ingredient_amount::Column::RecipeId.eq(recipe.id.as_str()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            RecipeTag::delete_many()
                .filter(recipe_tag::Column::RecipeId.eq(recipe.id.as_str()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            Self::insert_parts(&txn, parts).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(recipe)
    }

    /// Delete a recipe together with the favorite and cart relations that
    /// point at it. Returns the number of recipe rows removed.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        UserRelation::delete_many()
            .filter(relation::Column::Kind.is_in([RelationKind::Favorite, RelationKind::Cart]))
            .filter(relation::Column::ObjectId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let deleted = Recipe::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .rows_affected;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(deleted)
    }
}
