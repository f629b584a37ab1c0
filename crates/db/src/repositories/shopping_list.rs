//! Shopping list source rows.

use std::sync::Arc;

use super::RelationRepository;
use crate::entities::{IngredientAmount, ingredient, ingredient_amount, relation::RelationKind};
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QuerySelect, RelationTrait,
};

/// One ingredient line of one recipe in a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct CartIngredientRow {
    /// Ingredient name.
    pub name: String,
    /// Ingredient measurement unit.
    pub measurement_unit: String,
    /// Amount used by this one recipe.
    pub amount: i32,
}

/// Reads the ingredient lines behind a user's shopping cart.
#[derive(Clone)]
pub struct ShoppingListRepository {
    db: Arc<DatabaseConnection>,
}

impl ShoppingListRepository {
    /// Create a new shopping list repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Every (name, unit, amount) row of every recipe in `user_id`'s cart.
    ///
    /// One row per recipe ingredient, unsummed and unordered.
    pub async fn find_cart_ingredients(&self, user_id: &str) -> AppResult<Vec<CartIngredientRow>> {
        IngredientAmount::find()
            .select_only()
            .column_as(ingredient::Column::Name, "name")
            .column_as(ingredient::Column::MeasurementUnit, "measurement_unit")
            .column_as(ingredient_amount::Column::Amount, "amount")
            .join(
                JoinType::InnerJoin,
                ingredient_amount::Relation::Ingredient.def(),
            )
            .filter(ingredient_amount::Column::RecipeId.in_subquery(
                RelationRepository::object_ids_query(RelationKind::Cart, user_id),
            ))
            .into_model::<CartIngredientRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
