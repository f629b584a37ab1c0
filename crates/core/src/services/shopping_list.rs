//! Shopping list aggregation.

use std::collections::BTreeMap;

use foodgram_common::{AppError, AppResult};
use foodgram_db::repositories::{CartIngredientRow, ShoppingListRepository};
use serde::Serialize;
use tracing::debug;

/// One line of the shopping list: the summed amount of an ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    /// Ingredient name as stored in the catalog.
    pub name: String,
    /// Unit the total is expressed in.
    pub measurement_unit: String,
    /// Sum of the amounts across every recipe in the cart.
    pub total_amount: u64,
}

/// Sum cart rows by (name, measurement unit).
///
/// Rows are grouped on the exact name and unit strings, not on ingredient
/// identity, so two catalog entries with the same name and unit merge. The
/// result is ordered by name, then unit.
pub fn aggregate(rows: Vec<CartIngredientRow>) -> AppResult<Vec<ShoppingListItem>> {
    let mut totals: BTreeMap<(String, String), u64> = BTreeMap::new();

    for row in rows {
        let amount = u64::try_from(row.amount)
            .ok()
            .filter(|a| *a >= 1)
            .ok_or_else(|| {
                AppError::InvalidAmount(format!("{} has amount {}", row.name, row.amount))
            })?;

        *totals.entry((row.name, row.measurement_unit)).or_insert(0) += amount;
    }

    Ok(totals
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| ShoppingListItem {
            name,
            measurement_unit,
            total_amount,
        })
        .collect())
}

/// Builds the aggregated shopping list of a user's cart.
#[derive(Clone)]
pub struct ShoppingListService {
    shopping_list_repo: ShoppingListRepository,
}

impl ShoppingListService {
    /// Create a new shopping list service.
    #[must_use]
    pub const fn new(shopping_list_repo: ShoppingListRepository) -> Self {
        Self { shopping_list_repo }
    }

    /// Aggregate the cart of `caller`. Anonymous callers are rejected before
    /// any query runs.
    pub async fn build(&self, caller: Option<&str>) -> AppResult<Vec<ShoppingListItem>> {
        let user_id = caller.ok_or(AppError::Unauthorized)?;

        let rows = self.shopping_list_repo.find_cart_ingredients(user_id).await?;
        let row_count = rows.len();
        let items = aggregate(rows)?;

        debug!(user_id = %user_id, rows = row_count, items = items.len(), "Shopping list built");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::{collections::BTreeMap, sync::Arc};

    fn cart_row(name: &str, unit: &str, amount: i32) -> CartIngredientRow {
        CartIngredientRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn mock_row(name: &str, unit: &str, amount: i32) -> BTreeMap<&'static str, Value> {
        btreemap! {
            "name" => Value::String(Some(Box::new(name.to_string()))),
            "measurement_unit" => Value::String(Some(Box::new(unit.to_string()))),
            "amount" => Value::Int(Some(amount)),
        }
    }

    fn item(name: &str, unit: &str, total_amount: u64) -> ShoppingListItem {
        ShoppingListItem {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total_amount,
        }
    }

    #[test]
    fn test_aggregate_sums_across_recipes() {
        // Recipe A: flour 200 g, salt 5 g; recipe B: flour 100 g
        let rows = vec![
            cart_row("Flour", "g", 200),
            cart_row("Salt", "g", 5),
            cart_row("Flour", "g", 100),
        ];

        let items = aggregate(rows).unwrap();

        assert_eq!(items, vec![item("Flour", "g", 300), item("Salt", "g", 5)]);
    }

    #[test]
    fn test_aggregate_keeps_units_apart() {
        let rows = vec![
            cart_row("молоко", "мл", 200),
            cart_row("молоко", "стакан", 1),
            cart_row("молоко", "мл", 300),
        ];

        let items = aggregate(rows).unwrap();

        assert_eq!(
            items,
            vec![item("молоко", "мл", 500), item("молоко", "стакан", 1)]
        );
    }

    #[test]
    fn test_aggregate_orders_by_name_then_unit() {
        let rows = vec![
            cart_row("яйца", "шт", 2),
            cart_row("Сахар", "г", 50),
            cart_row("мука", "ст. л.", 1),
            cart_row("мука", "г", 100),
        ];

        let names: Vec<(String, String)> = aggregate(rows)
            .unwrap()
            .into_iter()
            .map(|i| (i.name, i.measurement_unit))
            .collect();

        assert_eq!(
            names,
            vec![
                ("Сахар".to_string(), "г".to_string()),
                ("мука".to_string(), "г".to_string()),
                ("мука".to_string(), "ст. л.".to_string()),
                ("яйца".to_string(), "шт".to_string()),
            ]
        );
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_aggregate_rejects_non_positive_amount() {
        let zero = aggregate(vec![cart_row("Flour", "g", 0)]);
        let negative = aggregate(vec![cart_row("Flour", "g", 100), cart_row("Salt", "g", -3)]);

        assert!(matches!(zero, Err(AppError::InvalidAmount(_))));
        assert!(matches!(negative, Err(AppError::InvalidAmount(_))));
    }

    #[test]
    fn test_aggregate_does_not_overflow_i32() {
        let rows = vec![
            cart_row("Water", "ml", i32::MAX),
            cart_row("Water", "ml", i32::MAX),
        ];

        let items = aggregate(rows).unwrap();

        assert_eq!(items[0].total_amount, 2 * u64::from(i32::MAX.unsigned_abs()));
    }

    #[tokio::test]
    async fn test_build_anonymous_is_unauthorized() {
        // No mock results: reaching the database would surface a Database error
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let svc = ShoppingListService::new(ShoppingListRepository::new(db));

        let result = svc.build(None).await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_build_empty_cart() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<BTreeMap<&'static str, Value>>::new()])
                .into_connection(),
        );
        let svc = ShoppingListService::new(ShoppingListRepository::new(db));

        let items = svc.build(Some("user1")).await.unwrap();

        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_build_is_repeatable() {
        let rows = vec![
            mock_row("Flour", "g", 200),
            mock_row("Salt", "g", 5),
            mock_row("Flour", "g", 100),
        ];
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([rows.clone(), rows])
                .into_connection(),
        );
        let svc = ShoppingListService::new(ShoppingListRepository::new(db));

        let first = svc.build(Some("user1")).await.unwrap();
        let second = svc.build(Some("user1")).await.unwrap();

        assert_eq!(first, vec![item("Flour", "g", 300), item("Salt", "g", 5)]);
        assert_eq!(first, second);
    }
}
