//! Recipe service.

use std::collections::{HashMap, HashSet};

use foodgram_common::{AppError, AppResult, IdGenerator};
use foodgram_db::{
    entities::{ingredient_amount, recipe, recipe_tag, relation::RelationKind, tag, user},
    repositories::{
        IngredientRepository, RecipeFilter, RecipeIngredientRow, RecipeParts, RecipeRepository,
        RelationRepository, TagRepository, UserRepository,
    },
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// One ingredient line of a recipe being written.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmountInput {
    /// Ingredient ID
    pub id: String,
    /// Amount in the ingredient's unit, at least 1.
    pub amount: i64,
}

/// Input for creating a recipe.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecipeInput {
    pub ingredients: Vec<IngredientAmountInput>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub image: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(min = 1))]
    pub text: String,

    #[validate(range(min = 1, max = 32000))]
    pub cooking_time: i32,
}

/// Input for updating a recipe. Given ingredient or tag lists replace the
/// current ones wholesale.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRecipeInput {
    pub ingredients: Option<Vec<IngredientAmountInput>>,

    pub tags: Option<Vec<String>>,

    pub image: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(length(min = 1))]
    pub text: Option<String>,

    #[validate(range(min = 1, max = 32000))]
    pub cooking_time: Option<i32>,
}

/// Recipe list query as seen by `viewer`.
#[derive(Debug, Clone, Default)]
pub struct RecipeQuery {
    /// Only recipes by this author.
    pub author_id: Option<String>,
    /// Recipes carrying any of these tags. Empty means no tag filter.
    pub tag_slugs: Vec<String>,
    /// Only recipes the viewer favorited.
    pub is_favorited: bool,
    /// Only recipes in the viewer's shopping cart.
    pub is_in_shopping_cart: bool,
}

/// A recipe with everything its read representation needs.
#[derive(Debug, Clone)]
pub struct RecipeDetail {
    /// The recipe row.
    pub recipe: recipe::Model,
    /// Recipe author.
    pub author: user::Model,
    /// Whether the viewer follows the author.
    pub author_is_subscribed: bool,
    /// Tags ordered by name.
    pub tags: Vec<tag::Model>,
    /// Ingredient lines joined with the catalog.
    pub ingredients: Vec<RecipeIngredientRow>,
    /// Whether the viewer favorited the recipe.
    pub is_favorited: bool,
    /// Whether the recipe is in the viewer's cart.
    pub is_in_shopping_cart: bool,
}

/// Recipe service for business logic.
#[derive(Clone)]
pub struct RecipeService {
    recipe_repo: RecipeRepository,
    ingredient_repo: IngredientRepository,
    tag_repo: TagRepository,
    user_repo: UserRepository,
    relation_repo: RelationRepository,
    id_gen: IdGenerator,
}

/// Check ingredient lines: at least one, amounts ≥ 1, no ingredient twice.
fn check_ingredient_lines(lines: &[IngredientAmountInput]) -> AppResult<()> {
    if lines.is_empty() {
        return Err(AppError::Validation(
            "A recipe needs at least one ingredient".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for line in lines {
        if line.amount < 1 {
            return Err(AppError::InvalidAmount(format!(
                "Amount of {} must be at least 1",
                line.id
            )));
        }
        if i32::try_from(line.amount).is_err() {
            return Err(AppError::Validation(format!(
                "Amount of {} is too large",
                line.id
            )));
        }
        if !seen.insert(line.id.as_str()) {
            return Err(AppError::Validation(format!(
                "Ingredient {} is listed twice",
                line.id
            )));
        }
    }
    Ok(())
}

fn check_tag_ids(tag_ids: &[String]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for id in tag_ids {
        if !seen.insert(id.as_str()) {
            return Err(AppError::Validation(format!("Tag {id} is listed twice")));
        }
    }
    Ok(())
}

impl RecipeService {
    /// Create a new recipe service.
    #[must_use]
    pub const fn new(
        recipe_repo: RecipeRepository,
        ingredient_repo: IngredientRepository,
        tag_repo: TagRepository,
        user_repo: UserRepository,
        relation_repo: RelationRepository,
    ) -> Self {
        Self {
            recipe_repo,
            ingredient_repo,
            tag_repo,
            user_repo,
            relation_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Validate ingredient and tag references and build the rows to insert.
    async fn build_parts(
        &self,
        recipe_id: &str,
        lines: &[IngredientAmountInput],
        tag_ids: &[String],
    ) -> AppResult<RecipeParts> {
        check_ingredient_lines(lines)?;
        check_tag_ids(tag_ids)?;

        let ingredient_ids: Vec<String> = lines.iter().map(|l| l.id.clone()).collect();
        let known: HashSet<String> = self
            .ingredient_repo
            .find_by_ids(&ingredient_ids)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();
        if let Some(missing) = ingredient_ids.iter().find(|id| !known.contains(*id)) {
            return Err(AppError::Validation(format!(
                "Ingredient {missing} does not exist"
            )));
        }

        let known_tags: HashSet<String> = self
            .tag_repo
            .find_by_ids(tag_ids)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        if let Some(missing) = tag_ids.iter().find(|id| !known_tags.contains(*id)) {
            return Err(AppError::Validation(format!("Tag {missing} does not exist")));
        }

        let amounts = lines
            .iter()
            .map(|line| ingredient_amount::ActiveModel {
                id: Set(self.id_gen.generate()),
                recipe_id: Set(recipe_id.to_string()),
                ingredient_id: Set(line.id.clone()),
                // Range checked above
                amount: Set(i32::try_from(line.amount).unwrap_or(i32::MAX)),
            })
            .collect();
        let tags = tag_ids
            .iter()
            .map(|tag_id| recipe_tag::ActiveModel {
                id: Set(self.id_gen.generate()),
                recipe_id: Set(recipe_id.to_string()),
                tag_id: Set(tag_id.clone()),
            })
            .collect();

        Ok(RecipeParts { amounts, tags })
    }

    /// Get a recipe by ID.
    pub async fn get(&self, id: &str) -> AppResult<recipe::Model> {
        self.recipe_repo.get_by_id(id).await
    }

    /// Create a recipe authored by `author_id`.
    pub async fn create(
        &self,
        author_id: &str,
        input: CreateRecipeInput,
    ) -> AppResult<recipe::Model> {
        input.validate()?;

        let id = self.id_gen.generate();
        let parts = self.build_parts(&id, &input.ingredients, &input.tags).await?;

        let model = recipe::ActiveModel {
            id: Set(id),
            author_id: Set(author_id.to_string()),
            name: Set(input.name),
            image: Set(input.image),
            text: Set(input.text),
            cooking_time: Set(input.cooking_time),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.recipe_repo.create(model, parts).await?;
        info!(recipe_id = %created.id, author_id = %author_id, "Recipe created");
        Ok(created)
    }

    /// Update a recipe.
    pub async fn update(&self, id: &str, input: UpdateRecipeInput) -> AppResult<recipe::Model> {
        input.validate()?;

        let recipe = self.recipe_repo.get_by_id(id).await?;

        let parts = if input.ingredients.is_some() || input.tags.is_some() {
            let lines = match input.ingredients {
                Some(lines) => lines,
                None => self
                    .recipe_repo
                    .find_ingredients_for(&[recipe.id.clone()])
                    .await?
                    .into_iter()
                    .map(|row| IngredientAmountInput {
                        id: row.id,
                        amount: i64::from(row.amount),
                    })
                    .collect(),
            };
            let tag_ids = match input.tags {
                Some(tags) => tags,
                None => self
                    .tag_repo
                    .find_for_recipes(&[recipe.id.clone()])
                    .await?
                    .into_iter()
                    .map(|(_, tag)| tag.id)
                    .collect(),
            };
            Some(self.build_parts(&recipe.id, &lines, &tag_ids).await?)
        } else {
            None
        };

        let mut active: recipe::ActiveModel = recipe.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(text) = input.text {
            active.text = Set(text);
        }
        if let Some(cooking_time) = input.cooking_time {
            active.cooking_time = Set(cooking_time);
        }
        if let Some(image) = input.image {
            active.image = Set(Some(image));
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        let updated = self.recipe_repo.update(active, parts).await?;
        info!(recipe_id = %updated.id, "Recipe updated");
        Ok(updated)
    }

    /// Delete a recipe and the favorites and cart entries pointing at it.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if self.recipe_repo.delete(id).await? == 0 {
            return Err(AppError::RecipeNotFound(id.to_string()));
        }
        info!(recipe_id = %id, "Recipe deleted");
        Ok(())
    }

    /// List recipes newest first, with the total count for pagination.
    ///
    /// Favorite and cart filters need a viewer; an anonymous viewer asking
    /// for them gets an empty page.
    pub async fn list(
        &self,
        viewer: Option<&str>,
        query: RecipeQuery,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<recipe::Model>, u64)> {
        if viewer.is_none() && (query.is_favorited || query.is_in_shopping_cart) {
            return Ok((vec![], 0));
        }

        let filter = RecipeFilter {
            author_id: query.author_id,
            tag_slugs: query.tag_slugs,
            favorited_by: viewer.filter(|_| query.is_favorited).map(str::to_string),
            in_cart_of: viewer
                .filter(|_| query.is_in_shopping_cart)
                .map(str::to_string),
        };

        let count = self.recipe_repo.count(&filter).await?;
        let recipes = self.recipe_repo.list(&filter, limit, offset).await?;
        Ok((recipes, count))
    }

    /// Recipes of each author, newest first, at most `limit` per author.
    pub async fn by_authors(
        &self,
        author_ids: &[String],
        limit: Option<u64>,
    ) -> AppResult<HashMap<String, Vec<recipe::Model>>> {
        self.recipe_repo.find_by_authors(author_ids, limit).await
    }

    /// Recipe count of each author. Authors without recipes are absent.
    pub async fn count_by_authors(&self, author_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        self.recipe_repo.count_by_authors(author_ids).await
    }

    /// Attach authors, tags, ingredients and `viewer`'s flags to recipes.
    pub async fn details(
        &self,
        viewer: Option<&str>,
        recipes: Vec<recipe::Model>,
    ) -> AppResult<Vec<RecipeDetail>> {
        if recipes.is_empty() {
            return Ok(vec![]);
        }

        let recipe_ids: Vec<String> = recipes.iter().map(|r| r.id.clone()).collect();
        let mut author_ids: Vec<String> = recipes.iter().map(|r| r.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let mut tags: HashMap<String, Vec<tag::Model>> = HashMap::new();
        for (recipe_id, tag) in self.tag_repo.find_for_recipes(&recipe_ids).await? {
            tags.entry(recipe_id).or_default().push(tag);
        }

        let mut ingredients: HashMap<String, Vec<RecipeIngredientRow>> = HashMap::new();
        for row in self.recipe_repo.find_ingredients_for(&recipe_ids).await? {
            ingredients.entry(row.recipe_id.clone()).or_default().push(row);
        }

        let (favorited, in_cart, subscribed) = match viewer {
            Some(viewer) => (
                self.relation_repo
                    .objects_among(RelationKind::Favorite, viewer, &recipe_ids)
                    .await?,
                self.relation_repo
                    .objects_among(RelationKind::Cart, viewer, &recipe_ids)
                    .await?,
                self.relation_repo
                    .objects_among(RelationKind::Follow, viewer, &author_ids)
                    .await?,
            ),
            None => (HashSet::new(), HashSet::new(), HashSet::new()),
        };

        recipes
            .into_iter()
            .map(|recipe| {
                let author = authors
                    .get(&recipe.author_id)
                    .cloned()
                    .ok_or_else(|| AppError::UserNotFound(recipe.author_id.clone()))?;
                Ok(RecipeDetail {
                    author_is_subscribed: subscribed.contains(&author.id),
                    author,
                    tags: tags.remove(&recipe.id).unwrap_or_default(),
                    ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                    is_favorited: favorited.contains(&recipe.id),
                    is_in_shopping_cart: in_cart.contains(&recipe.id),
                    recipe,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use foodgram_db::entities::ingredient;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::{collections::BTreeMap, sync::Arc};

    struct Mocks {
        recipe: MockDatabase,
        ingredient: MockDatabase,
        tag: MockDatabase,
        user: MockDatabase,
        relation: MockDatabase,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                recipe: MockDatabase::new(DatabaseBackend::Postgres),
                ingredient: MockDatabase::new(DatabaseBackend::Postgres),
                tag: MockDatabase::new(DatabaseBackend::Postgres),
                user: MockDatabase::new(DatabaseBackend::Postgres),
                relation: MockDatabase::new(DatabaseBackend::Postgres),
            }
        }

        fn service(self) -> RecipeService {
            RecipeService::new(
                RecipeRepository::new(Arc::new(self.recipe.into_connection())),
                IngredientRepository::new(Arc::new(self.ingredient.into_connection())),
                TagRepository::new(Arc::new(self.tag.into_connection())),
                UserRepository::new(Arc::new(self.user.into_connection())),
                RelationRepository::new(Arc::new(self.relation.into_connection())),
            )
        }
    }

    fn line(id: &str, amount: i64) -> IngredientAmountInput {
        IngredientAmountInput {
            id: id.to_string(),
            amount,
        }
    }

    fn create_input(lines: Vec<IngredientAmountInput>) -> CreateRecipeInput {
        CreateRecipeInput {
            ingredients: lines,
            tags: vec![],
            image: None,
            name: "Блины".to_string(),
            text: "Смешать и пожарить".to_string(),
            cooking_time: 30,
        }
    }

    fn create_test_recipe(id: &str, author_id: &str) -> recipe::Model {
        recipe::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            name: "Блины".to_string(),
            image: None,
            text: "Смешать и пожарить".to_string(),
            cooking_time: 30,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            username: id.to_string(),
            username_lower: id.to_lowercase(),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            password_hash: "hash".to_string(),
            token: None,
            role: user::UserRole::User,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_ingredient(id: &str) -> ingredient::Model {
        ingredient::Model {
            id: id.to_string(),
            name: "мука".to_string(),
            measurement_unit: "г".to_string(),
        }
    }

    #[test]
    fn test_check_ingredient_lines() {
        assert!(check_ingredient_lines(&[line("i1", 1), line("i2", 500)]).is_ok());
        assert!(matches!(
            check_ingredient_lines(&[]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            check_ingredient_lines(&[line("i1", 0)]),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            check_ingredient_lines(&[line("i1", -5)]),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            check_ingredient_lines(&[line("i1", 1), line("i1", 2)]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            check_ingredient_lines(&[line("i1", i64::from(i32::MAX) + 1)]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_check_tag_ids() {
        assert!(check_tag_ids(&["t1".to_string(), "t2".to_string()]).is_ok());
        assert!(check_tag_ids(&["t1".to_string(), "t1".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_create_rejects_zero_amount() {
        let svc = Mocks::new().service();

        let result = svc.create("author1", create_input(vec![line("i1", 0)])).await;

        assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_ingredient() {
        let mut mocks = Mocks::new();
        mocks.ingredient = mocks
            .ingredient
            .append_query_results([[create_test_ingredient("i1")]]);
        let svc = mocks.service();

        let result = svc
            .create("author1", create_input(vec![line("i1", 100), line("i2", 5)]))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create() {
        let mut mocks = Mocks::new();
        mocks.ingredient = mocks
            .ingredient
            .append_query_results([[create_test_ingredient("i1")]]);
        mocks.recipe = mocks
            .recipe
            .append_query_results([[create_test_recipe("r1", "author1")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }]);
        let svc = mocks.service();

        let created = svc
            .create("author1", create_input(vec![line("i1", 200)]))
            .await
            .unwrap();

        assert_eq!(created.author_id, "author1");
    }

    #[tokio::test]
    async fn test_list_anonymous_favorites_is_empty() {
        let svc = Mocks::new().service();

        let (recipes, count) = svc
            .list(
                None,
                RecipeQuery {
                    is_favorited: true,
                    ..Default::default()
                },
                6,
                0,
            )
            .await
            .unwrap();

        assert!(recipes.is_empty());
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_details_anonymous() {
        let mut mocks = Mocks::new();
        mocks.user = mocks
            .user
            .append_query_results([[create_test_user("author1")]]);
        mocks.tag = mocks
            .tag
            .append_query_results([Vec::<BTreeMap<&'static str, Value>>::new()]);
        mocks.recipe = mocks
            .recipe
            .append_query_results([Vec::<BTreeMap<&'static str, Value>>::new()]);
        let svc = mocks.service();

        let details = svc
            .details(None, vec![create_test_recipe("r1", "author1")])
            .await
            .unwrap();

        assert_eq!(details.len(), 1);
        assert_eq!(details[0].author.id, "author1");
        assert!(!details[0].is_favorited);
        assert!(!details[0].is_in_shopping_cart);
        assert!(!details[0].author_is_subscribed);
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let mut mocks = Mocks::new();
        mocks.recipe = mocks.recipe.append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
        ]);
        let svc = mocks.service();

        let result = svc.delete("missing").await;

        assert!(matches!(result, Err(AppError::RecipeNotFound(_))));
    }
}
