//! Database entities.

#![allow(missing_docs)]

pub mod ingredient;
pub mod ingredient_amount;
pub mod recipe;
pub mod recipe_tag;
pub mod relation;
pub mod tag;
pub mod user;

pub use ingredient::Entity as Ingredient;
pub use ingredient_amount::Entity as IngredientAmount;
pub use recipe::Entity as Recipe;
pub use recipe_tag::Entity as RecipeTag;
pub use relation::Entity as UserRelation;
pub use tag::Entity as Tag;
pub use user::Entity as User;
