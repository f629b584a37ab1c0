//! Database repositories.

mod ingredient;
mod recipe;
mod relation;
mod shopping_list;
mod tag;
mod user;

pub use ingredient::IngredientRepository;
pub use recipe::{RecipeFilter, RecipeIngredientRow, RecipeParts, RecipeRepository};
pub use relation::RelationRepository;
pub use shopping_list::{CartIngredientRow, ShoppingListRepository};
pub use tag::TagRepository;
pub use user::UserRepository;
