//! Business logic services.

#![allow(missing_docs)]

mod font;
pub mod ingredient;
pub mod recipe;
pub mod relation;
pub mod render;
pub mod shopping_list;
pub mod tag;
pub mod user;

pub use ingredient::{ImportReport, IngredientInput, IngredientService, UpdateIngredientInput};
pub use recipe::{
    CreateRecipeInput, IngredientAmountInput, RecipeDetail, RecipeQuery, RecipeService,
    UpdateRecipeInput,
};
pub use relation::RelationService;
pub use render::{
    PdfRenderer, RenderedDocument, ShoppingListRenderer, TextRenderer, capitalize, renderer_for,
};
pub use shopping_list::{ShoppingListItem, ShoppingListService, aggregate};
pub use tag::{CreateTagInput, TagService, UpdateTagInput};
pub use user::{CreateUserInput, SetPasswordInput, UserService};
