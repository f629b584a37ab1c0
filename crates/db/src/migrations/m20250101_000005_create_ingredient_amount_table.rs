//! Create ingredient_amount table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IngredientAmount::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IngredientAmount::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IngredientAmount::RecipeId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IngredientAmount::IngredientId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(IngredientAmount::Amount).integer().not_null())
                    .check(Expr::col(IngredientAmount::Amount).gte(1))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ingredient_amount_recipe")
                            .from(IngredientAmount::Table, IngredientAmount::RecipeId)
                            .to(Recipe::Table, Recipe::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ingredient_amount_ingredient")
                            .from(IngredientAmount::Table, IngredientAmount::IngredientId)
                            .to(Ingredient::Table, Ingredient::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (recipe_id, ingredient_id) - one row per ingredient in a recipe
        manager
            .create_index(
                Index::create()
                    .name("idx_ingredient_amount_recipe_ingredient")
                    .table(IngredientAmount::Table)
                    .col(IngredientAmount::RecipeId)
                    .col(IngredientAmount::IngredientId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IngredientAmount::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum IngredientAmount {
    Table,
    Id,
    RecipeId,
    IngredientId,
    Amount,
}

#[derive(Iden)]
enum Recipe {
    Table,
    Id,
}

#[derive(Iden)]
enum Ingredient {
    Table,
    Id,
}
