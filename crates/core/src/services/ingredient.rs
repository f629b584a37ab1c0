//! Ingredient catalog service.

use std::collections::HashSet;

use foodgram_common::{AppError, AppResult, IdGenerator};
use foodgram_db::{entities::ingredient, repositories::IngredientRepository};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// Ingredient service for business logic.
#[derive(Clone)]
pub struct IngredientService {
    ingredient_repo: IngredientRepository,
    id_gen: IdGenerator,
}

/// Input for creating an ingredient; also the record format of catalog files.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IngredientInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(min = 1, max = 200))]
    pub measurement_unit: String,
}

/// Input for updating an ingredient.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateIngredientInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub measurement_unit: Option<String>,
}

/// Outcome of a catalog import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub created: usize,
    pub skipped: usize,
}

impl IngredientService {
    /// Create a new ingredient service.
    #[must_use]
    pub const fn new(ingredient_repo: IngredientRepository) -> Self {
        Self {
            ingredient_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Search by case-insensitive name prefix.
    pub async fn search(&self, name: Option<&str>) -> AppResult<Vec<ingredient::Model>> {
        self.ingredient_repo.search(name).await
    }

    /// Get an ingredient by ID.
    pub async fn get(&self, id: &str) -> AppResult<ingredient::Model> {
        self.ingredient_repo.get_by_id(id).await
    }

    /// Create an ingredient.
    pub async fn create(&self, input: IngredientInput) -> AppResult<ingredient::Model> {
        input.validate()?;

        let model = ingredient::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name),
            measurement_unit: Set(input.measurement_unit),
        };

        let created = self.ingredient_repo.create(model).await?;
        info!(ingredient_id = %created.id, name = %created.name, "Ingredient created");
        Ok(created)
    }

    /// Update an ingredient.
    pub async fn update(
        &self,
        id: &str,
        input: UpdateIngredientInput,
    ) -> AppResult<ingredient::Model> {
        input.validate()?;

        let ingredient = self.ingredient_repo.get_by_id(id).await?;
        let mut active: ingredient::ActiveModel = ingredient.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(unit) = input.measurement_unit {
            active.measurement_unit = Set(unit);
        }

        self.ingredient_repo.update(active).await
    }

    /// Delete an ingredient. Recipes lose the ingredient line with it.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if self.ingredient_repo.delete(id).await? == 0 {
            return Err(AppError::NotFound(format!("Ingredient {id}")));
        }
        info!(ingredient_id = %id, "Ingredient deleted");
        Ok(())
    }

    /// Load catalog records.
    ///
    /// With `replace`, the existing catalog is deleted first. Otherwise
    /// records whose (name, unit) already exists are skipped. Duplicates
    /// inside the input are collapsed.
    pub async fn import(
        &self,
        records: Vec<IngredientInput>,
        replace: bool,
    ) -> AppResult<ImportReport> {
        for record in &records {
            record.validate()?;
        }

        if replace {
            let removed = self.ingredient_repo.delete_all().await?;
            info!(removed, "Ingredient catalog cleared");
        }

        let mut report = ImportReport::default();
        let mut seen = HashSet::new();
        let mut models = Vec::new();

        for record in records {
            let key = (record.name.clone(), record.measurement_unit.clone());
            if !seen.insert(key) {
                report.skipped += 1;
                continue;
            }

            if !replace
                && self
                    .ingredient_repo
                    .find_by_name_and_unit(&record.name, &record.measurement_unit)
                    .await?
                    .is_some()
            {
                report.skipped += 1;
                continue;
            }

            models.push(ingredient::ActiveModel {
                id: Set(self.id_gen.generate()),
                name: Set(record.name),
                measurement_unit: Set(record.measurement_unit),
            });
        }

        report.created = models.len();
        self.ingredient_repo.create_many(models).await?;

        info!(created = report.created, skipped = report.skipped, "Ingredients imported");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn record(name: &str, unit: &str) -> IngredientInput {
        IngredientInput {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        }
    }

    #[tokio::test]
    async fn test_import_replace_collapses_duplicates() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 10,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 2,
                    },
                ])
                .into_connection(),
        );
        let svc = IngredientService::new(IngredientRepository::new(db));

        let report = svc
            .import(
                vec![record("мука", "г"), record("соль", "г"), record("мука", "г")],
                true,
            )
            .await
            .unwrap();

        assert_eq!(
            report,
            ImportReport {
                created: 2,
                skipped: 1
            }
        );
    }

    #[tokio::test]
    async fn test_import_skips_existing() {
        let existing = ingredient::Model {
            id: "i1".to_string(),
            name: "мука".to_string(),
            measurement_unit: "г".to_string(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .append_query_results([Vec::<ingredient::Model>::new()])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let svc = IngredientService::new(IngredientRepository::new(db));

        let report = svc
            .import(vec![record("мука", "г"), record("соль", "г")], false)
            .await
            .unwrap();

        assert_eq!(
            report,
            ImportReport {
                created: 1,
                skipped: 1
            }
        );
    }

    #[tokio::test]
    async fn test_import_rejects_blank_records() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let svc = IngredientService::new(IngredientRepository::new(db));

        let result = svc.import(vec![record("", "г")], true).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
