//! Toggle relations: favorite recipe, shopping cart recipe, follow author.
//!
//! All three kinds share one state machine. A relation either exists or it
//! does not; `add` on an existing relation and `remove` on a missing one are
//! errors, never silent no-ops.

use std::collections::HashSet;

use foodgram_common::{AppError, AppResult, IdGenerator};
use foodgram_db::{
    entities::relation::{self, RelationKind},
    repositories::{RecipeRepository, RelationRepository, UserRepository},
};
use tracing::info;

/// Relation service shared by favorites, the shopping cart and subscriptions.
#[derive(Clone)]
pub struct RelationService {
    relation_repo: RelationRepository,
    recipe_repo: RecipeRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl RelationService {
    /// Create a new relation service.
    #[must_use]
    pub const fn new(
        relation_repo: RelationRepository,
        recipe_repo: RecipeRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            relation_repo,
            recipe_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    async fn ensure_object_exists(&self, kind: RelationKind, object_id: &str) -> AppResult<()> {
        if kind.targets_recipe() {
            self.recipe_repo.get_by_id(object_id).await?;
        } else {
            self.user_repo.get_by_id(object_id).await?;
        }
        Ok(())
    }

    /// Create the relation `subject -[kind]-> object`.
    pub async fn add(
        &self,
        kind: RelationKind,
        subject_id: &str,
        object_id: &str,
    ) -> AppResult<relation::Model> {
        if kind == RelationKind::Follow && subject_id == object_id {
            return Err(AppError::SelfReference(
                "You cannot subscribe to yourself".to_string(),
            ));
        }

        self.ensure_object_exists(kind, object_id).await?;

        if self.relation_repo.exists(kind, subject_id, object_id).await? {
            return Err(AppError::AlreadyExists(format!(
                "{object_id} is already in {}",
                kind.label()
            )));
        }

        // The unique index still rejects a concurrent insert that slipped past the check
        let created = self
            .relation_repo
            .create(self.id_gen.generate(), kind, subject_id, object_id)
            .await?;

        info!(kind = ?kind, subject_id = %subject_id, object_id = %object_id, "Relation added");
        Ok(created)
    }

    /// Delete the relation `subject -[kind]-> object`.
    pub async fn remove(
        &self,
        kind: RelationKind,
        subject_id: &str,
        object_id: &str,
    ) -> AppResult<()> {
        let deleted = self.relation_repo.delete(kind, subject_id, object_id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!(
                "{object_id} is not in {}",
                kind.label()
            )));
        }

        info!(kind = ?kind, subject_id = %subject_id, object_id = %object_id, "Relation removed");
        Ok(())
    }

    /// Whether the relation exists.
    pub async fn exists(
        &self,
        kind: RelationKind,
        subject_id: &str,
        object_id: &str,
    ) -> AppResult<bool> {
        self.relation_repo.exists(kind, subject_id, object_id).await
    }

    /// The subset of `candidates` that `subject_id` is related to.
    pub async fn objects_of(
        &self,
        kind: RelationKind,
        subject_id: &str,
        candidates: &[String],
    ) -> AppResult<HashSet<String>> {
        self.relation_repo
            .objects_among(kind, subject_id, candidates)
            .await
    }

    /// Object IDs of `subject_id`'s relations, newest first (paginated).
    pub async fn list_objects(
        &self,
        kind: RelationKind,
        subject_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<String>> {
        self.relation_repo
            .list_objects(kind, subject_id, limit, offset)
            .await
    }

    /// Count `subject_id`'s relations of `kind`.
    pub async fn count_objects(&self, kind: RelationKind, subject_id: &str) -> AppResult<u64> {
        self.relation_repo.count_objects(kind, subject_id).await
    }
}
