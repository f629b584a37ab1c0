//! User relation repository (favorites, shopping cart, subscriptions).

use std::{collections::HashSet, sync::Arc};

use crate::entities::{
    UserRelation,
    relation::{self, RelationKind},
};
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    sea_query::{Query, SelectStatement},
};

/// Map an insert failure, turning a unique-index hit into `AlreadyExists`.
fn map_insert_error(kind: RelationKind, object_id: &str, e: &DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::AlreadyExists(format!("{object_id} is already in {}", kind.label()))
        }
        _ => AppError::Database(e.to_string()),
    }
}

/// Relation repository for database operations.
#[derive(Clone)]
pub struct RelationRepository {
    db: Arc<DatabaseConnection>,
}

impl RelationRepository {
    /// Create a new relation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// `SELECT object_id` of every relation of `kind` held by `subject_id`.
    ///
    /// Used as an `IN (...)` subquery by recipe filters and the shopping list.
    #[must_use]
    pub fn object_ids_query(kind: RelationKind, subject_id: &str) -> SelectStatement {
        Query::select()
            .column(relation::Column::ObjectId)
            .from(UserRelation)
            .and_where(relation::Column::Kind.eq(kind))
            .and_where(relation::Column::SubjectId.eq(subject_id))
            .to_owned()
    }

    /// Find the relation row for a (kind, subject, object) triple.
    pub async fn find(
        &self,
        kind: RelationKind,
        subject_id: &str,
        object_id: &str,
    ) -> AppResult<Option<relation::Model>> {
        UserRelation::find()
            .filter(relation::Column::Kind.eq(kind))
            .filter(relation::Column::SubjectId.eq(subject_id))
            .filter(relation::Column::ObjectId.eq(object_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether the relation exists.
    pub async fn exists(
        &self,
        kind: RelationKind,
        subject_id: &str,
        object_id: &str,
    ) -> AppResult<bool> {
        Ok(self.find(kind, subject_id, object_id).await?.is_some())
    }

    /// Insert a relation row.
    ///
    /// A concurrent duplicate insert is rejected by the unique index and
    /// reported as `AlreadyExists`.
    pub async fn create(
        &self,
        id: String,
        kind: RelationKind,
        subject_id: &str,
        object_id: &str,
    ) -> AppResult<relation::Model> {
        let model = relation::ActiveModel {
            id: Set(id),
            kind: Set(kind),
            subject_id: Set(subject_id.to_string()),
            object_id: Set(object_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| map_insert_error(kind, object_id, &e))
    }

    /// Delete a relation in a single statement, returning rows affected.
    pub async fn delete(
        &self,
        kind: RelationKind,
        subject_id: &str,
        object_id: &str,
    ) -> AppResult<u64> {
        UserRelation::delete_many()
            .filter(relation::Column::Kind.eq(kind))
            .filter(relation::Column::SubjectId.eq(subject_id))
            .filter(relation::Column::ObjectId.eq(object_id))
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Subset of `candidates` that `subject_id` holds a relation of `kind` to.
    pub async fn objects_among(
        &self,
        kind: RelationKind,
        subject_id: &str,
        candidates: &[String],
    ) -> AppResult<HashSet<String>> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Vec<String> = UserRelation::find()
            .select_only()
            .column(relation::Column::ObjectId)
            .filter(relation::Column::Kind.eq(kind))
            .filter(relation::Column::SubjectId.eq(subject_id))
            .filter(relation::Column::ObjectId.is_in(candidates.to_vec()))
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ids.into_iter().collect())
    }

    /// Object IDs of `subject_id`'s relations of `kind`, newest first (paginated).
    pub async fn list_objects(
        &self,
        kind: RelationKind,
        subject_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<String>> {
        UserRelation::find()
            .select_only()
            .column(relation::Column::ObjectId)
            .filter(relation::Column::Kind.eq(kind))
            .filter(relation::Column::SubjectId.eq(subject_id))
            .order_by_desc(relation::Column::CreatedAt)
            .order_by_desc(relation::Column::Id)
            .offset(offset)
            .limit(limit)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count `subject_id`'s relations of `kind`.
    pub async fn count_objects(&self, kind: RelationKind, subject_id: &str) -> AppResult<u64> {
        UserRelation::find()
            .filter(relation::Column::Kind.eq(kind))
            .filter(relation::Column::SubjectId.eq(subject_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DbBackend, MockDatabase, MockExecResult, QueryTrait};

    fn create_test_relation(kind: RelationKind, subject: &str, object: &str) -> relation::Model {
        relation::Model {
            id: format!("rel_{subject}_{object}"),
            kind,
            subject_id: subject.to_string(),
            object_id: object.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_object_ids_query_sql() {
        let stmt = RelationRepository::object_ids_query(RelationKind::Cart, "user1");
        let sql = DbBackend::Postgres.build(&stmt).to_string();

        assert!(sql.contains(r#"FROM "user_relation""#));
        assert!(sql.contains(r#""kind" = 'cart'"#));
        assert!(sql.contains(r#""subject_id" = 'user1'"#));
    }

    #[test]
    fn test_object_filter_as_subquery() {
        let sql = crate::entities::Recipe::find()
            .filter(
                crate::entities::recipe::Column::Id.in_subquery(
                    RelationRepository::object_ids_query(RelationKind::Favorite, "user1"),
                ),
            )
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""recipe"."id" IN (SELECT "object_id" FROM "user_relation""#));
    }

    #[tokio::test]
    async fn test_create() {
        let rel = create_test_relation(RelationKind::Favorite, "user1", "recipe1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[rel.clone()]])
                .into_connection(),
        );

        let repo = RelationRepository::new(db);
        let result = repo
            .create(rel.id.clone(), RelationKind::Favorite, "user1", "recipe1")
            .await
            .unwrap();

        assert_eq!(result.kind, RelationKind::Favorite);
        assert_eq!(result.object_id, "recipe1");
    }

    #[tokio::test]
    async fn test_exists() {
        let rel = create_test_relation(RelationKind::Follow, "user1", "user2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[rel]])
                .append_query_results([Vec::<relation::Model>::new()])
                .into_connection(),
        );

        let repo = RelationRepository::new(db);
        assert!(repo.exists(RelationKind::Follow, "user1", "user2").await.unwrap());
        assert!(!repo.exists(RelationKind::Follow, "user2", "user1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_returns_rows_affected() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );

        let repo = RelationRepository::new(db);
        assert_eq!(
            repo.delete(RelationKind::Cart, "user1", "recipe1").await.unwrap(),
            1
        );
        assert_eq!(
            repo.delete(RelationKind::Cart, "user1", "recipe1").await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_objects_among() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "object_id" => sea_orm::Value::String(Some(Box::new("recipe2".to_string())))
                }]])
                .into_connection(),
        );

        let repo = RelationRepository::new(db);
        let candidates = vec!["recipe1".to_string(), "recipe2".to_string()];
        let result = repo
            .objects_among(RelationKind::Favorite, "user1", &candidates)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert!(result.contains("recipe2"));
    }

    #[tokio::test]
    async fn test_count_objects() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(3))
                }]])
                .into_connection(),
        );

        let repo = RelationRepository::new(db);
        let count = repo
            .count_objects(RelationKind::Follow, "user1")
            .await
            .unwrap();

        assert_eq!(count, 3);
    }
}
