//! Create user_relation table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserRelation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserRelation::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserRelation::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(UserRelation::SubjectId).string_len(32).not_null())
                    .col(ColumnDef::new(UserRelation::ObjectId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(UserRelation::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(
                        Expr::col(UserRelation::Kind)
                            .ne("follow")
                            .or(Expr::col(UserRelation::SubjectId)
                                .ne(Expr::col(UserRelation::ObjectId))),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_relation_subject")
                            .from(UserRelation::Table, UserRelation::SubjectId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (kind, subject_id, object_id) - at most one relation per pair
        manager
            .create_index(
                Index::create()
                    .name("idx_user_relation_kind_subject_object")
                    .table(UserRelation::Table)
                    .col(UserRelation::Kind)
                    .col(UserRelation::SubjectId)
                    .col(UserRelation::ObjectId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (kind, object_id) - cleanup when a recipe is deleted
        manager
            .create_index(
                Index::create()
                    .name("idx_user_relation_kind_object")
                    .table(UserRelation::Table)
                    .col(UserRelation::Kind)
                    .col(UserRelation::ObjectId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserRelation::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UserRelation {
    Table,
    Id,
    Kind,
    SubjectId,
    ObjectId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
