//! Tag catalog service.

use foodgram_common::{AppError, AppResult, IdGenerator};
use foodgram_db::{entities::tag, repositories::TagRepository};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// Tag service for business logic.
#[derive(Clone)]
pub struct TagService {
    tag_repo: TagRepository,
    id_gen: IdGenerator,
}

/// Input for creating a tag.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(custom(function = "validate_color"))]
    pub color: String,

    #[validate(length(min = 1, max = 200), custom(function = "validate_slug"))]
    pub slug: String,
}

/// Input for updating a tag. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTagInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,

    #[validate(length(min = 1, max = 200), custom(function = "validate_slug"))]
    pub slug: Option<String>,
}

/// `#rrggbb`
fn validate_color(color: &str) -> Result<(), validator::ValidationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_color"))
    }
}

fn validate_slug(slug: &str) -> Result<(), validator::ValidationError> {
    if slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_slug"))
    }
}

impl TagService {
    /// Create a new tag service.
    #[must_use]
    pub const fn new(tag_repo: TagRepository) -> Self {
        Self {
            tag_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// List all tags.
    pub async fn list(&self) -> AppResult<Vec<tag::Model>> {
        self.tag_repo.list_all().await
    }

    /// Get a tag by ID.
    pub async fn get(&self, id: &str) -> AppResult<tag::Model> {
        self.tag_repo.get_by_id(id).await
    }

    /// Create a tag. Name, color and slug must each be unused.
    pub async fn create(&self, input: CreateTagInput) -> AppResult<tag::Model> {
        input.validate()?;

        let color = input.color.to_uppercase();
        if self
            .tag_repo
            .find_conflicting(&input.name, &color, &input.slug)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Tag name, color or slug already in use".to_string(),
            ));
        }

        let model = tag::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name),
            color: Set(color),
            slug: Set(input.slug),
        };

        let tag = self.tag_repo.create(model).await?;
        info!(tag_id = %tag.id, slug = %tag.slug, "Tag created");
        Ok(tag)
    }

    /// Update a tag.
    pub async fn update(&self, id: &str, input: UpdateTagInput) -> AppResult<tag::Model> {
        input.validate()?;

        let tag = self.tag_repo.get_by_id(id).await?;
        let name = input.name.unwrap_or_else(|| tag.name.clone());
        let color = input
            .color
            .map_or_else(|| tag.color.clone(), |c| c.to_uppercase());
        let slug = input.slug.unwrap_or_else(|| tag.slug.clone());

        if let Some(other) = self.tag_repo.find_conflicting(&name, &color, &slug).await? {
            if other.id != tag.id {
                return Err(AppError::Conflict(
                    "Tag name, color or slug already in use".to_string(),
                ));
            }
        }

        let mut active: tag::ActiveModel = tag.into();
        active.name = Set(name);
        active.color = Set(color);
        active.slug = Set(slug);

        self.tag_repo.update(active).await
    }

    /// Delete a tag.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if self.tag_repo.delete(id).await? == 0 {
            return Err(AppError::NotFound(format!("Tag {id}")));
        }
        info!(tag_id = %id, "Tag deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_tag(id: &str, slug: &str) -> tag::Model {
        tag::Model {
            id: id.to_string(),
            name: slug.to_string(),
            color: "#49B64E".to_string(),
            slug: slug.to_string(),
        }
    }

    #[test]
    fn test_validate_color() {
        assert!(validate_color("#49b64e").is_ok());
        assert!(validate_color("49b64e").is_err());
        assert!(validate_color("#49b64").is_err());
        assert!(validate_color("#zzzzzz").is_err());
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_tag("t1", "lunch")]])
                .into_connection(),
        );
        let svc = TagService::new(TagRepository::new(db));

        let result = svc
            .create(CreateTagInput {
                name: "Lunch".to_string(),
                color: "#49b64e".to_string(),
                slug: "lunch".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<tag::Model>::new()])
                .append_query_results([[create_test_tag("t1", "lunch")]])
                .into_connection(),
        );
        let svc = TagService::new(TagRepository::new(db));

        let tag = svc
            .create(CreateTagInput {
                name: "lunch".to_string(),
                color: "#49b64e".to_string(),
                slug: "lunch".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(tag.slug, "lunch");
    }

    #[tokio::test]
    async fn test_create_invalid_color() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let svc = TagService::new(TagRepository::new(db));

        let result = svc
            .create(CreateTagInput {
                name: "lunch".to_string(),
                color: "green".to_string(),
                slug: "lunch".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
