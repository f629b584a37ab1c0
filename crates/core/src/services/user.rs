//! User service: sign-up, token login, password changes.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use foodgram_common::{AppError, AppResult, IdGenerator};
use foodgram_db::{
    entities::user::{self, UserRole},
    repositories::UserRepository,
};
use rand::rngs::OsRng;
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for signing up.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(email, length(max = 254))]
    pub email: String,

    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: String,

    #[validate(length(min = 1, max = 150))]
    pub first_name: String,

    #[validate(length(min = 1, max = 150))]
    pub last_name: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Input for changing the password.
#[derive(Debug, Deserialize, Validate)]
pub struct SetPasswordInput {
    pub current_password: String,

    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Letters, digits and `@ . + - _`; `me` is reserved for the current-user route.
fn validate_username(username: &str) -> Result<(), validator::ValidationError> {
    if username.eq_ignore_ascii_case("me") {
        return Err(validator::ValidationError::new("reserved_username"));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(validator::ValidationError::new("invalid_username"));
    }
    Ok(())
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Sign up a new user.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        let email = input.email.to_lowercase();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(email),
            username_lower: Set(input.username.to_lowercase()),
            username: Set(input.username),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            password_hash: Set(password_hash),
            token: Set(None),
            role: Set(UserRole::User),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        info!(user_id = %user.id, username = %user.username, "User signed up");
        Ok(user)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Get users by IDs.
    pub async fn get_many(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        self.user_repo.find_by_ids(ids).await
    }

    /// List users (paginated).
    pub async fn list(&self, limit: u64, offset: u64) -> AppResult<Vec<user::Model>> {
        self.user_repo.list(limit, offset).await
    }

    /// Count users.
    pub async fn count(&self) -> AppResult<u64> {
        self.user_repo.count().await
    }

    /// Resolve the user owning an auth token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Check credentials and issue a token.
    ///
    /// An existing token is reused so that several clients can stay signed in.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<String> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid email or password".to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::BadRequest(
                "Invalid email or password".to_string(),
            ));
        }

        if let Some(token) = user.token {
            return Ok(token);
        }

        let token = self.id_gen.generate_token();
        self.user_repo.set_token(&user.id, Some(token.clone())).await?;
        info!(user_id = %user.id, "Token issued");
        Ok(token)
    }

    /// Invalidate the user's token.
    pub async fn logout(&self, user_id: &str) -> AppResult<()> {
        self.user_repo.set_token(user_id, None).await?;
        info!(user_id = %user_id, "Token revoked");
        Ok(())
    }

    /// Change the password after checking the current one.
    pub async fn set_password(&self, user_id: &str, input: SetPasswordInput) -> AppResult<()> {
        input.validate()?;

        let user = self.user_repo.get_by_id(user_id).await?;
        if !verify_password(&input.current_password, &user.password_hash)? {
            return Err(AppError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }

        let password_hash = hash_password(&input.new_password)?;
        self.user_repo
            .set_password_hash(user_id, password_hash)
            .await?;
        info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: &str, password: &str, token: Option<&str>) -> user::Model {
        user::Model {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            username: id.to_string(),
            username_lower: id.to_lowercase(),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            password_hash: hash_password(password).unwrap(),
            token: token.map(str::to_string),
            role: UserRole::User,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn signup_input() -> CreateUserInput {
        CreateUserInput {
            email: "Ivan@Example.com".to_string(),
            username: "ivan".to_string(),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            password: "secret-password".to_string(),
        }
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("test_password_123", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("chef.ivan+1").is_ok());
        assert!(validate_username("Me").is_err());
        assert!(validate_username("bad name").is_err());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let svc = UserService::new(UserRepository::new(db));

        let mut input = signup_input();
        input.email = "not-an-email".to_string();

        assert!(matches!(
            svc.create(input).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_duplicate_email() {
        let existing = create_test_user("ivan", "secret-password", None);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );
        let svc = UserService::new(UserRepository::new(db));

        let result = svc.create(signup_input()).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create() {
        let created = create_test_user("ivan", "secret-password", None);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[created]])
                .into_connection(),
        );
        let svc = UserService::new(UserRepository::new(db));

        let user = svc.create(signup_input()).await.unwrap();

        assert_eq!(user.username, "ivan");
        assert_eq!(user.full_name(), "Ivan Petrov");
    }

    #[tokio::test]
    async fn test_login_reuses_token() {
        let user = create_test_user("ivan", "secret-password", Some("existing"));
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );
        let svc = UserService::new(UserRepository::new(db));

        let token = svc
            .login("ivan@example.com", "secret-password")
            .await
            .unwrap();

        assert_eq!(token, "existing");
    }

    #[tokio::test]
    async fn test_login_issues_token() {
        let user = create_test_user("ivan", "secret-password", None);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let svc = UserService::new(UserRepository::new(db));

        let token = svc
            .login("ivan@example.com", "secret-password")
            .await
            .unwrap();

        assert_eq!(token.len(), 40);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let user = create_test_user("ivan", "secret-password", None);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );
        let svc = UserService::new(UserRepository::new(db));

        let result = svc.login("ivan@example.com", "nope").await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_set_password_checks_current() {
        let user = create_test_user("ivan", "secret-password", None);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );
        let svc = UserService::new(UserRepository::new(db));

        let result = svc
            .set_password(
                "ivan",
                SetPasswordInput {
                    current_password: "wrong-password".to_string(),
                    new_password: "another-password".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
