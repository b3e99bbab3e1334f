//! PostgreSQL implementation of UserRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use courier_core::entities::User;
use courier_core::traits::{RepoResult, UserRepository};

use crate::models::UserModel;

use super::error::{map_db_error, map_user_unique_violation};

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, avatar, \
     google_id, is_google_user, is_active, created_at, updated_at, last_login, refresh_tokens";

/// PostgreSQL implementation of UserRepository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND is_active"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self))]
    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn username_exists(&self, username: &str) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn create(&self, user: &User) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO users (id, username, email, password_hash, first_name, last_name, avatar,
                               google_id, is_google_user, is_active, created_at, updated_at,
                               last_login, refresh_tokens)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.avatar)
        .bind(&user.google_id)
        .bind(user.is_google_user)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login)
        .bind(&user.refresh_tokens)
        .execute(&self.pool)
        .await
        .map_err(map_user_unique_violation)?;

        Ok(())
    }

    #[instrument(skip(self, refresh_token_id))]
    async fn record_login(&self, id: Uuid, refresh_token_id: &str) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET last_login = NOW(),
                updated_at = NOW(),
                refresh_tokens = array_append(refresh_tokens, $2)
            WHERE id = $1 AND is_active
            ",
        )
        .bind(id)
        .bind(refresh_token_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(courier_core::DomainError::UserNotFound(id));
        }

        Ok(())
    }

    #[instrument(skip(self, old_id, new_id))]
    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        old_id: &str,
        new_id: &str,
    ) -> RepoResult<Option<User>> {
        // Membership check and swap in one statement: there is no window in
        // which the set holds neither id. rows_affected = 0 means the old id
        // was already rotated away or revoked.
        let result = sqlx::query_as::<_, UserModel>(&format!(
            r"
            UPDATE users
            SET refresh_tokens = array_append(array_remove(refresh_tokens, $2), $3),
                updated_at = NOW()
            WHERE id = $1 AND is_active AND $2 = ANY(refresh_tokens)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(old_id)
        .bind(new_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self, refresh_token_id))]
    async fn remove_refresh_token(&self, id: Uuid, refresh_token_id: &str) -> RepoResult<()> {
        sqlx::query(
            r"
            UPDATE users
            SET refresh_tokens = array_remove(refresh_tokens, $2),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(refresh_token_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn link_google_account(
        &self,
        id: Uuid,
        google_id: &str,
        avatar: Option<&str>,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET google_id = $2,
                is_google_user = TRUE,
                avatar = COALESCE($3, avatar),
                updated_at = NOW()
            WHERE id = $1 AND is_active
            ",
        )
        .bind(id)
        .bind(google_id)
        .bind(avatar)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(courier_core::DomainError::UserNotFound(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, exclude: Uuid, limit: i64) -> RepoResult<Vec<User>> {
        let pattern = format!("{}%", query.replace('%', "\\%").replace('_', "\\_"));

        let results = sqlx::query_as::<_, UserModel>(&format!(
            r"
            SELECT {USER_COLUMNS} FROM users
            WHERE (username ILIKE $1 OR email ILIKE $1) AND id <> $2 AND is_active
            ORDER BY username
            LIMIT $3
            "
        ))
        .bind(pattern)
        .bind(exclude)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(User::from).collect())
    }
}
