//! User service
//!
//! Profile lookups and user search for starting conversations.

use tracing::instrument;
use uuid::Uuid;

use crate::dto::{CurrentUserResponse, UserResponse};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Maximum results returned by a user search
const SEARCH_LIMIT: i64 = 20;

/// User service
pub struct UserService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> UserService<'a> {
    /// Create a new UserService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Current user's own profile
    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> ServiceResult<CurrentUserResponse> {
        let user = self
            .ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id.to_string()))?;

        Ok(CurrentUserResponse::from(&user))
    }

    /// Public profile of any user
    #[instrument(skip(self))]
    pub async fn get(&self, user_id: Uuid) -> ServiceResult<UserResponse> {
        let user = self
            .ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id.to_string()))?;

        Ok(UserResponse::from(&user))
    }

    /// Prefix search on username/email, excluding the requesting user.
    /// An empty query returns no results.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, exclude: Uuid) -> ServiceResult<Vec<UserResponse>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let users = self.ctx.user_repo().search(query, exclude, SEARCH_LIMIT).await?;
        Ok(users.iter().map(UserResponse::from).collect())
    }
}
