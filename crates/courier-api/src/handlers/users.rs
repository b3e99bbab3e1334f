//! User handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use courier_service::{CurrentUserResponse, UserResponse, UserService};
use serde::Deserialize;
use uuid::Uuid;

use crate::extractors::AuthUser;
use crate::response::ApiResult;
use crate::state::AppState;

/// Current user's profile (the client's auth check)
///
/// GET /api/profile
pub async fn profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<CurrentUserResponse>> {
    let service = UserService::new(state.service_context());
    let user = service.profile(auth.user_id).await?;
    Ok(Json(user))
}

/// Public profile of a user
///
/// GET /api/users/:user_id
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let service = UserService::new(state.service_context());
    let user = service.get(user_id).await?;
    Ok(Json(user))
}

/// Search query parameters
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Search users by username/email prefix
///
/// GET /api/users/search?q=
pub async fn search(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let service = UserService::new(state.service_context());
    let users = service.search(&query.q, auth.user_id).await?;
    Ok(Json(users))
}
