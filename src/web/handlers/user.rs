//! User account handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{UserRepository, UserUpdate};
use crate::web::dto::{
    ApiResponse, PaginatedResponse, PaginationQuery, UpdateUserRequest, UserResponse,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/users - List all users (staff only).
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Page of users", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff access required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    user.actor().require_staff()?;

    let pagination = pagination.normalized();
    let (offset, limit) = pagination.to_offset_limit();
    let repo = UserRepository::new(state.db.pool());
    let users = repo.list(offset, limit).await?;
    let total = repo.count().await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
        pagination.page,
        pagination.per_page,
        total as u64,
    )))
}

/// GET /api/users/:id - Get a user (staff or the user themself).
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    user.actor().can_access(user_id)?;

    let found = UserRepository::new(state.db.pool())
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::new(found.into())))
}

/// PATCH /api/users/:id - Update a user.
///
/// Only staff may change `role` or `is_active`.
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let actor = user.actor();
    actor.can_access(user_id)?;
    if req.role.is_some() || req.is_active.is_some() {
        actor.can_change_privileges()?;
    }

    let mut update = UserUpdate::new();
    if let Some(first_name) = req.first_name {
        update = update.first_name(first_name.trim());
    }
    if let Some(last_name) = req.last_name {
        update = update.last_name(last_name.trim());
    }
    if let Some(email) = req.email {
        update = update.email(email.trim());
    }
    if let Some(role) = req.role {
        update = update.role(role);
    }
    if let Some(is_active) = req.is_active {
        update = update.is_active(is_active);
    }

    let updated = UserRepository::new(state.db.pool())
        .update(user_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!(user_id, by = actor.id, "User updated");
    Ok(Json(ApiResponse::new(updated.into())))
}

/// DELETE /api/users/:id - Delete a user and, with it, their service orders.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let actor = user.actor();
    actor.can_access(user_id)?;

    let deleted = UserRepository::new(state.db.pool())
        .delete(user_id)
        .await?;
    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id, by = actor.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
