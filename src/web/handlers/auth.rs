//! Authentication handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::{hash_password, verify_password};
use crate::db::{NewRefreshToken, NewUser, RefreshTokenRepository, UserRepository, UserUpdate};
use crate::web::dto::{
    ApiResponse, ChangePasswordRequest, LoginRequest, MessageResponse, RefreshRequest,
    RegisterRequest, RegisterResponse, TokenResponse, UpdateProfileRequest, UserResponse,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";

/// POST /api/auth/register - Create a member account.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Malformed body"),
        (status = 409, description = "Username already taken"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisterResponse>>), ApiError> {
    let repo = UserRepository::new(state.db.pool());
    if repo.username_exists(&req.username).await? {
        return Err(ApiError::conflict("A user with that username already exists."));
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to create user")
    })?;

    let new_user = NewUser::new(&req.username, password_hash, req.email.trim())
        .with_name(req.first_name.trim(), req.last_name.trim());
    let user = repo.create(&new_user).await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    let response = RegisterResponse {
        message: format!("User '{}' created successfully.", user.username),
        user: user.into(),
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// POST /api/auth/token - Exchange credentials for a token pair.
#[utoipa::path(
    post,
    path = "/api/auth/token",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account disabled"),
        (status = 429, description = "Too many attempts")
    )
)]
pub async fn obtain_token(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let user = repo
        .get_by_username(req.username.trim())
        .await?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    verify_password(&req.password, &user.password).map_err(|_| {
        tracing::info!(username = %user.username, "Failed login attempt");
        ApiError::unauthorized(INVALID_CREDENTIALS)
    })?;

    if !user.is_active {
        return Err(ApiError::forbidden("Account is disabled"));
    }

    let tokens = state.issue_tokens(&user).await?;

    if let Err(e) = repo.update_last_login(user.id).await {
        tracing::warn!(user_id = user.id, error = %e, "Failed to record last login");
    }
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(ApiResponse::new(tokens)))
}

/// POST /api/auth/token/refresh - Rotate a refresh token.
#[utoipa::path(
    post,
    path = "/api/auth/token/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 401, description = "Refresh token unknown, revoked or expired")
    )
)]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    const INVALID: &str = "Invalid or expired refresh token";
    let tokens = RefreshTokenRepository::new(state.db.pool());

    let current = tokens
        .get_valid_token(&req.refresh)
        .await?
        .ok_or_else(|| ApiError::unauthorized(INVALID))?;

    let user = UserRepository::new(state.db.pool())
        .get_by_id(current.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized(INVALID))?;

    if !user.is_active {
        return Err(ApiError::forbidden("Account is disabled"));
    }

    let replacement = NewRefreshToken::issue(user.id, state.refresh_token_expiry);
    // Concurrent refreshes with the same token: only one rotation wins.
    tokens
        .rotate(&req.refresh, &replacement)
        .await?
        .ok_or_else(|| ApiError::unauthorized(INVALID))?;

    Ok(Json(ApiResponse::new(TokenResponse {
        access: state.generate_access_token(&user)?,
        refresh: replacement.token,
        expires_in: state.access_token_expiry,
    })))
}

/// POST /api/auth/logout - Revoke a refresh token.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    request_body = RefreshRequest,
    responses((status = 200, description = "Refresh token revoked", body = MessageResponse))
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let revoked = RefreshTokenRepository::new(state.db.pool())
        .revoke(&req.refresh)
        .await?;
    tracing::debug!(revoked, "Logout");

    Ok(Json(ApiResponse::new(MessageResponse::new("Logged out."))))
}

/// GET /api/auth/user - Current user's account.
#[utoipa::path(
    get,
    path = "/api/auth/user",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::new(user.into())))
}

/// PATCH /api/auth/user - Update own name or email.
#[utoipa::path(
    patch,
    path = "/api/auth/user",
    tag = "auth",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
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

    let user = UserRepository::new(state.db.pool())
        .update(claims.sub, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::new(user.into())))
}

/// POST /api/auth/user/password - Change own password.
///
/// All refresh tokens of the account are revoked.
#[utoipa::path(
    post,
    path = "/api/auth/user/password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password is incorrect"),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let user = repo
        .get_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    verify_password(&req.current_password, &user.password)
        .map_err(|_| ApiError::bad_request("Current password is incorrect"))?;

    let new_hash = hash_password(&req.new_password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to update password")
    })?;
    repo.update(user.id, &UserUpdate::new().password(new_hash))
        .await?;

    let revoked = RefreshTokenRepository::new(state.db.pool())
        .revoke_all_for_user(user.id)
        .await?;
    tracing::info!(user_id = user.id, revoked, "Password changed");

    Ok(Json(ApiResponse::new(MessageResponse::new(
        "Password updated successfully.",
    ))))
}
