//! Request DTOs for Web API.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed, valid_username};
use crate::db::Role;

/// Login request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(custom(function = "not_empty_trimmed"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh or logout request carrying a refresh token.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh: String,
}

/// User registration request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(custom(function = "valid_username"))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters."
    ))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 150), custom(function = "no_control_chars"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150), custom(function = "no_control_chars"))]
    pub last_name: String,
}

/// Own-profile update; omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 150), custom(function = "no_control_chars"))]
    pub first_name: Option<String>,
    #[validate(length(max = 150), custom(function = "no_control_chars"))]
    pub last_name: Option<String>,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
}

/// Account update by staff or the account owner.
///
/// `role` and `is_active` are honoured for staff only.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(max = 150), custom(function = "no_control_chars"))]
    pub first_name: Option<String>,
    #[validate(length(max = 150), custom(function = "no_control_chars"))]
    pub last_name: Option<String>,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Password change request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters."
    ))]
    pub new_password: String,
}

/// Outbound mail request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendMailRequest {
    /// Sender address; the configured default when omitted.
    pub from: Option<String>,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    #[validate(length(max = 998), custom(function = "no_control_chars"))]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

/// Maximum page size.
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination query parameters.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    /// Page number, starting at 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (at most 100).
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationQuery {
    /// Clamp to valid bounds.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Convert to an SQL offset and limit.
    pub fn to_offset_limit(&self) -> (i64, i64) {
        let p = self.normalized();
        (
            (p.page as i64 - 1) * p.per_page as i64,
            p.per_page as i64,
        )
    }
}

/// Service-order listing query parameters.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub order_type: Option<String>,
    pub provider: Option<String>,
    pub priority: Option<String>,
    /// Case-insensitive substring over protocol, SO number, recipient and description.
    pub search: Option<String>,
    /// `created_at`, `updated_at`, `protocol`, `priority` or `status`; prefix `-` for descending.
    pub ordering: Option<String>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page.unwrap_or_else(default_page),
            per_page: self.per_page.unwrap_or_else(default_per_page),
        }
        .normalized()
    }
}
