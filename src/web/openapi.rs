//! OpenAPI document for the servdesk API.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto;
use super::handlers;
use crate::db::Role;
use crate::order;

#[derive(OpenApi)]
#[openapi(
    info(title = "servdesk API", description = "Service orders, accounts and outbound mail"),
    paths(
        handlers::auth::register,
        handlers::auth::obtain_token,
        handlers::auth::refresh_token,
        handlers::auth::logout,
        handlers::auth::get_me,
        handlers::auth::update_me,
        handlers::auth::change_password,
        handlers::user::list_users,
        handlers::user::get_user,
        handlers::user::update_user,
        handlers::user::delete_user,
        handlers::order::list_orders,
        handlers::order::create_order,
        handlers::order::get_order,
        handlers::order::update_order,
        handlers::order::delete_order,
        handlers::order::import_orders,
        handlers::mail::send_mail,
    ),
    components(schemas(
        Role,
        dto::LoginRequest,
        dto::RefreshRequest,
        dto::RegisterRequest,
        dto::UpdateProfileRequest,
        dto::UpdateUserRequest,
        dto::ChangePasswordRequest,
        dto::SendMailRequest,
        dto::PaginationMeta,
        dto::MessageResponse,
        dto::TokenResponse,
        dto::UserResponse,
        dto::RegisterResponse,
        dto::ServiceOrderResponse,
        dto::ImportResponse,
        dto::SendMailResponse,
        order::ServiceOrderInput,
        order::ServiceOrderPatch,
        order::OrderType,
        order::OrderStatus,
        order::ProviderType,
        order::OrderPriority,
        order::SlaStatus,
        order::RowError,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and tokens"),
        (name = "users", description = "Account management"),
        (name = "service-orders", description = "Service orders and CSV import"),
        (name = "mail", description = "Direct outbound mail")
    )
)]
pub struct ApiDoc;

/// Registers the bearer JWT scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
