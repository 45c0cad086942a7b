//! Router configuration for the web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    change_password, create_order, delete_order, delete_user, get_me, get_order, get_user,
    import_orders, list_orders, list_users, logout, obtain_token, refresh_token, register,
    send_mail, update_me, update_order, update_user, AppState,
};
use super::middleware::{
    api_rate_limit, create_cors_layer, jwt_auth, login_rate_limit, security_headers, JwtState,
    RateLimitState,
};
use super::openapi::ApiDoc;

/// Create the `/api` router with its middleware stack.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    rate_limit: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    // Token endpoints get the stricter login limit
    let login_limit = rate_limit.clone();
    let token_routes = Router::new()
        .route("/token", post(obtain_token))
        .route("/token/refresh", post(refresh_token))
        .layer(middleware::from_fn(move |req, next| {
            login_rate_limit(login_limit.clone(), req, next)
        }));

    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/user", get(get_me).patch(update_me))
        .route("/user/password", post(change_password))
        .merge(token_routes);

    let user_routes = Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user));

    let order_routes = Router::new()
        .route("/", get(list_orders).post(create_order))
        .route(
            "/import",
            post(import_orders).layer(DefaultBodyLimit::max(upload_limit(&app_state))),
        )
        .route(
            "/:id",
            get(get_order).patch(update_order).delete(delete_order),
        );

    let api_limit = rate_limit;
    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/service-orders", order_routes)
        .route("/mail/send", post(send_mail))
        .layer(middleware::from_fn(move |req, next| {
            api_rate_limit(api_limit.clone(), req, next)
        }));

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    jwt_auth(jwt_state.clone(), req, next)
                })),
        )
        .with_state(app_state)
}

/// Multipart framing needs headroom above the file size itself.
fn upload_limit(state: &AppState) -> usize {
    state.max_upload_size.saturating_add(64 * 1024)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Swagger UI at `/swagger-ui`, document at `/api-docs/openapi.json`.
pub fn create_swagger_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_router() {
        let response = create_health_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let response = create_swagger_router()
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
