//! Shared helpers for the web API integration tests.

#![allow(dead_code)]

use axum_test::TestServer;
use serde_json::{json, Value};
use servdesk::config::WebConfig;
use servdesk::db::{NewUser, Role, UserRepository};
use servdesk::mail::Mailer;
use servdesk::web::handlers::AppState;
use servdesk::web::middleware::{JwtState, RateLimitState};
use servdesk::web::router::create_router;
use servdesk::{hash_password, Database};
use std::sync::Arc;

pub const PASSWORD: &str = "correct-horse-42";

/// Create a test configuration.
pub fn create_test_config() -> WebConfig {
    WebConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: "test-secret-key-for-testing-only".to_string(),
        login_rate_limit: 1000,
        api_rate_limit: 10000,
        ..WebConfig::default()
    }
}

/// Create a test server with an in-memory database and no mailer.
pub async fn create_test_server() -> (TestServer, Arc<Database>) {
    build_server(None).await
}

/// Create a test server whose mail endpoint delivers through `mailer`.
pub async fn create_test_server_with_mailer(
    mailer: Arc<dyn Mailer>,
) -> (TestServer, Arc<Database>) {
    build_server(Some(mailer)).await
}

async fn build_server(mailer: Option<Arc<dyn Mailer>>) -> (TestServer, Arc<Database>) {
    let config = create_test_config();

    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let shared_db = Arc::new(db);

    let mut app_state = AppState::new(shared_db.clone(), &config);
    if let Some(mailer) = mailer {
        app_state = app_state.with_mailer(mailer, "desk@example.com");
    }

    let jwt_state = Arc::new(JwtState::new(&config.jwt_secret));
    let rate_limit = Arc::new(RateLimitState::new(
        config.login_rate_limit,
        config.api_rate_limit,
    ));

    let router = create_router(
        Arc::new(app_state),
        jwt_state,
        rate_limit,
        &config.cors_origins,
    );
    let server = TestServer::new(router).expect("Failed to create test server");

    (server, shared_db)
}

/// Register a member through the API and return the response body.
pub async fn register_user(server: &TestServer, username: &str) -> Value {
    server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": PASSWORD,
            "first_name": "Test",
            "last_name": "User"
        }))
        .await
        .json::<Value>()
}

/// Obtain an access token.
pub async fn login(server: &TestServer, username: &str, password: &str) -> String {
    let response = server
        .post("/api/auth/token")
        .json(&json!({ "username": username, "password": password }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"]["access"]
        .as_str()
        .expect("access token")
        .to_string()
}

/// Register a member and return `(user_id, access_token)`.
pub async fn member(server: &TestServer, username: &str) -> (i64, String) {
    let body = register_user(server, username).await;
    let id = body["data"]["user"]["id"].as_i64().expect("user id");
    (id, login(server, username, PASSWORD).await)
}

/// Insert a staff account directly and return `(user_id, access_token)`.
pub async fn staff(server: &TestServer, db: &Database, username: &str) -> (i64, String) {
    let hash = hash_password(PASSWORD).expect("hash");
    let user = UserRepository::new(db.pool())
        .create(
            &NewUser::new(username, hash, format!("{username}@example.com"))
                .with_role(Role::Staff),
        )
        .await
        .expect("create staff");
    (user.id, login(server, username, PASSWORD).await)
}

/// `Authorization` header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// A valid service-order body with the given protocol.
pub fn order_body(protocol: &str) -> Value {
    json!({
        "protocol": protocol,
        "so_number": format!("SO-{protocol}"),
        "type": "repair",
        "provider": "technical",
        "priority": "high",
        "recipient_name": "Maria Souza",
        "cpf": "123.456.789-09",
        "description": "Router keeps rebooting"
    })
}
