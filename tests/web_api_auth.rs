//! Web API Authentication Tests
//!
//! Integration tests for registration, tokens and account endpoints.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use common::{bearer, create_test_server, login, member, register_user, staff, PASSWORD};
use serde_json::{json, Value};

#[tokio::test]
async fn test_register_success() {
    let (server, _db) = create_test_server().await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": PASSWORD,
            "first_name": "Alice",
            "last_name": "Lima"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert_eq!(body["data"]["user"]["role"], "member");
    assert!(body["data"]["user"].get("password").is_none());
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let (server, _db) = create_test_server().await;
    register_user(&server, "alice").await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "other@example.com",
            "password": PASSWORD
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_validation_errors() {
    let (server, _db) = create_test_server().await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "bad name!",
            "email": "not-an-email",
            "password": "short"
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    let details = &body["error"]["details"];
    assert!(details.get("username").is_some());
    assert!(details.get("email").is_some());
    assert!(details.get("password").is_some());
}

#[tokio::test]
async fn test_register_invalid_json() {
    let (server, _db) = create_test_server().await;

    let response = server
        .post("/api/auth/register")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_obtain_token_success() {
    let (server, _db) = create_test_server().await;
    register_user(&server, "alice").await;

    let response = server
        .post("/api/auth/token")
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["data"]["access"].as_str().is_some());
    assert!(body["data"]["refresh"].as_str().is_some());
    assert_eq!(body["data"]["expires_in"], 900);
}

#[tokio::test]
async fn test_obtain_token_wrong_password() {
    let (server, _db) = create_test_server().await;
    register_user(&server, "alice").await;

    let response = server
        .post("/api/auth/token")
        .json(&json!({ "username": "alice", "password": "wrong-password" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_obtain_token_unknown_user() {
    let (server, _db) = create_test_server().await;

    let response = server
        .post("/api/auth/token")
        .json(&json!({ "username": "ghost", "password": PASSWORD }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_disabled_account_cannot_login() {
    let (server, db) = create_test_server().await;
    let (_, staff_token) = staff(&server, &db, "boss").await;
    let (alice_id, _) = member(&server, "alice").await;

    server
        .patch(&format!("/api/users/{alice_id}"))
        .add_header(AUTHORIZATION, bearer(&staff_token))
        .json(&json!({ "is_active": false }))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/auth/token")
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_refresh_token_rotation() {
    let (server, _db) = create_test_server().await;
    register_user(&server, "alice").await;

    let tokens: Value = server
        .post("/api/auth/token")
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .await
        .json();
    let refresh = tokens["data"]["refresh"].as_str().unwrap().to_string();

    let response = server
        .post("/api/auth/token/refresh")
        .json(&json!({ "refresh": refresh }))
        .await;
    response.assert_status_ok();
    let rotated: Value = response.json();
    assert_ne!(rotated["data"]["refresh"], tokens["data"]["refresh"]);

    // The old refresh token is spent
    let response = server
        .post("/api/auth/token/refresh")
        .json(&json!({ "refresh": refresh }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let (server, _db) = create_test_server().await;
    register_user(&server, "alice").await;

    let tokens: Value = server
        .post("/api/auth/token")
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .await
        .json();
    let access = tokens["data"]["access"].as_str().unwrap();
    let refresh = tokens["data"]["refresh"].as_str().unwrap();

    server
        .post("/api/auth/logout")
        .add_header(AUTHORIZATION, bearer(access))
        .json(&json!({ "refresh": refresh }))
        .await
        .assert_status_ok();

    server
        .post("/api/auth/token/refresh")
        .json(&json!({ "refresh": refresh }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_me() {
    let (server, _db) = create_test_server().await;
    let (id, token) = member(&server, "alice").await;

    let response = server
        .get("/api/auth/user")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["id"], id);
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert!(body["data"]["last_login"].is_string());
}

#[tokio::test]
async fn test_get_me_unauthorized() {
    let (server, _db) = create_test_server().await;

    server
        .get("/api/auth/user")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .get("/api/auth/user")
        .add_header(AUTHORIZATION, "Bearer not-a-jwt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_me() {
    let (server, _db) = create_test_server().await;
    let (_, token) = member(&server, "alice").await;

    let response = server
        .patch("/api/auth/user")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "first_name": "  Alicia ", "email": "alicia@example.com" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["first_name"], "Alicia");
    assert_eq!(body["data"]["last_name"], "User");
    assert_eq!(body["data"]["email"], "alicia@example.com");
}

#[tokio::test]
async fn test_change_password() {
    let (server, _db) = create_test_server().await;
    let (_, token) = member(&server, "alice").await;

    server
        .post("/api/auth/user/password")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "current_password": "wrong-password", "new_password": "new-password-99" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/auth/user/password")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "current_password": PASSWORD, "new_password": "new-password-99" }))
        .await
        .assert_status_ok();

    login(&server, "alice", "new-password-99").await;
    server
        .post("/api/auth/token")
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_users_list_requires_staff() {
    let (server, db) = create_test_server().await;
    let (_, member_token) = member(&server, "alice").await;
    let (_, staff_token) = staff(&server, &db, "boss").await;

    server
        .get("/api/users")
        .add_header(AUTHORIZATION, bearer(&member_token))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = server
        .get("/api/users")
        .add_query_param("per_page", 1)
        .add_header(AUTHORIZATION, bearer(&staff_token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["meta"]["total"], 2);
    assert_eq!(body["meta"]["per_page"], 1);
}

#[tokio::test]
async fn test_member_cannot_touch_other_accounts() {
    let (server, _db) = create_test_server().await;
    let (_, alice_token) = member(&server, "alice").await;
    let (bob_id, _) = member(&server, "bob").await;

    server
        .get(&format!("/api/users/{bob_id}"))
        .add_header(AUTHORIZATION, bearer(&alice_token))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .delete(&format!("/api/users/{bob_id}"))
        .add_header(AUTHORIZATION, bearer(&alice_token))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_member_cannot_promote_self() {
    let (server, _db) = create_test_server().await;
    let (alice_id, token) = member(&server, "alice").await;

    server
        .patch(&format!("/api/users/{alice_id}"))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "role": "staff" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = server
        .patch(&format!("/api/users/{alice_id}"))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "last_name": "Lima" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["role"], "member");
}

#[tokio::test]
async fn test_staff_deletes_user() {
    let (server, db) = create_test_server().await;
    let (_, staff_token) = staff(&server, &db, "boss").await;
    let (alice_id, _) = member(&server, "alice").await;

    server
        .delete(&format!("/api/users/{alice_id}"))
        .add_header(AUTHORIZATION, bearer(&staff_token))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .get(&format!("/api/users/{alice_id}"))
        .add_header(AUTHORIZATION, bearer(&staff_token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_headers_present() {
    let (server, _db) = create_test_server().await;

    let response = server
        .post("/api/auth/token")
        .json(&json!({ "username": "ghost", "password": PASSWORD }))
        .await;

    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert_eq!(response.header("x-frame-options"), "DENY");
}
