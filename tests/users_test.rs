mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_register_login_and_me() {
    let Some(app) = common::spawn() else {
        return;
    };

    let email = format!("Agent-{}@Example.com", Uuid::new_v4().simple());
    let (status, user) = app
        .request(
            Method::POST,
            "/api/user/register",
            None,
            Some(json!({ "email": email, "fullname": "Ama Mensah", "password": "Secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], email.to_lowercase());
    assert!(user.get("password_hash").is_none());

    let (status, body) = app
        .request(
            Method::POST,
            "/api/user/register",
            None,
            Some(json!({ "email": email, "fullname": "Ama Again", "password": "Secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["email"][0], "A user with this email already exists.");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/user/login",
            None,
            Some(json!({ "email": email, "password": "wrong-Password1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, login) = app
        .request(
            Method::POST,
            "/api/user/login",
            None,
            Some(json!({ "email": email, "password": "Secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["access_token"].as_str().unwrap();

    let (status, me) = app.request(Method::GET, "/api/user/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user["id"]);
    assert_eq!(me["profile"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_weak_password_and_missing_token() {
    let Some(app) = common::spawn() else {
        return;
    };

    let (status, body) = app
        .request(
            Method::POST,
            "/api/user/register",
            None,
            Some(json!({ "email": "not-an-email", "fullname": "", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"].is_array());
    assert!(body["fullname"].is_array());
    assert!(body["password"].as_array().unwrap().len() >= 2);

    let (status, _) = app.request(Method::GET, "/api/user/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
