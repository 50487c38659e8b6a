use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use spark_matching::config::AppConfig;
use spark_matching::store::Database;
use spark_matching::{build_router, AppState};
use spark_shared::middleware::jwt_secret;
use spark_shared::types::auth::{Claims, UserRole};

fn app() -> Router {
    build_router(Arc::new(AppState::new(Database::in_memory(), AppConfig::default())))
}

fn bearer(user_id: Uuid) -> String {
    let claims = Claims::new(user_id, UserRole::User, 3600);
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret().unwrap().as_bytes())).unwrap();
    format!("Bearer {token}")
}

async fn call(app: &Router, method: &str, uri: &str, user: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("Authorization", bearer(user));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

async fn onboard(app: &Router, user: Uuid, name: &str) {
    let (status, body) = call(
        app,
        "POST",
        "/users/me/onboard",
        Some(user),
        Some(json!({ "name": name, "age": 29, "gender": "female", "interests": ["hiking"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let app = app();
    let (status, body) = call(&app, "GET", "/matches", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "E0004");
}

#[tokio::test]
async fn health_reports_store_status() {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "spark-matching");
    assert_eq!(body["checks"][0]["status"], "healthy");
}

#[tokio::test]
async fn onboarding_flow_and_profile_validation() {
    let app = app();
    let me = Uuid::now_v7();

    let (_, body) = call(&app, "GET", "/users/me", Some(me), None).await;
    assert_eq!(body["data"]["is_onboarded"], false);

    onboard(&app, me, "Ada").await;

    let (_, body) = call(&app, "GET", "/users/me", Some(me), None).await;
    assert_eq!(body["data"]["is_onboarded"], true);
    assert_eq!(body["data"]["profile"]["name"], "Ada");

    let (status, body) = call(&app, "PUT", "/users/me/profile", Some(me), Some(json!({ "age": 15 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E0002");
    assert_eq!(body["error"]["details"]["age"][0]["code"], "range");

    let (status, body) = call(
        &app,
        "PUT",
        "/users/me/profile",
        Some(me),
        Some(json!({ "bio": "hi", "location": { "latitude": 48.85, "longitude": 2.35 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Ada");
    assert_eq!(body["data"]["bio"], "hi");
    assert_eq!(body["data"]["location"]["latitude"], 48.85);

    let (status, body) = call(&app, "PUT", "/users/me/profile", Some(me), Some(json!({ "location": null }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["location"].is_null());
    assert_eq!(body["data"]["bio"], "hi");
}

#[tokio::test]
async fn swipe_match_message_unmatch_over_http() {
    let app = app();
    let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
    onboard(&app, a, "Ada").await;
    onboard(&app, b, "Grace").await;

    let (_, body) = call(&app, "GET", "/discovery?limit=5", Some(a), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = call(&app, "POST", "/swipes", Some(a), Some(json!({ "target_id": b, "is_like": true }))).await;
    assert_eq!(body["data"]["is_match"], false);
    let (_, body) = call(&app, "POST", "/swipes", Some(b), Some(json!({ "target_id": a, "is_like": true }))).await;
    assert_eq!(body["data"]["is_match"], true);

    let (_, body) = call(&app, "GET", "/matches", Some(a), None).await;
    let match_id = body["data"][0]["id"].as_str().unwrap().to_string();

    let uri = format!("/matches/{match_id}/messages");
    let (status, _) = call(&app, "POST", &uri, Some(a), Some(json!({ "text": "hi" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", &uri, Some(a), Some(json!({ "text": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E4001");

    let (status, body) = call(&app, "GET", &uri, Some(Uuid::now_v7()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "E3003");

    let (_, body) = call(&app, "GET", &format!("{uri}?limit=10"), Some(b), None).await;
    assert_eq!(body["data"][0]["text"], "hi");

    let (_, body) = call(&app, "POST", &format!("/matches/{match_id}/read"), Some(b), None).await;
    assert_eq!(body["data"]["updated"], 1);

    let (_, body) = call(&app, "DELETE", &format!("/matches/{match_id}"), Some(Uuid::now_v7()), None).await;
    assert_eq!(body["data"]["removed"], false);
    let (_, body) = call(&app, "DELETE", &format!("/matches/{match_id}"), Some(b), None).await;
    assert_eq!(body["data"]["removed"], true);

    let (_, body) = call(&app, "GET", "/matches", Some(a), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn block_and_report_endpoints() {
    let app = app();
    let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
    onboard(&app, a, "Ada").await;
    onboard(&app, b, "Grace").await;

    let (status, _) = call(&app, "POST", "/blocks", Some(a), Some(json!({ "blocked_id": b }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = call(&app, "POST", "/blocks", Some(a), Some(json!({ "blocked_id": b }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", "/blocks", Some(a), Some(json!({ "blocked_id": a }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E6001");

    let (_, body) = call(&app, "GET", "/discovery", Some(b), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = call(
        &app,
        "POST",
        "/reports",
        Some(b),
        Some(json!({ "reported_id": a, "reason": "fake profile" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["reason"], "fake profile");
}

#[tokio::test]
async fn unknown_match_is_not_found() {
    let app = app();
    let me = Uuid::now_v7();
    let uri = format!("/matches/{}/messages", Uuid::now_v7());
    let (status, body) = call(&app, "POST", &uri, Some(me), Some(json!({ "text": "hello" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "E3002");
}
