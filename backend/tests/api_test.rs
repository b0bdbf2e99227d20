//! Router behavior that is decided before any query runs: routing,
//! authentication, and request parsing. These run without a database.

mod helpers;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::Utc;
use final10_backend::auth::Claims;
use final10_backend::http::router;
use final10_backend::models::{Role, User};
use final10_backend::AppConfig;
use helpers::offline_state;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

fn user_with_role(role: Role) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        username: "api_tester".to_string(),
        email: "api_tester@example.com".to_string(),
        password_hash: String::new(),
        display_name: None,
        avatar_url: None,
        bio: None,
        role: role.as_str().to_string(),
        points: 0,
        level: 1,
        last_daily_bonus_at: None,
        created_at: now,
        updated_at: now,
    }
}

async fn call(request: Request<Body>) -> (StatusCode, Value) {
    let response = router(offline_state()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = call(get("/api/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "final10-backend");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (status, body) = call(get("/api/does-not-exist", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Route not found");
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let (status, body) = call(get("/api/auth/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let request = Request::builder()
        .uri("/api/points/me")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Expected Bearer token");

    let (status, body) = call(get("/api/points/history", Some("not.a.jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: Uuid::new_v4(),
        username: "late".to_string(),
        role: "user".to_string(),
        iat: now - 7200,
        exp: now - 3600,
    };
    let secret = AppConfig::default().auth.jwt_secret;
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap();

    let (status, body) = call(get("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token expired");
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let keys = final10_backend::auth::JwtKeys::new("some-other-secret", 1);
    let token = keys.issue(&user_with_role(Role::User)).unwrap();

    let (status, _) = call(get("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"username\": \"x\""))
        .unwrap();

    let (status, body) = call(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_missing_field_is_bad_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"identifier": "someone"}"#))
        .unwrap();

    let (status, body) = call(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("password"));
}

#[tokio::test]
async fn test_admin_routes_forbidden_for_users() {
    let state = offline_state();
    let token = state.keys.issue(&user_with_role(Role::User)).unwrap();

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/commissions/{}/pay", Uuid::new_v4()))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");

    let (status, _) = call(get(&format!("/api/fraud/users/{}", Uuid::new_v4()), Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bad_path_parameter_is_bad_request() {
    let state = offline_state();
    let token = state.keys.issue(&user_with_role(Role::Admin)).unwrap();

    let (status, body) = call(get("/api/fraud/users/not-a-uuid", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_bad_query_parameter_is_bad_request() {
    let (status, _) = call(get("/api/auctions?sort=cheapest", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(get("/api/feed?page=first", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_page_past_limit_is_bad_request() {
    for uri in [
        "/api/feed?page=9223372036854775807",
        "/api/auctions?page=9223372036854775807",
    ] {
        let (status, body) = call(get(uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].as_str().unwrap().contains("page"));
    }
}

#[tokio::test]
async fn test_amounts_past_column_range_are_bad_requests() {
    let state = offline_state();
    let token = state.keys.issue(&user_with_role(Role::User)).unwrap();

    let (status, _) = call(post_json(
        "/api/promo-codes/validate",
        &token,
        serde_json::json!({ "code": "SPRING10", "order_amount": "79228162514264337593543950335" }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(post_json(
        "/api/promo-codes/redeem",
        &token,
        serde_json::json!({ "code": "SPRING10", "order_amount": "10000000000000" }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(post_json(
        "/api/auctions",
        &token,
        serde_json::json!({ "title": "Polaroid SX-70", "starting_price": "10000000000000" }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Price"));
}

#[tokio::test]
async fn test_cors_preflight() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/auctions")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = router(offline_state()).oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
