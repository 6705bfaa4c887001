//! API Integration Tests
//!
//! Every test drives the full router over in-memory stores.
//!
//! Author: hephaex@gmail.com

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use chrono::Duration;
use marquee_api::auth::{TokenKind, TokenVerifier};
use marquee_api::testing::test_config;
use marquee_api::{create_router_for_testing, TestApp};
use marquee_core::{SessionPolicy, SessionState, SessionStore, User};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn bearer_request(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// App with user 7 (a@a.com / "secret", bcrypt) seeded
async fn seeded_app(policy: SessionPolicy) -> TestApp {
    let app = TestApp::with_policy(policy);
    app.users
        .insert(User {
            id: 7,
            email: "a@a.com".to_string(),
            username: "alice".to_string(),
            password_hash: bcrypt::hash("secret", 4).unwrap(),
            is_admin: false,
        })
        .await;
    app
}

async fn login(app: &TestApp, email: &str, password: &str) -> Response {
    app.router
        .clone()
        .oneshot(create_json_request(
            "POST",
            "/login",
            Some(json!({ "email": email, "password": password })),
        ))
        .await
        .unwrap()
}

async fn logout(app: &TestApp, refresh_token: &str) -> Response {
    app.router
        .clone()
        .oneshot(create_json_request(
            "POST",
            "/logout",
            Some(json!({ "refreshToken": refresh_token })),
        ))
        .await
        .unwrap()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_without_database() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ready"], true);
    assert!(json["checks"]["database"].is_null());
}

#[tokio::test]
async fn test_openapi_document() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/login"].is_object());
    assert!(json["paths"]["/logout"].is_object());
    assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
}

// =============================================================================
// Login Tests
// =============================================================================

#[tokio::test]
async fn test_login_success() {
    let app = seeded_app(SessionPolicy::default()).await;

    let response = login(&app, "a@a.com", "secret").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["message"].is_string());
    assert_eq!(json["session"]["userId"], 7);
    assert!(json["session"]["revokedAt"].is_null());

    let verifier = TokenVerifier::new(&test_config().auth).unwrap();
    let access = verifier
        .verify(json["accessToken"].as_str().unwrap(), TokenKind::Access)
        .unwrap();
    let refresh = verifier
        .verify(json["refreshToken"].as_str().unwrap(), TokenKind::Refresh)
        .unwrap();

    assert_eq!(access.user_id, 7);
    assert_eq!(refresh.user_id, 7);
    assert_eq!(access.exp - access.iat, 900);
    assert_eq!(refresh.exp - refresh.iat, 604_800);

    let stored = app.sessions.get(7).await.unwrap().unwrap();
    assert_eq!(json["session"]["id"], stored.id);
    assert!(stored.revoked_at.is_none());
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = seeded_app(SessionPolicy::default()).await;

    let response = login(&app, "a@a.com", "wrong").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["error"], "InvalidCredentials");
    assert!(app.sessions.is_empty().await);
}

#[tokio::test]
async fn test_login_unknown_email_matches_wrong_password() {
    let app = seeded_app(SessionPolicy::default()).await;

    let wrong_password = body_json(login(&app, "a@a.com", "wrong").await).await;

    let response = login(&app, "nobody@a.com", "secret").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let unknown_email = body_json(response).await;

    assert_eq!(unknown_email, wrong_password);
    assert!(app.sessions.is_empty().await);
}

#[tokio::test]
async fn test_login_missing_email() {
    let app = seeded_app(SessionPolicy::default()).await;

    let response = app
        .router
        .clone()
        .oneshot(create_json_request(
            "POST",
            "/login",
            Some(json!({ "password": "secret" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "ValidationError");
}

#[tokio::test]
async fn test_login_malformed_body() {
    let app = seeded_app(SessionPolicy::default()).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_each_login_opens_its_own_session() {
    let app = seeded_app(SessionPolicy::default()).await;

    let first = body_json(login(&app, "a@a.com", "secret").await).await;
    let second = body_json(login(&app, "a@a.com", "secret").await).await;

    assert_ne!(first["session"]["id"], second["session"]["id"]);
    assert_ne!(first["accessToken"], second["accessToken"]);
    assert_eq!(app.sessions.len().await, 2);
}

// =============================================================================
// Auth Middleware Tests
// =============================================================================

#[tokio::test]
async fn test_protected_route_with_login_token() {
    let app = seeded_app(SessionPolicy::default()).await;
    let tokens = body_json(login(&app, "a@a.com", "secret").await).await;
    let access = tokens["accessToken"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(bearer_request("/me", Some(&format!("Bearer {access}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["userId"], 7);
    assert_eq!(json["email"], "a@a.com");
    assert_eq!(json["sessionId"], tokens["session"]["id"]);
}

#[tokio::test]
async fn test_protected_route_without_header() {
    let app = seeded_app(SessionPolicy::default()).await;

    let response = app
        .router
        .clone()
        .oneshot(bearer_request("/me", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "MissingAuthorizationHeader");
}

#[tokio::test]
async fn test_protected_route_with_empty_bearer() {
    let app = seeded_app(SessionPolicy::default()).await;

    let response = app
        .router
        .clone()
        .oneshot(bearer_request("/me", Some("Bearer ")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "MissingToken");
}

#[tokio::test]
async fn test_protected_route_with_expired_token() {
    let app = seeded_app(SessionPolicy::default()).await;
    let expired = app
        .issuer()
        .issue_at(7, None, unix_now() - 960)
        .unwrap()
        .access_token;

    let response = app
        .router
        .clone()
        .oneshot(bearer_request("/me", Some(&format!("Bearer {expired}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Expired");
}

#[tokio::test]
async fn test_protected_route_with_garbage_token() {
    let app = seeded_app(SessionPolicy::default()).await;

    let response = app
        .router
        .clone()
        .oneshot(bearer_request("/me", Some("Bearer not.a.jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "InvalidSignature");
}

#[tokio::test]
async fn test_protected_route_rejects_refresh_token() {
    let app = seeded_app(SessionPolicy::default()).await;
    let refresh = app.issuer().issue(7).unwrap().refresh_token;

    let response = app
        .router
        .clone()
        .oneshot(bearer_request("/me", Some(&format!("Bearer {refresh}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_for_deleted_user() {
    let app = seeded_app(SessionPolicy::default()).await;
    let access = app.issuer().issue(7).unwrap().access_token;
    app.users.remove(7).await;

    let response = app
        .router
        .clone()
        .oneshot(bearer_request("/me", Some(&format!("Bearer {access}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "UserNotFound");
}

// =============================================================================
// Logout Tests
// =============================================================================

#[tokio::test]
async fn test_logout_revokes_session() {
    let app = seeded_app(SessionPolicy::default()).await;
    let tokens = body_json(login(&app, "a@a.com", "secret").await).await;

    let response = logout(&app, tokens["refreshToken"].as_str().unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["session"]["id"], tokens["session"]["id"]);
    assert!(json["session"]["revokedAt"].is_string());

    assert!(app.sessions.get(7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_logout_with_unbound_refresh_token() {
    let app = seeded_app(SessionPolicy::default()).await;
    app.sessions.create(7).await.unwrap();
    let refresh = app.issuer().issue(7).unwrap().refresh_token;

    let response = logout(&app, &refresh).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.sessions.get(7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_double_logout_stays_revoked() {
    let app = seeded_app(SessionPolicy::default()).await;
    let tokens = body_json(login(&app, "a@a.com", "secret").await).await;
    let refresh = tokens["refreshToken"].as_str().unwrap();

    assert_eq!(logout(&app, refresh).await.status(), StatusCode::OK);
    assert_eq!(logout(&app, refresh).await.status(), StatusCode::OK);

    let sessions = app.sessions.list(7).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(
        sessions[0].state(chrono::Utc::now()),
        SessionState::Revoked
    );
}

#[tokio::test]
async fn test_logout_with_invalid_token() {
    let app = seeded_app(SessionPolicy::default()).await;

    let response = logout(&app, "garbage").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "InvalidRefreshToken");
}

#[tokio::test]
async fn test_logout_without_refresh_token() {
    let app = seeded_app(SessionPolicy::default()).await;

    let response = app
        .router
        .clone()
        .oneshot(create_json_request("POST", "/logout", Some(json!({}))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "ValidationError");
}

#[tokio::test]
async fn test_logout_without_any_session() {
    let app = seeded_app(SessionPolicy::default()).await;
    let refresh = app.issuer().issue(7).unwrap().refresh_token;

    let response = logout(&app, &refresh).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "SessionNotFound");
}

#[tokio::test]
async fn test_logout_after_session_expired() {
    let app = seeded_app(SessionPolicy::new(Duration::zero())).await;
    let tokens = body_json(login(&app, "a@a.com", "secret").await).await;

    let response = logout(&app, tokens["refreshToken"].as_str().unwrap()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "SessionNotFound");
}

#[tokio::test]
async fn test_access_token_survives_logout_until_expiry() {
    let app = seeded_app(SessionPolicy::default()).await;
    let tokens = body_json(login(&app, "a@a.com", "secret").await).await;
    let access = tokens["accessToken"].as_str().unwrap();

    logout(&app, tokens["refreshToken"].as_str().unwrap()).await;

    let response = app
        .router
        .clone()
        .oneshot(bearer_request("/me", Some(&format!("Bearer {access}"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Metrics Tests
// =============================================================================

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = seeded_app(SessionPolicy::default()).await;
    login(&app, "a@a.com", "secret").await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("marquee_login_total"));
    assert!(text.contains("marquee_http_requests_total"));
}

#[tokio::test]
async fn test_unknown_paths_do_not_grow_metric_series() {
    let app = TestApp::new();

    for path in ["/k3v9-one", "/k3v9-two/deeper", "/.env.k3v9", "/sessions/k3v9"] {
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("endpoint=\"unmatched\""));
    assert!(!text.contains("k3v9"));
}
