//! End-to-end checks of the router over in-memory adapters: session cookie
//! flow, the shared error envelope, and the observability endpoints.

use std::sync::Arc;
use std::time::Duration;

use api_adapters::{ApiMetrics, AppState};
use auth_adapters::CredentialService;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use domains::{
    CategoryRepo, CommentRepo, Credentials, RateLimitStore, ReactionRepo, ThreadRepo, UserRepo,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use services::{AuthService, DirectoryService, ForumService};
use storage_adapters::{
    MemoryCategoryRepo, MemoryCommentRepo, MemoryRateLimiter, MemoryReactionRepo, MemoryStore,
    MemoryThreadRepo, MemoryUserRepo, RateLimitPolicy,
};
use tower::ServiceExt;

fn app() -> Router {
    let store = MemoryStore::shared();
    let users: Arc<dyn UserRepo> = Arc::new(MemoryUserRepo::new(store.clone()));
    let categories: Arc<dyn CategoryRepo> = Arc::new(MemoryCategoryRepo::new(store.clone()));
    let threads: Arc<dyn ThreadRepo> = Arc::new(MemoryThreadRepo::new(store.clone()));
    let comments: Arc<dyn CommentRepo> = Arc::new(MemoryCommentRepo::new(store.clone()));
    let reactions: Arc<dyn ReactionRepo> = Arc::new(MemoryReactionRepo::new(store));
    let credentials: Arc<dyn Credentials> = Arc::new(CredentialService::new(
        SecretString::from("router-smoke-secret"),
        Duration::from_secs(3600),
    ));
    let limiter: Arc<dyn RateLimitStore> =
        Arc::new(MemoryRateLimiter::new(RateLimitPolicy::default()));

    let state = AppState {
        auth: Arc::new(AuthService::new(
            users.clone(),
            credentials.clone(),
            limiter,
        )),
        directory: Arc::new(DirectoryService::new(users, credentials.clone())),
        forum: Arc::new(ForumService::new(categories, threads, comments, reactions)),
        credentials,
        provider: None,
        metrics: Arc::new(ApiMetrics::new()),
        cookie_secure: false,
    };
    api_adapters::router(state)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register(app: &Router, username: &str, email: &str) -> (String, Value) {
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/auth/register",
            json!({
                "username": username,
                "email": email,
                "password": "hunter22",
                "confirmPassword": "hunter22",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .to_owned();
    let body = body_json(response).await;
    (cookie, body)
}

#[tokio::test]
async fn healthz_answers() {
    let response = app().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_then_me_over_the_cookie() {
    let app = app();
    let (cookie, body) = register(&app, "smoke_user", "smoke@example.com").await;

    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Registration successful");
    assert_eq!(body["user"]["username"], "smoke_user");
    assert!(body["user"].get("password_hash").is_none());
    assert!(cookie.contains("Max-Age=2592000"));
    assert!(cookie.contains("HttpOnly"));

    let cookie_pair = cookie.split(';').next().unwrap().to_owned();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/me")
                .header(header::COOKIE, cookie_pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["user"]["email"], "smoke@example.com");
}

#[tokio::test]
async fn login_without_remember_me_sets_a_day_cookie() {
    let app = app();
    register(&app, "short_lived", "short@example.com").await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/auth/login",
            json!({ "email": "short@example.com", "password": "hunter22" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Max-Age=86400"));
    let body = body_json(response).await;
    assert_eq!(body["message"], "Login successful");
}

#[tokio::test]
async fn directory_requires_a_session() {
    let app = app();
    let response = app.clone().oneshot(get("/users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["type"], "UNAUTHORIZED");

    let (_, registered) = register(&app, "directory_admin", "admin@example.com").await;
    let token = registered["token"].as_str().unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/users")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["users"][0]["role_name"], "user");
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn directory_rejects_out_of_range_pages() {
    let app = app();
    let (_, registered) = register(&app, "pager", "pager@example.com").await;
    let token = registered["token"].as_str().unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/users?limit=101")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid pagination parameters");
}

#[tokio::test]
async fn thread_creation_reports_missing_fields() {
    let response = app()
        .oneshot(json_request(
            Method::POST,
            "/forum/threads",
            json!({ "title": "Only a title" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["type"], "VALIDATION_ERROR");
    assert_eq!(
        body["error"],
        "Title, content, category_id, and author_id are required"
    );
}

#[tokio::test]
async fn metrics_counts_served_requests() {
    let app = app();
    app.clone().oneshot(get("/healthz")).await.unwrap();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("application/openmetrics-text"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("http_requests_total"));
    assert!(text.contains("/healthz"));
}
