//! Shared plumbing for the HTTP-level tests: a full router wired to the
//! in-memory adapters, plus request and seeding helpers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use api_adapters::{ApiMetrics, AppState};
use auth_adapters::CredentialService;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use domains::{Credentials, IdentityProvider, RateLimitStore, UserRepo};
use secrecy::SecretString;
use serde_json::{json, Value};
use services::{AuthService, DirectoryService, ForumService};
use storage_adapters::{
    MemoryCategoryRepo, MemoryCommentRepo, MemoryRateLimiter, MemoryReactionRepo, MemoryStore,
    MemoryThreadRepo, MemoryUserRepo, RateLimitPolicy,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "hunter22";

pub fn app() -> TestApp {
    TestAppBuilder::default().build()
}

/// Swaps individual pieces of the default in-memory wiring.
#[derive(Default)]
pub struct TestAppBuilder {
    users: Option<Arc<dyn UserRepo>>,
    provider: Option<Arc<dyn IdentityProvider>>,
    policy: Option<RateLimitPolicy>,
}

impl TestAppBuilder {
    pub fn users(mut self, users: Arc<dyn UserRepo>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn build(self) -> TestApp {
        let store = MemoryStore::shared();
        let users = self
            .users
            .unwrap_or_else(|| Arc::new(MemoryUserRepo::new(store.clone())));
        let credentials: Arc<dyn Credentials> = Arc::new(CredentialService::new(
            SecretString::from("integration-test-secret"),
            Duration::from_secs(3600),
        ));
        let limiter: Arc<dyn RateLimitStore> = Arc::new(MemoryRateLimiter::new(
            self.policy.unwrap_or_default(),
        ));

        let state = AppState {
            auth: Arc::new(AuthService::new(
                users.clone(),
                credentials.clone(),
                limiter,
            )),
            directory: Arc::new(DirectoryService::new(users, credentials.clone())),
            forum: Arc::new(ForumService::new(
                Arc::new(MemoryCategoryRepo::new(store.clone())),
                Arc::new(MemoryThreadRepo::new(store.clone())),
                Arc::new(MemoryCommentRepo::new(store.clone())),
                Arc::new(MemoryReactionRepo::new(store)),
            )),
            credentials,
            provider: self.provider,
            metrics: Arc::new(ApiMetrics::new()),
            cookie_secure: false,
        };
        TestApp {
            router: api_adapters::router(state),
        }
    }
}

pub struct TestApp {
    router: Router,
}

/// A registered account plus the session token the API handed back.
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub token: String,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_auth(&self, uri: &str, token: &str) -> Response {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response {
        self.json_request(Method::POST, uri, body).await
    }

    pub async fn post_json_auth(&self, uri: &str, token: &str, body: Value) -> Response {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn put_json(&self, uri: &str, body: Value) -> Response {
        self.json_request(Method::PUT, uri, body).await
    }

    pub async fn delete_json(&self, uri: &str, body: Value) -> Response {
        self.json_request(Method::DELETE, uri, body).await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        self.send(
            Request::builder()
                .method(Method::DELETE)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn json_request(&self, method: Method, uri: &str, body: Value) -> Response {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Registers an account through the public endpoint and returns its
    /// identity and token.
    pub async fn register(&self, username: &str, email: &str) -> Account {
        let response = self
            .post_json(
                "/auth/register",
                json!({
                    "username": username,
                    "email": email,
                    "password": PASSWORD,
                    "confirmPassword": PASSWORD,
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "registration failed");
        let body = body_json(response).await;
        Account {
            id: field_uuid(&body["user"], "id"),
            username: body["user"]["username"].as_str().unwrap().to_owned(),
            email: body["user"]["email"].as_str().unwrap().to_owned(),
            token: body["token"].as_str().unwrap().to_owned(),
        }
    }

    pub async fn create_category(&self, name: &str, slug: &str) -> Uuid {
        let response = self
            .post_json(
                "/forum/categories",
                json!({ "name": name, "slug": slug }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "category failed");
        let body = body_json(response).await;
        field_uuid(&body["category"], "id")
    }

    pub async fn create_thread(&self, category_id: Uuid, author_id: Uuid, title: &str) -> Uuid {
        let response = self
            .post_json(
                "/forum/threads",
                json!({
                    "title": title,
                    "content": "Long enough to pass the content floor.",
                    "category_id": category_id,
                    "author_id": author_id,
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "thread failed");
        let body = body_json(response).await;
        field_uuid(&body["thread"], "id")
    }

    pub async fn create_comment(&self, thread_id: Uuid, author_id: Uuid, content: &str) -> Uuid {
        let response = self
            .post_json(
                "/forum/comments",
                json!({
                    "thread_id": thread_id,
                    "author_id": author_id,
                    "content": content,
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "comment failed");
        let body = body_json(response).await;
        field_uuid(&body["comment"], "id")
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("non-JSON body: {e}"))
}

pub fn set_cookie(response: &Response) -> String {
    response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .to_owned()
}

pub fn field_uuid(value: &Value, key: &str) -> Uuid {
    value[key]
        .as_str()
        .unwrap_or_else(|| panic!("missing {key} in {value}"))
        .parse()
        .unwrap()
}
