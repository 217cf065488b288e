//! # api-adapters
//!
//! The HTTP surface over the service layer. Handlers translate wire shapes
//! to service calls and back; all business rules live one layer down.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod metrics;
#[cfg(feature = "web-axum")]
pub mod session;
#[cfg(feature = "web-axum")]
pub mod state;

#[cfg(feature = "web-axum")]
pub use metrics::ApiMetrics;
#[cfg(feature = "web-axum")]
pub use state::AppState;

#[cfg(feature = "web-axum")]
mod router {
    use std::time::Duration;

    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
    use axum::http::Method;
    use axum::middleware;
    use axum::routing::{get, post};
    use axum::Router;
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
    use tower_http::trace::TraceLayer;

    use crate::handlers::{auth, categories, comments, health, reactions, threads, users};
    use crate::metrics::track_http;
    use crate::state::AppState;

    /// Builds the full route table with request ids, tracing, CORS and the
    /// request counter applied around it.
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/healthz", get(health::healthz))
            .route("/metrics", get(health::metrics))
            .route("/auth/login", post(auth::login))
            .route("/auth/register", post(auth::register))
            .route("/auth/logout", post(auth::logout))
            .route("/auth/me", get(auth::me))
            .route("/auth/provider-user", post(auth::provider_user))
            .route("/auth/fix-username", post(auth::fix_username))
            .route("/forum/threads", get(threads::list).post(threads::create))
            .route(
                "/forum/threads/{id}",
                get(threads::fetch)
                    .put(threads::update)
                    .delete(threads::remove),
            )
            .route(
                "/forum/comments",
                get(comments::list).post(comments::create),
            )
            .route(
                "/forum/reactions",
                get(reactions::list)
                    .post(reactions::create)
                    .delete(reactions::remove),
            )
            .route(
                "/forum/categories",
                get(categories::list).post(categories::create),
            )
            .route("/users", get(users::list).post(users::create))
            .layer(middleware::from_fn_with_state(state.clone(), track_http))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(cors_policy())
            .with_state(state)
    }

    fn cors_policy() -> CorsLayer {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([CONTENT_TYPE, AUTHORIZATION])
            .max_age(Duration::from_secs(3600))
    }
}

#[cfg(feature = "web-axum")]
pub use router::router;
