//! # Duskforum Binary
//!
//! The entry point that assembles the application from compile-time features:
//! Postgres repos (feature `db-postgres`), JWT credentials (`auth-jwt`),
//! Redis-backed login counters (`redis`) and the REST identity provider
//! client (`provider-rest`). Leaving `db-postgres` off swaps in the
//! in-memory repos, which is enough for local demos.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{ApiMetrics, AppState};
use configs::AppConfig;
use domains::{
    CategoryRepo, CommentRepo, Credentials, IdentityProvider, RateLimitStore, ReactionRepo,
    ThreadRepo, UserRepo,
};
use services::{AuthService, DirectoryService, ForumService};
use storage_adapters::{MemoryRateLimiter, RateLimitPolicy};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "auth-jwt")]
use auth_adapters::CredentialService;
#[cfg(feature = "provider-rest")]
use auth_adapters::RestIdentityProvider;
#[cfg(feature = "redis")]
use storage_adapters::RedisRateLimiter;

#[cfg(not(feature = "web-axum"))]
compile_error!("duskforum needs the web-axum feature to expose its API");
#[cfg(not(feature = "auth-jwt"))]
compile_error!("duskforum needs the auth-jwt feature to issue sessions");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::load().context("loading configuration")?;
    init_tracing(&cfg);

    let repos = build_repos(&cfg).await?;
    let limiter = build_limiter(&cfg)?;
    let credentials: Arc<dyn Credentials> = Arc::new(CredentialService::new(
        cfg.auth.jwt_secret.clone(),
        cfg.auth.token_ttl(),
    ));
    let provider = build_provider(&cfg)?;

    let state = AppState {
        auth: Arc::new(AuthService::new(
            repos.users.clone(),
            credentials.clone(),
            limiter,
        )),
        directory: Arc::new(DirectoryService::new(repos.users, credentials.clone())),
        forum: Arc::new(ForumService::new(
            repos.categories,
            repos.threads,
            repos.comments,
            repos.reactions,
        )),
        credentials,
        provider,
        metrics: Arc::new(ApiMetrics::new()),
        cookie_secure: cfg.auth.cookie_secure,
    };
    let app = api_adapters::router(state);

    let addr = cfg.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "duskforum listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

fn init_tracing(cfg: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if cfg.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Every repo port bound to one backend.
struct Repos {
    users: Arc<dyn UserRepo>,
    categories: Arc<dyn CategoryRepo>,
    threads: Arc<dyn ThreadRepo>,
    comments: Arc<dyn CommentRepo>,
    reactions: Arc<dyn ReactionRepo>,
}

#[cfg(feature = "db-postgres")]
async fn build_repos(cfg: &AppConfig) -> anyhow::Result<Repos> {
    use sqlx::postgres::PgPoolOptions;
    use storage_adapters::PgStores;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .acquire_timeout(cfg.database.acquire_timeout())
        .connect(&cfg.database.url)
        .await
        .context("connecting to Postgres")?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("running migrations")?;
    info!("connected to Postgres");

    let stores = PgStores::new(pool);
    Ok(Repos {
        users: Arc::new(stores.users),
        categories: Arc::new(stores.categories),
        threads: Arc::new(stores.threads),
        comments: Arc::new(stores.comments),
        reactions: Arc::new(stores.reactions),
    })
}

#[cfg(not(feature = "db-postgres"))]
async fn build_repos(_cfg: &AppConfig) -> anyhow::Result<Repos> {
    use storage_adapters::{
        MemoryCategoryRepo, MemoryCommentRepo, MemoryReactionRepo, MemoryStore, MemoryThreadRepo,
        MemoryUserRepo,
    };

    tracing::warn!("db-postgres feature disabled, data lives in this process only");
    let store = MemoryStore::shared();
    Ok(Repos {
        users: Arc::new(MemoryUserRepo::new(store.clone())),
        categories: Arc::new(MemoryCategoryRepo::new(store.clone())),
        threads: Arc::new(MemoryThreadRepo::new(store.clone())),
        comments: Arc::new(MemoryCommentRepo::new(store.clone())),
        reactions: Arc::new(MemoryReactionRepo::new(store)),
    })
}

fn build_limiter(cfg: &AppConfig) -> anyhow::Result<Arc<dyn RateLimitStore>> {
    let policy = RateLimitPolicy {
        max_attempts: cfg.rate_limit.max_attempts,
        window: cfg.rate_limit.window(),
    };

    #[cfg(feature = "redis")]
    if let Some(url) = &cfg.rate_limit.redis_url {
        let limiter = RedisRateLimiter::from_url(url, policy).context("connecting to Redis")?;
        info!("login rate limiting backed by Redis");
        return Ok(Arc::new(limiter));
    }
    #[cfg(not(feature = "redis"))]
    if cfg.rate_limit.redis_url.is_some() {
        tracing::warn!("rate_limit.redis_url is set but the redis feature is disabled");
    }

    Ok(Arc::new(MemoryRateLimiter::new(policy)))
}

#[cfg(feature = "provider-rest")]
fn build_provider(cfg: &AppConfig) -> anyhow::Result<Option<Arc<dyn IdentityProvider>>> {
    match &cfg.provider {
        Some(provider) => {
            let client = RestIdentityProvider::new(provider.url.clone(), provider.service_key.clone())
                .context("building the identity provider client")?;
            info!(url = %provider.url, "identity provider configured");
            Ok(Some(Arc::new(client)))
        }
        None => Ok(None),
    }
}

#[cfg(not(feature = "provider-rest"))]
fn build_provider(cfg: &AppConfig) -> anyhow::Result<Option<Arc<dyn IdentityProvider>>> {
    if cfg.provider.is_some() {
        tracing::warn!("provider config is set but the provider-rest feature is disabled");
    }
    Ok(None)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
        info!("received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
