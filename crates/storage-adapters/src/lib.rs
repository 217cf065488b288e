//! # Duskforum Storage Adapters
//!
//! Implementations of the domain repo ports. The Postgres adapters (feature
//! `db-postgres`) are the production path; the in-memory adapters exist for
//! tests and demos. The rate-limit stores live here too, since they are
//! storage concerns even when the storage is a process-local map.

pub mod memory;
pub mod rate_limit;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::{
    MemoryCategoryRepo, MemoryCommentRepo, MemoryReactionRepo, MemoryStore, MemoryThreadRepo,
    MemoryUserRepo,
};
pub use rate_limit::{MemoryRateLimiter, RateLimitPolicy};

#[cfg(feature = "redis")]
pub use rate_limit::RedisRateLimiter;

#[cfg(feature = "db-postgres")]
pub use postgres::{
    PgCategoryRepo, PgCommentRepo, PgReactionRepo, PgStores, PgThreadRepo, PgUserRepo,
};
