//! # Login Rate Limiting
//!
//! Failure counters behind the [`RateLimitStore`] port. The in-process store
//! covers single-node deployments; the Redis store (feature `redis`) shares
//! counters across instances with the same keys and windows.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use domains::{RateLimitDecision, RateLimitStore, Result};

/// Attempts allowed per key within one window.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(15 * 60),
        }
    }
}

struct AttemptWindow {
    count: u32,
    last_failure: Instant,
}

/// Process-local counters. DashMap serializes writers per key, so concurrent
/// failures from the same email cannot lose increments.
pub struct MemoryRateLimiter {
    policy: RateLimitPolicy,
    attempts: DashMap<String, AttemptWindow>,
}

impl MemoryRateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            attempts: DashMap::new(),
        }
    }
}

impl Default for MemoryRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

fn remaining_secs(window: Duration, elapsed: Duration) -> u64 {
    let remaining = window.saturating_sub(elapsed);
    let mut secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs += 1;
    }
    secs.max(1)
}

#[async_trait]
impl RateLimitStore for MemoryRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitDecision> {
        if let Some(entry) = self.attempts.get(key) {
            let elapsed = entry.last_failure.elapsed();
            if elapsed > self.policy.window {
                drop(entry);
                self.attempts.remove(key);
                return Ok(RateLimitDecision::Allowed);
            }
            if entry.count >= self.policy.max_attempts {
                return Ok(RateLimitDecision::Denied {
                    retry_after_secs: remaining_secs(self.policy.window, elapsed),
                });
            }
        }
        Ok(RateLimitDecision::Allowed)
    }

    async fn record_failure(&self, key: &str) -> Result<()> {
        let mut entry = self
            .attempts
            .entry(key.to_string())
            .or_insert(AttemptWindow {
                count: 0,
                last_failure: Instant::now(),
            });
        entry.count += 1;
        entry.last_failure = Instant::now();
        debug!(key, count = entry.count, "login failure recorded");
        Ok(())
    }

    async fn reset(&self, key: &str) -> Result<()> {
        self.attempts.remove(key);
        Ok(())
    }
}

#[cfg(feature = "redis")]
pub use redis_store::RedisRateLimiter;

#[cfg(feature = "redis")]
mod redis_store {
    use async_trait::async_trait;
    use deadpool_redis::redis::cmd;
    use deadpool_redis::{Config, Pool, Runtime};

    use domains::{AppError, RateLimitDecision, RateLimitStore, Result};

    use super::RateLimitPolicy;

    /// Shared counters in Redis: INCR + EXPIRE per failure, TTL for the
    /// remaining lockout. Safe across any number of server instances.
    pub struct RedisRateLimiter {
        pool: Pool,
        policy: RateLimitPolicy,
    }

    impl RedisRateLimiter {
        pub fn from_url(url: &str, policy: RateLimitPolicy) -> Result<Self> {
            let pool = Config::from_url(url)
                .create_pool(Some(Runtime::Tokio1))
                .map_err(|e| AppError::Internal(format!("redis pool: {e}")))?;
            Ok(Self { pool, policy })
        }

        fn key_for(key: &str) -> String {
            format!("login:attempts:{key}")
        }

        async fn conn(&self) -> Result<deadpool_redis::Connection> {
            self.pool
                .get()
                .await
                .map_err(|e| AppError::Internal(format!("redis pool: {e}")))
        }
    }

    fn redis_err(e: deadpool_redis::redis::RedisError) -> AppError {
        AppError::Internal(format!("redis: {e}"))
    }

    #[async_trait]
    impl RateLimitStore for RedisRateLimiter {
        async fn check(&self, key: &str) -> Result<RateLimitDecision> {
            let mut conn = self.conn().await?;
            let redis_key = Self::key_for(key);
            let count: Option<i64> = cmd("GET")
                .arg(&redis_key)
                .query_async(&mut conn)
                .await
                .map_err(redis_err)?;
            if count.unwrap_or(0) >= i64::from(self.policy.max_attempts) {
                let ttl: i64 = cmd("TTL")
                    .arg(&redis_key)
                    .query_async(&mut conn)
                    .await
                    .map_err(redis_err)?;
                return Ok(RateLimitDecision::Denied {
                    retry_after_secs: ttl.max(1) as u64,
                });
            }
            Ok(RateLimitDecision::Allowed)
        }

        async fn record_failure(&self, key: &str) -> Result<()> {
            let mut conn = self.conn().await?;
            let redis_key = Self::key_for(key);
            let count: i64 = cmd("INCR")
                .arg(&redis_key)
                .query_async(&mut conn)
                .await
                .map_err(redis_err)?;
            if count == 1 {
                let _: () = cmd("EXPIRE")
                    .arg(&redis_key)
                    .arg(self.policy.window.as_secs())
                    .query_async(&mut conn)
                    .await
                    .map_err(redis_err)?;
            }
            Ok(())
        }

        async fn reset(&self, key: &str) -> Result<()> {
            let mut conn = self.conn().await?;
            let _: () = cmd("DEL")
                .arg(Self::key_for(key))
                .query_async(&mut conn)
                .await
                .map_err(redis_err)?;
            Ok(())
        }
    }
}
