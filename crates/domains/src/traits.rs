//! # Ports
//!
//! Trait boundaries between the services and everything replaceable: storage,
//! credential handling, the external identity provider, and the login
//! rate-limit store. Adapters implement these; services only ever see the
//! trait objects.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Comment, CommentView, ExistsReport, ForumCategory, NewCategory, NewComment, NewThread,
    NewUser, PageRequest, RateLimitDecision, Reaction, ReactionKey, ReactionRow, SessionClaims,
    TargetType, Thread, ThreadFilter, ThreadPatch, ThreadSummary, User, UserFilter,
};

/// User rows and the admin directory queries over them.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<User>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Lookup by lowercase email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Probes both uniqueness constraints in one round trip.
    async fn exists(&self, email: &str, username: &str) -> Result<ExistsReport>;

    async fn set_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn update_username(&self, id: Uuid, username: &str) -> Result<User>;

    /// Filtered page of the directory plus the total under the same filter.
    async fn list(&self, filter: UserFilter, page: PageRequest) -> Result<(Vec<User>, i64)>;
}

/// Category rows.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CategoryRepo: Send + Sync {
    async fn insert(&self, category: NewCategory) -> Result<ForumCategory>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ForumCategory>>;

    /// Active categories ordered by sort_order, then name.
    async fn list_active(&self) -> Result<Vec<ForumCategory>>;
}

/// Thread rows. Counter updates are atomic at the store level.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepo: Send + Sync {
    /// Inserts and returns the row hydrated with category and author context.
    async fn insert(&self, thread: NewThread) -> Result<ThreadSummary>;

    /// Unlocked threads matching the filter, hydrated, plus the total under
    /// the same filter.
    async fn list(
        &self,
        filter: ThreadFilter,
        page: PageRequest,
    ) -> Result<(Vec<ThreadSummary>, i64)>;

    /// Fetches an unlocked thread and bumps its view count in the same
    /// statement; the returned summary carries the post-increment value.
    async fn fetch_and_touch(&self, id: Uuid) -> Result<Option<ThreadSummary>>;

    /// Plain lookup without the view-count side effect, locked rows included.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Thread>>;

    /// Applies the patch and returns the hydrated row, or `None` when no
    /// such thread exists.
    async fn update(&self, id: Uuid, patch: ThreadPatch) -> Result<Option<ThreadSummary>>;

    /// Removes the thread and, via cascade, its comments and reactions.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Comment rows.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepo: Send + Sync {
    /// Inserts the comment and advances the thread's reply counters in one
    /// transaction. Returns the row hydrated with author context.
    async fn insert(&self, comment: NewComment) -> Result<CommentView>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>>;

    /// Oldest-first page of a thread's comments, hydrated, plus the total.
    async fn list_for_thread(
        &self,
        thread_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<CommentView>, i64)>;

    /// Every comment on the thread, oldest first, for the detail view.
    async fn list_all_for_thread(&self, thread_id: Uuid) -> Result<Vec<CommentView>>;
}

/// Reaction rows. Uniqueness of (user, target, emoji) is enforced here, not
/// by callers probing first.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReactionRepo: Send + Sync {
    /// Inserts the reaction; a duplicate tuple surfaces as a conflict.
    async fn insert(&self, key: ReactionKey) -> Result<Reaction>;

    /// Removes the reaction if present. Returns whether a row was deleted.
    async fn delete(&self, key: ReactionKey) -> Result<bool>;

    /// Every reaction on the target joined with its owner's username,
    /// oldest first.
    async fn list_for_target(
        &self,
        target_type: TargetType,
        target_id: Uuid,
    ) -> Result<Vec<ReactionRow>>;
}

/// Counter store behind the login rate limiter. Implementations decide where
/// the counters live (process memory, Redis) and expire them after the window.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Checks whether `key` may attempt a login right now.
    async fn check(&self, key: &str) -> Result<RateLimitDecision>;

    /// Records a failed attempt against `key`.
    async fn record_failure(&self, key: &str) -> Result<()>;

    /// Clears `key`'s counter after a successful login.
    async fn reset(&self, key: &str) -> Result<()>;
}

/// Password hashing and session token handling.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Credentials: Send + Sync {
    fn hash_password(&self, password: &str) -> Result<String>;

    /// Constant-time verification against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool>;

    fn issue_token(&self, user: &User) -> Result<String>;

    /// Decodes and validates a token, returning its claims.
    fn verify_token(&self, token: &str) -> Result<SessionClaims>;
}

/// Identity asserted by the external provider, before reconciliation.
#[derive(Debug, Clone)]
pub struct ProviderIdentity {
    pub subject: String,
    pub email: String,
    pub username: Option<String>,
}

/// External identity provider operations.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a provider session token to the identity it asserts.
    async fn resolve(&self, access_token: &str) -> Result<ProviderIdentity>;

    /// Writes a username into the provider-side user metadata.
    async fn set_username(&self, access_token: &str, username: &str) -> Result<()>;
}
