//! # Domain Models
//!
//! These structs represent the core entities of Duskforum. The relational
//! store owns every entity; nothing here outlives a request except through it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authorization tier. Stored as a SMALLINT: admin = 1, user = 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn code(self) -> i16 {
        match self {
            Role::Admin => 1,
            Role::User => 2,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Role::Admin),
            2 => Some(Role::User),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

// Roles travel over the wire as their numeric codes, matching the stored form.
impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(self.code())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i16::deserialize(deserializer)?;
        Role::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid role code {code}")))
    }
}

/// A registered account. Usernames and emails are lowercase everywhere; the
/// directory service normalizes before any port sees them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string; empty for accounts provisioned via the external
    /// identity provider (they never authenticate with a local password).
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub user_role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Fields required to insert a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub user_role: Role,
    pub is_active: bool,
}

/// Outcome of the pre-insert uniqueness probes, evaluated together so a
/// caller can report both collisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistsReport {
    pub email_taken: bool,
    pub username_taken: bool,
}

/// Filters for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub active: Option<bool>,
    /// Case-insensitive substring over username OR email.
    pub search: Option<String>,
}

/// A top-level grouping for threads (e.g., "General", "Support").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumCategory {
    pub id: Uuid,
    pub name: String,
    /// URL slug, unique across all categories including inactive ones.
    pub slug: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
}

/// A discussion opener. Counters are only ever mutated by atomic store
/// operations; application code never read-modify-writes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category_id: Uuid,
    pub author_id: Uuid,
    pub is_pinned: bool,
    /// Locked threads are hidden from listing AND direct fetch.
    pub is_locked: bool,
    pub is_sticky: bool,
    pub view_count: i32,
    pub reply_count: i32,
    pub last_reply_at: Option<DateTime<Utc>>,
    pub last_reply_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewThread {
    pub title: String,
    pub content: String,
    pub category_id: Uuid,
    pub author_id: Uuid,
}

/// Replacement fields for a thread update. Title and content are mandatory;
/// the category is re-validated only when a replacement is supplied.
#[derive(Debug, Clone)]
pub struct ThreadPatch {
    pub title: String,
    pub content: String,
    pub category_id: Option<Uuid>,
}

/// Sortable thread columns. Anything else coming off the wire falls back to
/// the default rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadSort {
    CreatedAt,
    #[default]
    LastReplyAt,
    ViewCount,
    ReplyCount,
}

impl ThreadSort {
    pub fn parse(s: &str) -> Self {
        match s {
            "created_at" => ThreadSort::CreatedAt,
            "view_count" => ThreadSort::ViewCount,
            "reply_count" => ThreadSort::ReplyCount,
            _ => ThreadSort::LastReplyAt,
        }
    }

    /// Column name used in ORDER BY; the whitelist above is what keeps user
    /// input out of the SQL text.
    pub fn column(self) -> &'static str {
        match self {
            ThreadSort::CreatedAt => "created_at",
            ThreadSort::LastReplyAt => "last_reply_at",
            ThreadSort::ViewCount => "view_count",
            ThreadSort::ReplyCount => "reply_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filters for the thread listing. Locked threads are always excluded.
#[derive(Debug, Clone, Default)]
pub struct ThreadFilter {
    pub category_id: Option<Uuid>,
    /// Case-insensitive substring over title OR content.
    pub search: Option<String>,
    pub sort_by: ThreadSort,
    pub sort_order: SortOrder,
}

/// A reply within a thread, optionally nested under a parent comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub edited_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub thread_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
}

/// What a reaction can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Thread,
    Comment,
}

impl TargetType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "thread" => Some(TargetType::Thread),
            "comment" => Some(TargetType::Comment),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Thread => "thread",
            TargetType::Comment => "comment",
        }
    }
}

/// An emoji acknowledgment. At most one row may exist per
/// (user, target type, target id, emoji) tuple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

/// The identifying tuple of a reaction, used for insert and removal alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionKey {
    pub user_id: Uuid,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub emoji: String,
}

/// One reaction row joined with its owner's username, the raw material for
/// [`ReactionGroup`] aggregation.
#[derive(Debug, Clone)]
pub struct ReactionRow {
    pub user_id: Uuid,
    pub username: String,
    pub emoji: String,
}

/// Reactions on a target, grouped by emoji for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionGroup {
    pub emoji: String,
    pub count: u64,
    pub users: Vec<String>,
    #[serde(rename = "userReacted")]
    pub user_reacted: bool,
}

// ── Hydrated read models ─────────────────────────────────────────────────────
// The API returns rows joined with the human-readable context a client needs
// to render them without extra round trips.

/// The category fields a thread listing carries along.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    pub slug: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub username: String,
}

/// A thread joined with its category and author context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    #[serde(flatten)]
    pub thread: Thread,
    pub category: CategoryRef,
    pub author: UserRef,
    pub last_reply_user: Option<UserRef>,
}

/// A comment joined with its author and (when edited) editor context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: UserRef,
    pub edited_by_user: Option<UserRef>,
}

// ── Pagination ───────────────────────────────────────────────────────────────

/// A sanitized page request. Pages are 1-based; the offset is plain
/// arithmetic over the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const MAX_LIMIT: u32 = 100;

    /// Clamps out-of-range values instead of erroring: page floors at 1,
    /// limit is forced into 1..=MAX_LIMIT.
    pub fn clamped(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn limit_i64(&self) -> i64 {
        i64::from(self.limit)
    }
}

/// Page metadata returned alongside every listing. `total` is always computed
/// under the same filter as the rows themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
    #[serde(rename = "hasNext")]
    pub has_next: bool,
    #[serde(rename = "hasPrev")]
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: &PageRequest, total: i64) -> Self {
        let limit = i64::from(request.limit);
        let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
            has_next: i64::from(request.page) * limit < total,
            has_prev: request.page > 1,
        }
    }
}

// ── Sessions ─────────────────────────────────────────────────────────────────

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id.
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Verdict from the login rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    /// Denied; the caller may retry after this many seconds.
    Denied { retry_after_secs: u64 },
}
