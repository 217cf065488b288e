//! # Postgres Adapters
//!
//! Implements the repo ports against Postgres via sqlx. Queries are runtime
//! `sqlx::query` with manual row mapping; counters and uniqueness live in SQL
//! so they hold under concurrent writers.

use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use domains::{
    AppError, CategoryRef, Comment, CommentView, ForumCategory, Reaction, Role, TargetType,
    Thread, ThreadSummary, User, UserRef,
};

mod categories;
mod comments;
mod reactions;
mod threads;
mod users;

pub use categories::PgCategoryRepo;
pub use comments::PgCommentRepo;
pub use reactions::PgReactionRepo;
pub use threads::PgThreadRepo;
pub use users::PgUserRepo;

/// Every repo over one shared pool.
pub struct PgStores {
    pub users: PgUserRepo,
    pub categories: PgCategoryRepo,
    pub threads: PgThreadRepo,
    pub comments: PgCommentRepo,
    pub reactions: PgReactionRepo,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: PgUserRepo::new(pool.clone()),
            categories: PgCategoryRepo::new(pool.clone()),
            threads: PgThreadRepo::new(pool.clone()),
            comments: PgCommentRepo::new(pool.clone()),
            reactions: PgReactionRepo::new(pool),
        }
    }
}

pub(crate) fn map_db(err: sqlx::Error) -> AppError {
    AppError::Database(err.to_string())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// Constraint name of a database error, when the driver reports one.
pub(crate) fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db| db.constraint())
        .map(str::to_owned)
}

pub(crate) fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        user_role: Role::from_code(row.get::<i16, _>("user_role")).unwrap_or(Role::User),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        last_login: row.get("last_login"),
    }
}

pub(crate) fn category_from_row(row: &PgRow) -> ForumCategory {
    ForumCategory {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
        color: row.get("color"),
        icon: row.get("icon"),
        sort_order: row.get("sort_order"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub(crate) fn thread_from_row(row: &PgRow) -> Thread {
    Thread {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        category_id: row.get("category_id"),
        author_id: row.get("author_id"),
        is_pinned: row.get("is_pinned"),
        is_locked: row.get("is_locked"),
        is_sticky: row.get("is_sticky"),
        view_count: row.get("view_count"),
        reply_count: row.get("reply_count"),
        last_reply_at: row.get("last_reply_at"),
        last_reply_by: row.get("last_reply_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Maps a thread row joined with category and author columns.
pub(crate) fn thread_summary_from_row(row: &PgRow) -> ThreadSummary {
    ThreadSummary {
        thread: thread_from_row(row),
        category: CategoryRef {
            name: row.get("category_name"),
            slug: row.get("category_slug"),
            color: row.get("category_color"),
        },
        author: UserRef {
            username: row.get("author_username"),
        },
        last_reply_user: row
            .get::<Option<String>, _>("last_reply_username")
            .map(|username| UserRef { username }),
    }
}

pub(crate) fn comment_from_row(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        thread_id: row.get("thread_id"),
        author_id: row.get("author_id"),
        parent_id: row.get("parent_id"),
        content: row.get("content"),
        is_edited: row.get("is_edited"),
        edited_at: row.get("edited_at"),
        edited_by: row.get("edited_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Maps a comment row joined with author and editor columns.
pub(crate) fn comment_view_from_row(row: &PgRow) -> CommentView {
    CommentView {
        comment: comment_from_row(row),
        author: UserRef {
            username: row.get("author_username"),
        },
        edited_by_user: row
            .get::<Option<String>, _>("editor_username")
            .map(|username| UserRef { username }),
    }
}

pub(crate) fn reaction_from_row(row: &PgRow) -> Reaction {
    Reaction {
        id: row.get("id"),
        user_id: row.get("user_id"),
        target_type: TargetType::parse(row.get::<&str, _>("target_type"))
            .unwrap_or(TargetType::Thread),
        target_id: row.get("target_id"),
        emoji: row.get("emoji"),
        created_at: row.get("created_at"),
    }
}
