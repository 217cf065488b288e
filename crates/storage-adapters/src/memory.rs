//! # In-Memory Adapters
//!
//! DashMap-backed implementations of the repo ports with the same observable
//! semantics as the Postgres adapters: uniqueness, counters, hydration, and
//! null ordering. Suitable for tests and single-process demos; nothing here
//! survives a restart.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use domains::{
    AppError, CategoryRef, CategoryRepo, Comment, CommentRepo, CommentView, ExistsReport,
    ForumCategory, NewCategory, NewComment, NewThread, NewUser, PageRequest, Reaction,
    ReactionKey, ReactionRepo, ReactionRow, Result, SortOrder, TargetType, Thread, ThreadFilter,
    ThreadPatch, ThreadRepo, ThreadSort, ThreadSummary, User, UserFilter, UserRef, UserRepo,
};

/// Shared backing tables. Repos hold an `Arc` so cross-entity reads (joins,
/// cascades) see one consistent world.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    categories: DashMap<Uuid, ForumCategory>,
    threads: DashMap<Uuid, Thread>,
    comments: DashMap<Uuid, Comment>,
    reactions: DashMap<Uuid, Reaction>,
}

impl MemoryStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn username_of(&self, id: Uuid) -> Result<UserRef> {
        self.users
            .get(&id)
            .map(|u| UserRef {
                username: u.username.clone(),
            })
            .ok_or_else(|| AppError::Database(format!("dangling user reference {id}")))
    }

    fn hydrate_thread(&self, thread: Thread) -> Result<ThreadSummary> {
        let category = self
            .categories
            .get(&thread.category_id)
            .map(|c| CategoryRef {
                name: c.name.clone(),
                slug: c.slug.clone(),
                color: c.color.clone(),
            })
            .ok_or_else(|| {
                AppError::Database(format!("dangling category reference {}", thread.category_id))
            })?;
        let author = self.username_of(thread.author_id)?;
        let last_reply_user = match thread.last_reply_by {
            Some(id) => Some(self.username_of(id)?),
            None => None,
        };
        Ok(ThreadSummary {
            thread,
            category,
            author,
            last_reply_user,
        })
    }

    fn hydrate_comment(&self, comment: Comment) -> Result<CommentView> {
        let author = self.username_of(comment.author_id)?;
        let edited_by_user = match comment.edited_by {
            Some(id) => Some(self.username_of(id)?),
            None => None,
        };
        Ok(CommentView {
            comment,
            author,
            edited_by_user,
        })
    }
}

/// Option ordering that mirrors the database default: absent sorts as the
/// largest value in either direction.
fn cmp_nullable(a: &Option<DateTime<Utc>>, b: &Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(y),
    }
}

fn page_slice<T>(mut rows: Vec<T>, page: PageRequest) -> Vec<T> {
    let offset = page.offset() as usize;
    if offset >= rows.len() {
        return Vec::new();
    }
    rows.drain(..offset);
    rows.truncate(page.limit as usize);
    rows
}

// ── Users ────────────────────────────────────────────────────────────────────

pub struct MemoryUserRepo {
    store: Arc<MemoryStore>,
}

impl MemoryUserRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn insert(&self, user: NewUser) -> Result<User> {
        if self.store.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        if self.store.users.iter().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("Username already taken".into()));
        }
        let now = Utc::now();
        let row = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            user_role: user.user_role,
            is_active: user.is_active,
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        self.store.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.store.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .store
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.clone()))
    }

    async fn exists(&self, email: &str, username: &str) -> Result<ExistsReport> {
        Ok(ExistsReport {
            email_taken: self.store.users.iter().any(|u| u.email == email),
            username_taken: self.store.users.iter().any(|u| u.username == username),
        })
    }

    async fn set_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(mut user) = self.store.users.get_mut(&id) {
            user.last_login = Some(at);
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_username(&self, id: Uuid, username: &str) -> Result<User> {
        if self
            .store
            .users
            .iter()
            .any(|u| u.username == username && *u.key() != id)
        {
            return Err(AppError::Conflict("Username already taken".into()));
        }
        let mut user = self
            .store
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("User", id))?;
        user.username = username.to_string();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn list(&self, filter: UserFilter, page: PageRequest) -> Result<(Vec<User>, i64)> {
        let search = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut rows: Vec<User> = self
            .store
            .users
            .iter()
            .filter(|u| filter.role.map(|r| u.user_role == r).unwrap_or(true))
            .filter(|u| filter.active.map(|a| u.is_active == a).unwrap_or(true))
            .filter(|u| {
                search
                    .as_ref()
                    .map(|s| {
                        u.username.to_lowercase().contains(s)
                            || u.email.to_lowercase().contains(s)
                    })
                    .unwrap_or(true)
            })
            .map(|u| u.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = rows.len() as i64;
        Ok((page_slice(rows, page), total))
    }
}

// ── Categories ───────────────────────────────────────────────────────────────

pub struct MemoryCategoryRepo {
    store: Arc<MemoryStore>,
}

impl MemoryCategoryRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CategoryRepo for MemoryCategoryRepo {
    async fn insert(&self, category: NewCategory) -> Result<ForumCategory> {
        if self
            .store
            .categories
            .iter()
            .any(|c| c.slug == category.slug)
        {
            return Err(AppError::Conflict(
                "Category with this slug already exists".into(),
            ));
        }
        let now = Utc::now();
        let row = ForumCategory {
            id: Uuid::new_v4(),
            name: category.name,
            slug: category.slug,
            description: category.description,
            color: category.color.unwrap_or_else(|| "#3B82F6".to_string()),
            icon: category.icon,
            sort_order: category.sort_order.unwrap_or(0),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.store.categories.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ForumCategory>> {
        Ok(self.store.categories.get(&id).map(|c| c.clone()))
    }

    async fn list_active(&self) -> Result<Vec<ForumCategory>> {
        let mut rows: Vec<ForumCategory> = self
            .store
            .categories
            .iter()
            .filter(|c| c.is_active)
            .map(|c| c.clone())
            .collect();
        rows.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(rows)
    }
}

// ── Threads ──────────────────────────────────────────────────────────────────

pub struct MemoryThreadRepo {
    store: Arc<MemoryStore>,
}

impl MemoryThreadRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ThreadRepo for MemoryThreadRepo {
    async fn insert(&self, thread: NewThread) -> Result<ThreadSummary> {
        let now = Utc::now();
        let row = Thread {
            id: Uuid::new_v4(),
            title: thread.title,
            content: thread.content,
            category_id: thread.category_id,
            author_id: thread.author_id,
            is_pinned: false,
            is_locked: false,
            is_sticky: false,
            view_count: 0,
            reply_count: 0,
            last_reply_at: None,
            last_reply_by: None,
            created_at: now,
            updated_at: now,
        };
        self.store.threads.insert(row.id, row.clone());
        self.store.hydrate_thread(row)
    }

    async fn list(
        &self,
        filter: ThreadFilter,
        page: PageRequest,
    ) -> Result<(Vec<ThreadSummary>, i64)> {
        let search = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut rows: Vec<Thread> = self
            .store
            .threads
            .iter()
            .filter(|t| !t.is_locked)
            .filter(|t| filter.category_id.map(|c| t.category_id == c).unwrap_or(true))
            .filter(|t| {
                search
                    .as_ref()
                    .map(|s| {
                        t.title.to_lowercase().contains(s)
                            || t.content.to_lowercase().contains(s)
                    })
                    .unwrap_or(true)
            })
            .map(|t| t.clone())
            .collect();

        rows.sort_by(|a, b| {
            let ordering = match filter.sort_by {
                ThreadSort::CreatedAt => a.created_at.cmp(&b.created_at),
                ThreadSort::LastReplyAt => cmp_nullable(&a.last_reply_at, &b.last_reply_at),
                ThreadSort::ViewCount => a.view_count.cmp(&b.view_count),
                ThreadSort::ReplyCount => a.reply_count.cmp(&b.reply_count),
            };
            match filter.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = rows.len() as i64;
        page_slice(rows, page)
            .into_iter()
            .map(|t| self.store.hydrate_thread(t))
            .collect::<Result<Vec<_>>>()
            .map(|summaries| (summaries, total))
    }

    async fn fetch_and_touch(&self, id: Uuid) -> Result<Option<ThreadSummary>> {
        let touched = match self.store.threads.get_mut(&id) {
            Some(mut thread) if !thread.is_locked => {
                thread.view_count += 1;
                thread.clone()
            }
            _ => return Ok(None),
        };
        self.store.hydrate_thread(touched).map(Some)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Thread>> {
        Ok(self.store.threads.get(&id).map(|t| t.clone()))
    }

    async fn update(&self, id: Uuid, patch: ThreadPatch) -> Result<Option<ThreadSummary>> {
        let updated = match self.store.threads.get_mut(&id) {
            Some(mut thread) => {
                thread.title = patch.title;
                thread.content = patch.content;
                if let Some(category_id) = patch.category_id {
                    thread.category_id = category_id;
                }
                thread.updated_at = Utc::now();
                thread.clone()
            }
            None => return Ok(None),
        };
        self.store.hydrate_thread(updated).map(Some)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let existed = self.store.threads.remove(&id).is_some();

        let comment_ids: Vec<Uuid> = self
            .store
            .comments
            .iter()
            .filter(|c| c.thread_id == id)
            .map(|c| c.id)
            .collect();
        for comment_id in &comment_ids {
            self.store.comments.remove(comment_id);
        }

        let reaction_ids: Vec<Uuid> = self
            .store
            .reactions
            .iter()
            .filter(|r| match r.target_type {
                TargetType::Thread => r.target_id == id,
                TargetType::Comment => comment_ids.contains(&r.target_id),
            })
            .map(|r| r.id)
            .collect();
        for reaction_id in reaction_ids {
            self.store.reactions.remove(&reaction_id);
        }

        Ok(existed)
    }
}

// ── Comments ─────────────────────────────────────────────────────────────────

pub struct MemoryCommentRepo {
    store: Arc<MemoryStore>,
}

impl MemoryCommentRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    fn thread_comments(&self, thread_id: Uuid) -> Vec<Comment> {
        let mut rows: Vec<Comment> = self
            .store
            .comments
            .iter()
            .filter(|c| c.thread_id == thread_id)
            .map(|c| c.clone())
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        rows
    }
}

#[async_trait]
impl CommentRepo for MemoryCommentRepo {
    async fn insert(&self, comment: NewComment) -> Result<CommentView> {
        let now = Utc::now();
        let row = Comment {
            id: Uuid::new_v4(),
            thread_id: comment.thread_id,
            author_id: comment.author_id,
            parent_id: comment.parent_id,
            content: comment.content,
            is_edited: false,
            edited_at: None,
            edited_by: None,
            created_at: now,
            updated_at: now,
        };
        self.store.comments.insert(row.id, row.clone());

        if let Some(mut thread) = self.store.threads.get_mut(&row.thread_id) {
            thread.reply_count += 1;
            thread.last_reply_at = Some(now);
            thread.last_reply_by = Some(row.author_id);
            thread.updated_at = now;
        }

        self.store.hydrate_comment(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        Ok(self.store.comments.get(&id).map(|c| c.clone()))
    }

    async fn list_for_thread(
        &self,
        thread_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<CommentView>, i64)> {
        let rows = self.thread_comments(thread_id);
        let total = rows.len() as i64;
        page_slice(rows, page)
            .into_iter()
            .map(|c| self.store.hydrate_comment(c))
            .collect::<Result<Vec<_>>>()
            .map(|views| (views, total))
    }

    async fn list_all_for_thread(&self, thread_id: Uuid) -> Result<Vec<CommentView>> {
        self.thread_comments(thread_id)
            .into_iter()
            .map(|c| self.store.hydrate_comment(c))
            .collect()
    }
}

// ── Reactions ────────────────────────────────────────────────────────────────

pub struct MemoryReactionRepo {
    store: Arc<MemoryStore>,
}

impl MemoryReactionRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    fn find_key(&self, key: &ReactionKey) -> Option<Uuid> {
        self.store
            .reactions
            .iter()
            .find(|r| {
                r.user_id == key.user_id
                    && r.target_type == key.target_type
                    && r.target_id == key.target_id
                    && r.emoji == key.emoji
            })
            .map(|r| r.id)
    }
}

#[async_trait]
impl ReactionRepo for MemoryReactionRepo {
    async fn insert(&self, key: ReactionKey) -> Result<Reaction> {
        if self.find_key(&key).is_some() {
            return Err(AppError::Conflict("Reaction already exists".into()));
        }
        let row = Reaction {
            id: Uuid::new_v4(),
            user_id: key.user_id,
            target_type: key.target_type,
            target_id: key.target_id,
            emoji: key.emoji,
            created_at: Utc::now(),
        };
        self.store.reactions.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete(&self, key: ReactionKey) -> Result<bool> {
        match self.find_key(&key) {
            Some(id) => Ok(self.store.reactions.remove(&id).is_some()),
            None => Ok(false),
        }
    }

    async fn list_for_target(
        &self,
        target_type: TargetType,
        target_id: Uuid,
    ) -> Result<Vec<ReactionRow>> {
        let mut rows: Vec<Reaction> = self
            .store
            .reactions
            .iter()
            .filter(|r| r.target_type == target_type && r.target_id == target_id)
            .map(|r| r.clone())
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        rows.into_iter()
            .map(|r| {
                let username = self.store.username_of(r.user_id)?.username;
                Ok(ReactionRow {
                    user_id: r.user_id,
                    username,
                    emoji: r.emoji,
                })
            })
            .collect()
    }
}
