//! # Forum Content Service
//!
//! Validation and persistence rules for categories, threads, comments, and
//! reactions. All storage access goes through the repo ports; counter updates
//! and uniqueness are delegated to the store so they hold under concurrency.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use domains::{
    AppError, CategoryRepo, Comment, CommentRepo, CommentView, ForumCategory, NewCategory,
    NewComment, NewThread, PageRequest, Pagination, Reaction, ReactionGroup, ReactionKey,
    ReactionRepo, Result, TargetType, ThreadFilter, ThreadPatch, ThreadRepo, ThreadSummary,
};

use crate::validation;

pub const DEFAULT_CATEGORY_COLOR: &str = "#3B82F6";
pub const THREADS_PAGE_SIZE: u32 = 20;
pub const COMMENTS_PAGE_SIZE: u32 = 50;

pub struct ForumService {
    categories: Arc<dyn CategoryRepo>,
    threads: Arc<dyn ThreadRepo>,
    comments: Arc<dyn CommentRepo>,
    reactions: Arc<dyn ReactionRepo>,
}

impl ForumService {
    pub fn new(
        categories: Arc<dyn CategoryRepo>,
        threads: Arc<dyn ThreadRepo>,
        comments: Arc<dyn CommentRepo>,
        reactions: Arc<dyn ReactionRepo>,
    ) -> Self {
        Self {
            categories,
            threads,
            comments,
            reactions,
        }
    }

    // ── Categories ───────────────────────────────────────────────────────────

    /// Active categories in display order.
    pub async fn list_categories(&self) -> Result<Vec<ForumCategory>> {
        self.categories.list_active().await
    }

    /// Creates a category. Slug uniqueness is enforced by the store; a
    /// collision surfaces as Conflict.
    pub async fn create_category(&self, input: NewCategory) -> Result<ForumCategory> {
        if input.name.trim().is_empty() || input.slug.trim().is_empty() {
            return Err(AppError::validation("Name and slug are required"));
        }
        let category = NewCategory {
            color: input.color.or_else(|| Some(DEFAULT_CATEGORY_COLOR.to_string())),
            sort_order: input.sort_order.or(Some(0)),
            ..input
        };
        self.categories.insert(category).await
    }

    // ── Threads ──────────────────────────────────────────────────────────────

    /// Page of unlocked threads under the given filter, with page metadata
    /// computed from the total under the same filter.
    pub async fn list_threads(
        &self,
        filter: ThreadFilter,
        page: PageRequest,
    ) -> Result<(Vec<ThreadSummary>, Pagination)> {
        let (rows, total) = self.threads.list(filter, page).await?;
        Ok((rows, Pagination::new(&page, total)))
    }

    pub async fn create_thread(&self, input: NewThread) -> Result<ThreadSummary> {
        validation::thread_title(&input.title)?;
        validation::thread_content(&input.content)?;
        self.require_active_category(input.category_id).await?;
        let thread = self.threads.insert(input).await?;
        debug!(thread_id = %thread.thread.id, "thread created");
        Ok(thread)
    }

    /// Thread detail: the hydrated thread plus every comment, oldest first.
    /// Fetching counts as a view; the returned row carries the incremented
    /// count. Locked or absent threads are both a miss.
    pub async fn get_thread(&self, id: Uuid) -> Result<(ThreadSummary, Vec<CommentView>)> {
        let thread = self
            .threads
            .fetch_and_touch(id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", id))?;
        let comments = self.comments.list_all_for_thread(id).await?;
        Ok((thread, comments))
    }

    /// Updates title, content, and optionally the category. A replacement
    /// category is re-validated; the existing one is not.
    pub async fn update_thread(&self, id: Uuid, patch: ThreadPatch) -> Result<ThreadSummary> {
        validation::thread_title(&patch.title)?;
        validation::thread_content(&patch.content)?;
        if let Some(category_id) = patch.category_id {
            self.require_active_category(category_id).await?;
        }
        self.threads
            .update(id, patch)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", id))
    }

    /// Deletes the thread and, by cascade, its comments and reactions.
    /// Removal of an absent thread is not an error.
    pub async fn delete_thread(&self, id: Uuid) -> Result<()> {
        let deleted = self.threads.delete(id).await?;
        debug!(thread_id = %id, deleted, "thread delete");
        Ok(())
    }

    /// Missing and inactive categories are deliberately indistinguishable to
    /// the caller.
    async fn require_active_category(&self, id: Uuid) -> Result<()> {
        let active = self
            .categories
            .find_by_id(id)
            .await?
            .map(|c| c.is_active)
            .unwrap_or(false);
        if active {
            Ok(())
        } else {
            Err(AppError::not_found("Category", id))
        }
    }

    // ── Comments ─────────────────────────────────────────────────────────────

    /// Chronological page of a thread's comments.
    pub async fn list_comments(
        &self,
        thread_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<CommentView>, Pagination)> {
        let (rows, total) = self.comments.list_for_thread(thread_id, page).await?;
        Ok((rows, Pagination::new(&page, total)))
    }

    /// Creates a comment. The thread must exist and be unlocked; a parent,
    /// when given, must belong to the same thread. The store advances the
    /// thread's reply counters in the same transaction as the insert.
    pub async fn create_comment(&self, input: NewComment) -> Result<CommentView> {
        validation::comment_content(&input.content)?;

        let thread = self
            .threads
            .find_by_id(input.thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread", input.thread_id))?;
        if thread.is_locked {
            return Err(AppError::Forbidden("Cannot comment on locked thread".into()));
        }

        if let Some(parent_id) = input.parent_id {
            self.require_parent_in_thread(parent_id, input.thread_id).await?;
        }

        self.comments.insert(input).await
    }

    async fn require_parent_in_thread(&self, parent_id: Uuid, thread_id: Uuid) -> Result<()> {
        match self.comments.find_by_id(parent_id).await? {
            Some(Comment { thread_id: t, .. }) if t == thread_id => Ok(()),
            _ => Err(AppError::not_found("Parent comment", parent_id)),
        }
    }

    // ── Reactions ────────────────────────────────────────────────────────────

    /// Adds a reaction. A second identical (user, target, emoji) tuple is a
    /// Conflict, never a silent no-op.
    pub async fn react(&self, key: ReactionKey) -> Result<Reaction> {
        validation::emoji(&key.emoji)?;
        self.reactions.insert(key).await
    }

    /// Removes a reaction if present; absence is not an error.
    pub async fn unreact(&self, key: ReactionKey) -> Result<()> {
        let removed = self.reactions.delete(key).await?;
        debug!(removed, "reaction removal");
        Ok(())
    }

    /// Reactions on a target grouped by emoji, in order of first appearance.
    /// The group always spans every user's reactions; only the `userReacted`
    /// flag depends on who is asking.
    pub async fn get_reactions(
        &self,
        target_type: TargetType,
        target_id: Uuid,
        requesting_user: Option<Uuid>,
    ) -> Result<Vec<ReactionGroup>> {
        let rows = self.reactions.list_for_target(target_type, target_id).await?;

        let mut groups: Vec<ReactionGroup> = Vec::new();
        for row in rows {
            let reacted = requesting_user == Some(row.user_id);
            match groups.iter_mut().find(|g| g.emoji == row.emoji) {
                Some(group) => {
                    group.count += 1;
                    group.users.push(row.username);
                    group.user_reacted |= reacted;
                }
                None => groups.push(ReactionGroup {
                    emoji: row.emoji,
                    count: 1,
                    users: vec![row.username],
                    user_reacted: reacted,
                }),
            }
        }
        Ok(groups)
    }
}
