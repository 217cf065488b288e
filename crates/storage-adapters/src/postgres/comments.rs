use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use domains::{Comment, CommentRepo, CommentView, NewComment, PageRequest, Result};

use super::{comment_from_row, comment_view_from_row, map_db};

const VIEW_COLUMNS: &str = "cm.*, \
    a.username AS author_username, e.username AS editor_username";

const VIEW_JOINS: &str = "JOIN users a ON a.id = cm.author_id \
    LEFT JOIN users e ON e.id = cm.edited_by";

pub struct PgCommentRepo {
    pool: PgPool,
}

impl PgCommentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepo for PgCommentRepo {
    /// One transaction covers the insert, the reply-counter bump, and the
    /// hydrated read-back, so a thread can never show a comment its counters
    /// don't know about.
    async fn insert(&self, comment: NewComment) -> Result<CommentView> {
        let mut tx = self.pool.begin().await.map_err(map_db)?;

        let inserted = sqlx::query(
            "INSERT INTO forum_comments (thread_id, author_id, parent_id, content) \
             VALUES ($1, $2, $3, $4) RETURNING id, created_at",
        )
        .bind(comment.thread_id)
        .bind(comment.author_id)
        .bind(comment.parent_id)
        .bind(&comment.content)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db)?;
        let comment_id: Uuid = inserted.get("id");
        let created_at: chrono::DateTime<chrono::Utc> = inserted.get("created_at");

        sqlx::query(
            "UPDATE forum_threads SET reply_count = reply_count + 1, \
             last_reply_at = $2, last_reply_by = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(comment.thread_id)
        .bind(created_at)
        .bind(comment.author_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db)?;

        let sql = format!(
            "SELECT {VIEW_COLUMNS} FROM forum_comments cm {VIEW_JOINS} WHERE cm.id = $1"
        );
        let row = sqlx::query(&sql)
            .bind(comment_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db)?;

        tx.commit().await.map_err(map_db)?;
        Ok(comment_view_from_row(&row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        let row = sqlx::query("SELECT * FROM forum_comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db)?;
        Ok(row.map(|r| comment_from_row(&r)))
    }

    async fn list_for_thread(
        &self,
        thread_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<CommentView>, i64)> {
        let total: i64 =
            sqlx::query("SELECT COUNT(*) AS total FROM forum_comments WHERE thread_id = $1")
                .bind(thread_id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_db)?
                .get("total");

        let sql = format!(
            "SELECT {VIEW_COLUMNS} FROM forum_comments cm {VIEW_JOINS} \
             WHERE cm.thread_id = $1 ORDER BY cm.created_at ASC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(thread_id)
            .bind(page.limit_i64())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(map_db)?;

        Ok((rows.iter().map(comment_view_from_row).collect(), total))
    }

    async fn list_all_for_thread(&self, thread_id: Uuid) -> Result<Vec<CommentView>> {
        let sql = format!(
            "SELECT {VIEW_COLUMNS} FROM forum_comments cm {VIEW_JOINS} \
             WHERE cm.thread_id = $1 ORDER BY cm.created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db)?;
        Ok(rows.iter().map(comment_view_from_row).collect())
    }
}
