use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use domains::{
    NewThread, PageRequest, Result, Thread, ThreadFilter, ThreadPatch, ThreadRepo, ThreadSummary,
};

use super::{map_db, thread_from_row, thread_summary_from_row};

/// Join projection shared by every hydrated thread query. The driving table
/// must be aliased `t`.
const SUMMARY_COLUMNS: &str = "t.*, \
    c.name AS category_name, c.slug AS category_slug, c.color AS category_color, \
    a.username AS author_username, lr.username AS last_reply_username";

const SUMMARY_JOINS: &str = "JOIN forum_categories c ON c.id = t.category_id \
    JOIN users a ON a.id = t.author_id \
    LEFT JOIN users lr ON lr.id = t.last_reply_by";

pub struct PgThreadRepo {
    pool: PgPool,
}

impl PgThreadRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends listing filters. Locked threads are excluded unconditionally, so
/// the clause chain always starts with a WHERE.
fn push_thread_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ThreadFilter) {
    qb.push(" WHERE t.is_locked = FALSE");
    if let Some(category_id) = filter.category_id {
        qb.push(" AND t.category_id = ").push_bind(category_id);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        qb.push(" AND (t.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.content ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl ThreadRepo for PgThreadRepo {
    async fn insert(&self, thread: NewThread) -> Result<ThreadSummary> {
        let sql = format!(
            "WITH t AS (\
                INSERT INTO forum_threads (title, content, category_id, author_id) \
                VALUES ($1, $2, $3, $4) RETURNING *\
             ) SELECT {SUMMARY_COLUMNS} FROM t {SUMMARY_JOINS}"
        );
        let row = sqlx::query(&sql)
            .bind(&thread.title)
            .bind(&thread.content)
            .bind(thread.category_id)
            .bind(thread.author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db)?;
        Ok(thread_summary_from_row(&row))
    }

    async fn list(
        &self,
        filter: ThreadFilter,
        page: PageRequest,
    ) -> Result<(Vec<ThreadSummary>, i64)> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) AS total FROM forum_threads t");
        push_thread_filters(&mut count_qb, &filter);
        let total: i64 = count_qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db)?
            .get("total");

        let mut qb = QueryBuilder::new(format!(
            "SELECT {SUMMARY_COLUMNS} FROM forum_threads t {SUMMARY_JOINS}"
        ));
        push_thread_filters(&mut qb, &filter);
        // Sort column and direction come from closed enums, never raw input.
        qb.push(format!(
            " ORDER BY t.{} {}",
            filter.sort_by.column(),
            filter.sort_order.keyword()
        ));
        qb.push(" LIMIT ")
            .push_bind(page.limit_i64())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build().fetch_all(&self.pool).await.map_err(map_db)?;

        Ok((rows.iter().map(thread_summary_from_row).collect(), total))
    }

    async fn fetch_and_touch(&self, id: Uuid) -> Result<Option<ThreadSummary>> {
        // Increment and read in one statement so concurrent fetches never
        // lose a count; the row comes back with the post-increment value.
        let sql = format!(
            "WITH t AS (\
                UPDATE forum_threads SET view_count = view_count + 1 \
                WHERE id = $1 AND is_locked = FALSE RETURNING *\
             ) SELECT {SUMMARY_COLUMNS} FROM t {SUMMARY_JOINS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db)?;
        Ok(row.map(|r| thread_summary_from_row(&r)))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Thread>> {
        let row = sqlx::query("SELECT * FROM forum_threads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db)?;
        Ok(row.map(|r| thread_from_row(&r)))
    }

    async fn update(&self, id: Uuid, patch: ThreadPatch) -> Result<Option<ThreadSummary>> {
        let sql = format!(
            "WITH t AS (\
                UPDATE forum_threads \
                SET title = $2, content = $3, \
                    category_id = COALESCE($4, category_id), \
                    updated_at = NOW() \
                WHERE id = $1 RETURNING *\
             ) SELECT {SUMMARY_COLUMNS} FROM t {SUMMARY_JOINS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&patch.title)
            .bind(&patch.content)
            .bind(patch.category_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db)?;
        Ok(row.map(|r| thread_summary_from_row(&r)))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        // Reactions reference targets polymorphically, so no FK cascades
        // cover them; sweep both kinds in the thread's transaction.
        let mut tx = self.pool.begin().await.map_err(map_db)?;

        sqlx::query(
            "DELETE FROM forum_reactions WHERE target_type = 'comment' AND target_id IN \
             (SELECT id FROM forum_comments WHERE thread_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_db)?;

        sqlx::query("DELETE FROM forum_reactions WHERE target_type = 'thread' AND target_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db)?;

        let result = sqlx::query("DELETE FROM forum_threads WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db)?;

        tx.commit().await.map_err(map_db)?;
        Ok(result.rows_affected() > 0)
    }
}
