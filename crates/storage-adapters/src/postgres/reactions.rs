use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use domains::{AppError, Reaction, ReactionKey, ReactionRepo, ReactionRow, Result, TargetType};

use super::{is_unique_violation, map_db, reaction_from_row};

pub struct PgReactionRepo {
    pool: PgPool,
}

impl PgReactionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReactionRepo for PgReactionRepo {
    /// The (user, target_type, target_id, emoji) unique index is the arbiter;
    /// no pre-insert existence probe, so concurrent duplicates cannot slip
    /// through.
    async fn insert(&self, key: ReactionKey) -> Result<Reaction> {
        let row = sqlx::query(
            "INSERT INTO forum_reactions (user_id, target_type, target_id, emoji) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(key.user_id)
        .bind(key.target_type.as_str())
        .bind(key.target_id)
        .bind(&key.emoji)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Reaction already exists".into())
            } else {
                map_db(e)
            }
        })?;
        Ok(reaction_from_row(&row))
    }

    async fn delete(&self, key: ReactionKey) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM forum_reactions \
             WHERE user_id = $1 AND target_type = $2 AND target_id = $3 AND emoji = $4",
        )
        .bind(key.user_id)
        .bind(key.target_type.as_str())
        .bind(key.target_id)
        .bind(&key.emoji)
        .execute(&self.pool)
        .await
        .map_err(map_db)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_target(
        &self,
        target_type: TargetType,
        target_id: Uuid,
    ) -> Result<Vec<ReactionRow>> {
        let rows = sqlx::query(
            "SELECT r.user_id, u.username, r.emoji FROM forum_reactions r \
             JOIN users u ON u.id = r.user_id \
             WHERE r.target_type = $1 AND r.target_id = $2 ORDER BY r.created_at ASC",
        )
        .bind(target_type.as_str())
        .bind(target_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db)?;

        Ok(rows
            .iter()
            .map(|row| ReactionRow {
                user_id: row.get("user_id"),
                username: row.get("username"),
                emoji: row.get("emoji"),
            })
            .collect())
    }
}
