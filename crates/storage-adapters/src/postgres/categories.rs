use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use domains::{AppError, CategoryRepo, ForumCategory, NewCategory, Result};

use super::{category_from_row, is_unique_violation, map_db};

pub struct PgCategoryRepo {
    pool: PgPool,
}

impl PgCategoryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepo for PgCategoryRepo {
    async fn insert(&self, category: NewCategory) -> Result<ForumCategory> {
        let row = sqlx::query(
            "INSERT INTO forum_categories (name, slug, description, color, icon, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.color.as_deref().unwrap_or("#3B82F6"))
        .bind(&category.icon)
        .bind(category.sort_order.unwrap_or(0))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Category with this slug already exists".into())
            } else {
                map_db(e)
            }
        })?;
        Ok(category_from_row(&row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ForumCategory>> {
        let row = sqlx::query("SELECT * FROM forum_categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db)?;
        Ok(row.map(|r| category_from_row(&r)))
    }

    async fn list_active(&self) -> Result<Vec<ForumCategory>> {
        let rows = sqlx::query(
            "SELECT * FROM forum_categories WHERE is_active = TRUE \
             ORDER BY sort_order ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db)?;
        Ok(rows.iter().map(category_from_row).collect())
    }
}
