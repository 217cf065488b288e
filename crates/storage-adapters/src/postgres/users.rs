use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use domains::{
    AppError, ExistsReport, NewUser, PageRequest, Result, User, UserFilter, UserRepo,
};

use super::{is_unique_violation, map_db, user_from_row, violated_constraint};

pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the WHERE clauses of the admin listing; shared by the row and
/// count queries so the total always matches the filter.
fn push_user_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    let mut prefix = " WHERE ";
    if let Some(role) = filter.role {
        qb.push(prefix).push("user_role = ").push_bind(role.code());
        prefix = " AND ";
    }
    if let Some(active) = filter.active {
        qb.push(prefix).push("is_active = ").push_bind(active);
        prefix = " AND ";
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        qb.push(prefix)
            .push("(username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn insert(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query(
            "INSERT INTO users (username, email, password_hash, user_role, is_active) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.user_role.code())
        .bind(user.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                // The probe ran before this insert; a violation here means a
                // concurrent writer won the race.
                match violated_constraint(&e).as_deref() {
                    Some(c) if c.contains("email") => {
                        AppError::Conflict("Email already registered".into())
                    }
                    Some(c) if c.contains("username") => {
                        AppError::Conflict("Username already taken".into())
                    }
                    _ => AppError::Conflict("User already exists".into()),
                }
            } else {
                map_db(e)
            }
        })?;
        Ok(user_from_row(&row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db)?;
        Ok(row.map(|r| user_from_row(&r)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db)?;
        Ok(row.map(|r| user_from_row(&r)))
    }

    async fn exists(&self, email: &str, username: &str) -> Result<ExistsReport> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1) AS email_taken, \
                    EXISTS(SELECT 1 FROM users WHERE username = $2) AS username_taken",
        )
        .bind(email)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db)?;
        Ok(ExistsReport {
            email_taken: row.get("email_taken"),
            username_taken: row.get("username_taken"),
        })
    }

    async fn set_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db)?;
        Ok(())
    }

    async fn update_username(&self, id: Uuid, username: &str) -> Result<User> {
        let row = sqlx::query(
            "UPDATE users SET username = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Username already taken".into())
            } else {
                map_db(e)
            }
        })?
        .ok_or_else(|| AppError::not_found("User", id))?;
        Ok(user_from_row(&row))
    }

    async fn list(&self, filter: UserFilter, page: PageRequest) -> Result<(Vec<User>, i64)> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) AS total FROM users");
        push_user_filters(&mut count_qb, &filter);
        let total: i64 = count_qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db)?
            .get("total");

        let mut qb = QueryBuilder::new("SELECT * FROM users");
        push_user_filters(&mut qb, &filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit_i64())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build().fetch_all(&self.pool).await.map_err(map_db)?;

        Ok((rows.iter().map(user_from_row).collect(), total))
    }
}
