//! One-shot seeding tool. Ensures the schema is migrated, the admin account
//! exists, and the starter categories are present. Safe to run repeatedly.

use anyhow::{bail, Context};
use sqlx::postgres::PgPoolOptions;

const STARTER_CATEGORIES: &[(&str, &str, &str, &str, &str, i32)] = &[
    (
        "Announcements",
        "announcements",
        "News and updates from the team",
        "#F59E0B",
        "📣",
        0,
    ),
    (
        "General Discussion",
        "general-discussion",
        "Introduce yourself and talk about anything",
        "#3B82F6",
        "💬",
        1,
    ),
    (
        "Help & Support",
        "help-support",
        "Questions, setup help and troubleshooting",
        "#10B981",
        "🛟",
        2,
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DUSK__DATABASE__URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .context("set DUSK__DATABASE__URL or DATABASE_URL")?;
    let admin_username =
        std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let admin_email =
        std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@duskforum.local".to_string());
    let Ok(admin_password) = std::env::var("ADMIN_PASSWORD") else {
        bail!("set ADMIN_PASSWORD for the seeded admin account");
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .context("connecting to Postgres")?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("running migrations")?;

    let hash = auth_adapters::password::hash_password(&admin_password)
        .context("hashing the admin password")?;
    let result = sqlx::query(
        "INSERT INTO users (username, email, password_hash, user_role) \
         VALUES ($1, $2, $3, 1) ON CONFLICT (email) DO NOTHING",
    )
    .bind(admin_username.to_lowercase())
    .bind(admin_email.to_lowercase())
    .bind(&hash)
    .execute(&pool)
    .await?;
    if result.rows_affected() > 0 {
        println!("created admin account {admin_email}");
    } else {
        println!("admin account {admin_email} already exists");
    }

    let mut created = 0;
    for (name, slug, description, color, icon, sort_order) in STARTER_CATEGORIES {
        let result = sqlx::query(
            "INSERT INTO forum_categories (name, slug, description, color, icon, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (slug) DO NOTHING",
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(color)
        .bind(icon)
        .bind(sort_order)
        .execute(&pool)
        .await?;
        created += result.rows_affected();
    }
    println!(
        "{created} of {} starter categories created",
        STARTER_CATEGORIES.len()
    );

    Ok(())
}
