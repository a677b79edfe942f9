use anyhow::Result;

use crate::config::Config;
use crate::db;

/// Create the content tables the CMS materializes into. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Localized page content, one row per (key, locale)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_entries (
            key TEXT NOT NULL,
            locale TEXT NOT NULL,
            value_json TEXT NOT NULL,
            url TEXT,
            updated_at INTEGER,
            PRIMARY KEY (key, locale)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Hotel listings, one row per (slug, locale)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hotels (
            slug TEXT NOT NULL,
            locale TEXT NOT NULL,
            data_json TEXT NOT NULL,
            url TEXT,
            updated_at INTEGER,
            PRIMARY KEY (slug, locale)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
