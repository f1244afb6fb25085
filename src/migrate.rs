use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the engagement schema. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS engagements (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            company_name TEXT NOT NULL DEFAULT '',
            industry TEXT NOT NULL DEFAULT '',
            business_context TEXT NOT NULL DEFAULT '',
            current_challenges TEXT NOT NULL DEFAULT '',
            strategic_goals TEXT NOT NULL DEFAULT '',
            technical_landscape TEXT NOT NULL DEFAULT '',
            constraints TEXT NOT NULL DEFAULT '',
            timeline TEXT NOT NULL DEFAULT '',
            budget TEXT NOT NULL DEFAULT '',
            artifacts_json TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_engagements_created_at ON engagements(created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
