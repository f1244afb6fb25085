//! SQLite-backed [`EngagementStore`].
//!
//! One row per engagement; the artifact bundle is stored as JSON text and
//! `created_at` as RFC 3339 with fixed microsecond precision so that
//! lexical order matches chronological order.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::EngagementStore;
use crate::error::AppError;
use crate::models::{ArtifactBundle, EngagementRecord};
use crate::{db, migrate};

const COLUMNS: &str = "id, created_at, company_name, industry, business_context, \
     current_challenges, strategic_goals, technical_landscape, constraints, \
     timeline, budget, artifacts_json";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database file and make sure the schema exists.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        let pool = db::connect_path(path).await?;
        migrate::apply(&pool).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn record_from_row(row: &SqliteRow) -> Result<EngagementRecord, AppError> {
    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| AppError::Persistence(format!("bad created_at '{}': {}", created_at, e)))?
        .with_timezone(&Utc);

    let artifacts_json: Option<String> = row.try_get("artifacts_json")?;
    let artifacts = artifacts_json
        .as_deref()
        .map(serde_json::from_str::<ArtifactBundle>)
        .transpose()
        .map_err(|e| AppError::Persistence(format!("bad artifacts JSON: {}", e)))?;

    Ok(EngagementRecord {
        id: row.try_get("id")?,
        created_at,
        company_name: row.try_get("company_name")?,
        industry: row.try_get("industry")?,
        business_context: row.try_get("business_context")?,
        current_challenges: row.try_get("current_challenges")?,
        strategic_goals: row.try_get("strategic_goals")?,
        technical_landscape: row.try_get("technical_landscape")?,
        constraints: row.try_get("constraints")?,
        timeline: row.try_get("timeline")?,
        budget: row.try_get("budget")?,
        artifacts,
    })
}

#[async_trait]
impl EngagementStore for SqliteStore {
    async fn list(&self) -> Result<Vec<EngagementRecord>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM engagements ORDER BY created_at DESC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<EngagementRecord>, AppError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM engagements WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn upsert(&self, record: &EngagementRecord) -> Result<(), AppError> {
        let artifacts_json = record
            .artifacts
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO engagements (
                id, created_at, company_name, industry, business_context,
                current_challenges, strategic_goals, technical_landscape,
                constraints, timeline, budget, artifacts_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                created_at = excluded.created_at,
                company_name = excluded.company_name,
                industry = excluded.industry,
                business_context = excluded.business_context,
                current_challenges = excluded.current_challenges,
                strategic_goals = excluded.strategic_goals,
                technical_landscape = excluded.technical_landscape,
                constraints = excluded.constraints,
                timeline = excluded.timeline,
                budget = excluded.budget,
                artifacts_json = excluded.artifacts_json
            "#,
        )
        .bind(&record.id)
        .bind(format_timestamp(&record.created_at))
        .bind(&record.company_name)
        .bind(&record.industry)
        .bind(&record.business_context)
        .bind(&record.current_challenges)
        .bind(&record.strategic_goals)
        .bind(&record.technical_landscape)
        .bind(&record.constraints)
        .bind(&record.timeline)
        .bind(&record.budget)
        .bind(artifacts_json)
        .execute(&self.pool)
        .await?;

        tracing::debug!(id = %record.id, "engagement upserted");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM engagements WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
