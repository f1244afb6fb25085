//! Engagement persistence.
//!
//! The [`EngagementStore`] trait covers the four operations the application
//! needs: list (newest first), get, upsert by id, and delete by id.
//! Backends:
//!
//! - [`SqliteStore`]: local SQLite file (default).
//! - [`RestStore`]: a PostgREST table, e.g. a hosted Supabase project.
//! - [`MemoryStore`]: process-local, for tests and dry runs.
//!
//! All errors surface as [`AppError::Persistence`].

pub mod memory;
pub mod rest;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, StoreBackend, STORE_KEY_ENV};
use crate::error::AppError;
use crate::models::EngagementRecord;

pub use memory::MemoryStore;
pub use rest::RestStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// All engagements, most recent `created_at` first.
    async fn list(&self) -> Result<Vec<EngagementRecord>, AppError>;

    async fn get(&self, id: &str) -> Result<Option<EngagementRecord>, AppError>;

    /// Insert or replace the record with `record.id`.
    async fn upsert(&self, record: &EngagementRecord) -> Result<(), AppError>;

    /// Returns `false` when nothing had that id.
    async fn delete(&self, id: &str) -> Result<bool, AppError>;
}

/// Build the store selected by `[store] backend`.
pub async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn EngagementStore>> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(&config.db.path).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Rest => {
            let url = config
                .store
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("store.url required for the rest backend"))?;
            let key = std::env::var(STORE_KEY_ENV)
                .map_err(|_| anyhow::anyhow!("{} not set", STORE_KEY_ENV))?;
            Ok(Arc::new(RestStore::new(url, &config.store.table, &key)?))
        }
    }
}

/// Ordering shared by every backend: newest first, ties broken by id.
pub(crate) fn sort_newest_first(records: &mut [EngagementRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}
