//! Client-side view of the engagement store.
//!
//! The cache never patches its list locally: every successful save or
//! delete is followed by a full refetch, so the list always reflects what
//! the store returned last.

use std::sync::Arc;

use crate::error::AppError;
use crate::models::EngagementRecord;
use crate::store::EngagementStore;

pub struct EngagementCache {
    store: Arc<dyn EngagementStore>,
    engagements: Vec<EngagementRecord>,
}

impl EngagementCache {
    pub fn new(store: Arc<dyn EngagementStore>) -> Self {
        Self {
            store,
            engagements: Vec::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn EngagementStore> {
        &self.store
    }

    /// The list as of the last successful refresh, newest first.
    pub fn engagements(&self) -> &[EngagementRecord] {
        &self.engagements
    }

    pub fn find(&self, id: &str) -> Option<&EngagementRecord> {
        self.engagements.iter().find(|e| e.id == id)
    }

    /// Replace the list with the store's. On failure the previous list is kept.
    pub async fn refresh(&mut self) -> Result<&[EngagementRecord], AppError> {
        let engagements = self.store.list().await?;
        tracing::debug!(count = engagements.len(), "engagement list refreshed");
        self.engagements = engagements;
        Ok(&self.engagements)
    }

    /// Upsert then refetch. Once the upsert succeeds the save counts, even
    /// if the refetch fails; the stale list is kept until the next refresh.
    pub async fn save(&mut self, record: &EngagementRecord) -> Result<(), AppError> {
        self.store.upsert(record).await?;
        self.refresh_after_write().await;
        Ok(())
    }

    /// Returns whether a record was removed.
    pub async fn delete(&mut self, id: &str) -> Result<bool, AppError> {
        let removed = self.store.delete(id).await?;
        self.refresh_after_write().await;
        Ok(removed)
    }

    async fn refresh_after_write(&mut self) {
        if let Err(e) = self.refresh().await.map(|_| ()) {
            tracing::warn!(error = %e, "reloading engagements after write failed");
        }
    }
}
