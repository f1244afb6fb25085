//! In-memory [`EngagementStore`] for tests and dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{sort_newest_first, EngagementStore};
use crate::error::AppError;
use crate::models::EngagementRecord;

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, EngagementRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EngagementStore for MemoryStore {
    async fn list(&self) -> Result<Vec<EngagementRecord>, AppError> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<EngagementRecord>, AppError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn upsert(&self, record: &EngagementRecord) -> Result<(), AppError> {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.records.write().await.remove(id).is_some())
    }
}
