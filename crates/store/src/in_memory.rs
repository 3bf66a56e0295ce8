//! In-memory store, useful for testing and ephemeral sessions.

use async_trait::async_trait;
use papertrail_core::PaperRecord;
use papertrail_core::error::StoreError;
use papertrail_core::paper::MetadataUpdate;
use papertrail_core::store::{PaperStore, in_topic_range};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A store that keeps papers in a Vec.
pub struct InMemoryStore {
    records: Arc<RwLock<Vec<PaperRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Seed a store with records, in order.
    pub fn with_records(records: Vec<PaperRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaperStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get_by_topic_and_range(
        &self,
        topic: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<PaperRecord>, StoreError> {
        let records = self.records.read().await;
        let mut matches: Vec<PaperRecord> = records
            .iter()
            .filter(|r| in_topic_range(r, topic, start_year, end_year))
            .cloned()
            .collect();
        crate::sort_most_recent_first(&mut matches);
        Ok(matches)
    }

    async fn get_by_title(&self, title: &str) -> Result<Option<PaperRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.title == title).cloned())
    }

    async fn insert(&self, record: PaperRecord) -> Result<(), StoreError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn update_metadata(&self, title: &str, update: MetadataUpdate) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let mut matched = false;
        for record in records.iter_mut().filter(|r| r.title == title) {
            update.apply(record);
            matched = true;
        }
        Ok(matched)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.len())
    }
}
