//! Paper store trait: the keyed record repository behind the pipeline.
//!
//! The synthesis core only reads (`get_by_topic_and_range`, `get_by_title`);
//! `insert` is used by discovery and `update_metadata` by maintenance paths.

use async_trait::async_trait;
use crate::error::StoreError;
use crate::paper::{MetadataUpdate, PaperRecord};

/// The core PaperStore trait.
///
/// Implementations: in-memory (testing), JSON-lines file, SQLite.
#[async_trait]
pub trait PaperStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "file", "in_memory").
    fn name(&self) -> &str;

    /// Records for `topic` published within `[start_year, end_year]`,
    /// most recent first.
    async fn get_by_topic_and_range(
        &self,
        topic: &str,
        start_year: i32,
        end_year: i32,
    ) -> std::result::Result<Vec<PaperRecord>, StoreError>;

    /// The first record with exactly this title, if any.
    async fn get_by_title(&self, title: &str) -> std::result::Result<Option<PaperRecord>, StoreError>;

    /// Store a new record.
    async fn insert(&self, record: PaperRecord) -> std::result::Result<(), StoreError>;

    /// Apply a partial update to every record with this title.
    /// Returns `true` if any record matched.
    async fn update_metadata(
        &self,
        title: &str,
        update: MetadataUpdate,
    ) -> std::result::Result<bool, StoreError>;

    /// Total record count.
    async fn count(&self) -> std::result::Result<usize, StoreError>;
}

/// Whether `record` falls in the topic/year window used by
/// [`PaperStore::get_by_topic_and_range`]. Records with unparseable dates
/// never match.
pub fn in_topic_range(record: &PaperRecord, topic: &str, start_year: i32, end_year: i32) -> bool {
    record.topic == topic
        && record
            .published_year()
            .is_some_and(|year| year >= start_year && year <= end_year)
}
