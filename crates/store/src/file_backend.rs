//! File-based store: persistent JSON-lines storage.
//!
//! Each line is a JSON-encoded `PaperRecord`. Records are loaded into memory
//! on creation and the whole file is rewritten on every mutation.
//!
//! Storage location: `~/.papertrail/papers.jsonl`

use async_trait::async_trait;
use papertrail_core::PaperRecord;
use papertrail_core::error::StoreError;
use papertrail_core::paper::MetadataUpdate;
use papertrail_core::store::{PaperStore, in_topic_range};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A file-backed paper store using JSONL (one record per line).
pub struct FileStore {
    path: PathBuf,
    records: Arc<RwLock<Vec<PaperRecord>>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file starts empty and is created
    /// on first write.
    pub fn new(path: PathBuf) -> Self {
        let records = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = records.len(), "File paper store loaded");
        Self {
            path,
            records: Arc::new(RwLock::new(records)),
        }
    }

    fn load_from_disk(path: &Path) -> Vec<PaperRecord> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<PaperRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted paper record");
                    None
                }
            })
            .collect()
    }

    /// Write `records` to disk as JSONL. Callers commit to memory only after
    /// this succeeds.
    fn write_all(&self, records: &[PaperRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("Failed to create store directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for record in records {
            let line = serde_json::to_string(record).map_err(|e| {
                StoreError::Storage(format!("Failed to serialize paper record: {e}"))
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(&self.path, &content)
            .map_err(|e| StoreError::Storage(format!("Failed to write store file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl PaperStore for FileStore {
    fn name(&self) -> &str {
        "file"
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
        let mut records = self.records.write().await;
        records.push(record);
        if let Err(e) = self.write_all(&records) {
            records.pop();
            return Err(e);
        }
        Ok(())
    }

    async fn update_metadata(&self, title: &str, update: MetadataUpdate) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let mut next = records.clone();
        let mut matched = false;
        for record in next.iter_mut().filter(|r| r.title == title) {
            update.apply(record);
            matched = true;
        }
        if matched {
            self.write_all(&next)?;
            *records = next;
        }
        Ok(matched)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn paper(title: &str, date: &str) -> PaperRecord {
        PaperRecord::new(title, vec!["Grace Hopper".into()], "Compilers.", date).with_topic("pl")
    }

    #[tokio::test]
    async fn insert_persists_across_reopen() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);

        let store = FileStore::new(path.clone());
        store.insert(paper("A-0 System", "2021-05-03")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("A-0 System"));
        assert!(content.contains("\"abstract\""));

        let reopened = FileStore::new(path);
        let record = reopened.get_by_title("A-0 System").await.unwrap().unwrap();
        assert_eq!(record.authors, vec!["Grace Hopper".to_string()]);
        assert_eq!(record.topic, "pl");
    }

    #[tokio::test]
    async fn update_metadata_persists() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);

        let store = FileStore::new(path.clone());
        store.insert(paper("COBOL", "2022-01-01")).await.unwrap();
        let update = MetadataUpdate {
            abstract_text: Some("Business-oriented language.".into()),
            ..Default::default()
        };
        assert!(store.update_metadata("COBOL", update).await.unwrap());

        let reopened = FileStore::new(path);
        let record = reopened.get_by_title("COBOL").await.unwrap().unwrap();
        assert_eq!(record.abstract_text, "Business-oriented language.");
    }

    #[tokio::test]
    async fn range_query_is_most_recent_first() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);

        let store = FileStore::new(path);
        store.insert(paper("older", "2021-01-01")).await.unwrap();
        store.insert(paper("newer", "2023-01-01")).await.unwrap();
        store.insert(paper("ancient", "1999-01-01")).await.unwrap();

        let results = store.get_by_topic_and_range("pl", 2020, 2025).await.unwrap();
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn handles_missing_file_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nothing-here.jsonl"));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_insert_leaves_no_record_behind() {
        // The parent of the store path is a regular file, so writes fail.
        let blocker = NamedTempFile::new().unwrap();
        let store = FileStore::new(blocker.path().join("papers.jsonl"));

        let result = store.insert(paper("Ghost", "2024-01-01")).await;
        assert!(matches!(result, Err(StoreError::Storage(_))));
        assert!(store.get_by_title("Ghost").await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_update_keeps_previous_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        let store = FileStore::new(sub.join("papers.jsonl"));
        store.insert(paper("Fortran", "2022-01-01")).await.unwrap();

        // Swap the store directory for a regular file so the next write fails.
        std::fs::remove_dir_all(&sub).unwrap();
        std::fs::write(&sub, "not a directory").unwrap();

        let update = MetadataUpdate {
            abstract_text: Some("Formula translation.".into()),
            ..Default::default()
        };
        assert!(store.update_metadata("Fortran", update).await.is_err());

        let record = store.get_by_title("Fortran").await.unwrap().unwrap();
        assert_eq!(record.abstract_text, "Compilers.");
    }

    #[tokio::test]
    async fn skips_corrupted_lines() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, r#"{{"title":"valid","authors":["X"],"abstract":"a","published_date":"2024-01-01"}}"#).unwrap();
        writeln!(tmp, "this is not json").unwrap();
        writeln!(tmp, r#"{{"title":"also valid","published_date":"2023-01-01","url":"u","topic":"t"}}"#).unwrap();

        let store = FileStore::new(tmp.path().to_path_buf());
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
