//! Paper store implementations for Papertrail.

pub mod in_memory;
pub mod file_backend;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use file_backend::FileStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use papertrail_config::StoreConfig;
use papertrail_core::PaperRecord;
use papertrail_core::error::StoreError;
use papertrail_core::store::PaperStore;
use std::sync::Arc;
use tracing::info;

/// Open the backend named by `config.backend`.
pub async fn open_from_config(config: &StoreConfig) -> Result<Arc<dyn PaperStore>, StoreError> {
    let store: Arc<dyn PaperStore> = match config.backend.as_str() {
        "memory" => Arc::new(InMemoryStore::new()),
        "file" => Arc::new(FileStore::new(config.resolved_path())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = config.resolved_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Storage(format!("Failed to create store directory: {e}"))
                })?;
            }
            Arc::new(SqliteStore::new(&format!("sqlite://{}", path.display())).await?)
        }
        other => {
            return Err(StoreError::Storage(format!(
                "Store backend '{other}' is not available"
            )));
        }
    };
    info!(backend = store.name(), "Paper store opened");
    Ok(store)
}

/// Newest first by `published_date`; ties keep insertion order.
pub(crate) fn sort_most_recent_first(records: &mut [PaperRecord]) {
    records.sort_by(|a, b| b.published_date.cmp(&a.published_date));
}
