//! SQLite paper store.
//!
//! One `papers` table; authors are stored as a JSON array. Topic/year
//! filtering runs in SQL on `topic` and in Rust on the parsed year so every
//! backend applies the same window rules.

use async_trait::async_trait;
use papertrail_core::PaperRecord;
use papertrail_core::error::StoreError;
use papertrail_core::paper::MetadataUpdate;
use papertrail_core::store::{PaperStore, in_topic_range};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url`, e.g. `sqlite:///home/me/.papertrail/papers.db`.
    ///
    /// The schema is created automatically.
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite paper store initialized at {url}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS papers (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                title          TEXT NOT NULL,
                authors        TEXT NOT NULL DEFAULT '[]',
                abstract       TEXT NOT NULL DEFAULT '',
                published_date TEXT NOT NULL DEFAULT '',
                url            TEXT NOT NULL DEFAULT '',
                topic          TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("papers table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_papers_title ON papers(title)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("title index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_papers_topic_date ON papers(topic, published_date DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("topic index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<PaperRecord, StoreError> {
        let column = |name: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{name} column: {e}"));

        let title: String = row.try_get("title").map_err(|e| column("title", e))?;
        let authors_json: String = row.try_get("authors").map_err(|e| column("authors", e))?;
        let abstract_text: String = row.try_get("abstract").map_err(|e| column("abstract", e))?;
        let published_date: String = row
            .try_get("published_date")
            .map_err(|e| column("published_date", e))?;
        let url: String = row.try_get("url").map_err(|e| column("url", e))?;
        let topic: String = row.try_get("topic").map_err(|e| column("topic", e))?;

        let authors: Vec<String> = serde_json::from_str(&authors_json)
            .map_err(|e| StoreError::QueryFailed(format!("authors column for '{title}': {e}")))?;

        Ok(PaperRecord {
            title,
            authors,
            abstract_text,
            published_date,
            url,
            topic,
        })
    }

    fn authors_json(authors: &[String]) -> Result<String, StoreError> {
        serde_json::to_string(authors)
            .map_err(|e| StoreError::Storage(format!("Authors serialization: {e}")))
    }
}

#[async_trait]
impl PaperStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get_by_topic_and_range(
        &self,
        topic: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<PaperRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM papers WHERE topic = ?1 ORDER BY published_date DESC, id ASC",
        )
        .bind(topic)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Topic range: {e}")))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let record = Self::row_to_record(row)?;
            if in_topic_range(&record, topic, start_year, end_year) {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn get_by_title(&self, title: &str) -> Result<Option<PaperRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM papers WHERE title = ?1 ORDER BY id ASC LIMIT 1")
            .bind(title)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET by title: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_record(r)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, record: PaperRecord) -> Result<(), StoreError> {
        let authors = Self::authors_json(&record.authors)?;

        sqlx::query(
            r#"
            INSERT INTO papers (title, authors, abstract, published_date, url, topic)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&record.title)
        .bind(&authors)
        .bind(&record.abstract_text)
        .bind(&record.published_date)
        .bind(&record.url)
        .bind(&record.topic)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT failed: {e}")))?;

        debug!(title = %record.title, "Stored paper");
        Ok(())
    }

    async fn update_metadata(&self, title: &str, update: MetadataUpdate) -> Result<bool, StoreError> {
        let rows = sqlx::query("SELECT * FROM papers WHERE title = ?1")
            .bind(title)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Update lookup: {e}")))?;

        if rows.is_empty() {
            return Ok(false);
        }

        for row in &rows {
            let id: i64 = row
                .try_get("id")
                .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
            let mut record = Self::row_to_record(row)?;
            update.apply(&mut record);
            let authors = Self::authors_json(&record.authors)?;

            sqlx::query(
                r#"
                UPDATE papers
                SET authors = ?1, abstract = ?2, published_date = ?3, url = ?4, topic = ?5
                WHERE id = ?6
                "#,
            )
            .bind(&authors)
            .bind(&record.abstract_text)
            .bind(&record.published_date)
            .bind(&record.url)
            .bind(&record.topic)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("UPDATE failed: {e}")))?;
        }

        debug!(title, updated = rows.len(), "Updated paper metadata");
        Ok(true)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM papers")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store(dir: &tempfile::TempDir) -> SqliteStore {
        let url = format!("sqlite://{}", dir.path().join("papers.db").display());
        SqliteStore::new(&url).await.unwrap()
    }

    fn paper(title: &str, date: &str) -> PaperRecord {
        PaperRecord::new(
            title,
            vec!["Yoshua Bengio".into(), "Aaron Courville".into()],
            "Representation learning.",
            date,
        )
        .with_topic("deep learning")
        .with_url("http://arxiv.org/pdf/1206.5538v3")
    }

    #[tokio::test]
    async fn insert_and_get_by_title() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        store.insert(paper("Representation Learning", "2022-04-23")).await.unwrap();

        let record = store.get_by_title("Representation Learning").await.unwrap().unwrap();
        assert_eq!(record.authors.len(), 2);
        assert_eq!(record.url, "http://arxiv.org/pdf/1206.5538v3");
        assert!(store.get_by_title("Nope").await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn topic_range_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        store.insert(paper("mid", "2022-01-01")).await.unwrap();
        store.insert(paper("new", "2024-09-30T08:00:00")).await.unwrap();
        store.insert(paper("too old", "2001-01-01")).await.unwrap();
        store.insert(paper("bad date", "n/a")).await.unwrap();

        let results = store.get_by_topic_and_range("deep learning", 2020, 2025).await.unwrap();
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid"]);

        let other = store.get_by_topic_and_range("biology", 2020, 2025).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn update_metadata_rewrites_matching_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        store.insert(paper("Dup", "2022-01-01")).await.unwrap();
        store.insert(paper("Dup", "2023-01-01")).await.unwrap();

        let update = MetadataUpdate {
            authors: Some(vec!["Solo Author".into()]),
            ..Default::default()
        };
        assert!(store.update_metadata("Dup", update.clone()).await.unwrap());
        assert!(!store.update_metadata("Missing", update).await.unwrap());

        let results = store.get_by_topic_and_range("deep learning", 2020, 2025).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.authors == vec!["Solo Author".to_string()]));
    }

    #[tokio::test]
    async fn reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = test_store(&dir).await;
            store.insert(paper("Persistent", "2023-01-01")).await.unwrap();
        }
        let store = test_store(&dir).await;
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn corrupt_authors_column_is_query_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        store.insert(paper("Mangled", "2023-01-01")).await.unwrap();

        sqlx::query("UPDATE papers SET authors = 'not json' WHERE title = ?")
            .bind("Mangled")
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.get_by_title("Mangled").await.unwrap_err();
        assert!(matches!(err, StoreError::QueryFailed(_)));
        assert!(err.to_string().contains("Mangled"));
    }
}
