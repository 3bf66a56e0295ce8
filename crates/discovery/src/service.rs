//! Search service: discovery + year filter + background persistence.
//!
//! Discovered papers are returned to the caller immediately; inserts into
//! the paper store run on a spawned task. Callers that need read-your-writes
//! (e.g. a review right after a search) await the [`PersistHandle`].

use papertrail_core::PaperRecord;
use papertrail_core::discovery::DiscoverySource;
use papertrail_core::error::DiscoveryError;
use papertrail_core::store::PaperStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of a background persist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub stored: usize,
    pub failed: usize,
}

/// Handle on the background insert task.
#[must_use = "dropping the handle detaches persistence; await it for read-your-writes"]
pub struct PersistHandle {
    task: JoinHandle<PersistReport>,
    pending: usize,
}

impl PersistHandle {
    /// Number of records handed to the background task.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Wait for every insert to finish.
    pub async fn wait(self) -> PersistReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Persist task did not complete");
                PersistReport {
                    stored: 0,
                    failed: self.pending,
                }
            }
        }
    }
}

/// Papers from one search plus the handle on their persistence.
pub struct Discovery {
    pub papers: Vec<PaperRecord>,
    pub persist: PersistHandle,
}

pub struct SearchService {
    source: Arc<dyn DiscoverySource>,
    store: Arc<dyn PaperStore>,
    max_results: usize,
}

impl SearchService {
    pub fn new(source: Arc<dyn DiscoverySource>, store: Arc<dyn PaperStore>, max_results: usize) -> Self {
        Self {
            source,
            store,
            max_results,
        }
    }

    /// Search `topic`, keep papers published in `[start_year, end_year]`,
    /// and persist them in the background. Order is the source's order.
    pub async fn search(
        &self,
        topic: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Discovery, DiscoveryError> {
        let found = self.source.search(topic, self.max_results).await?;
        let total = found.len();

        let papers: Vec<PaperRecord> = found
            .into_iter()
            .filter(|p| {
                p.published_year()
                    .is_some_and(|year| year >= start_year && year <= end_year)
            })
            .collect();

        info!(
            source = self.source.name(),
            topic,
            found = total,
            kept = papers.len(),
            "Discovery search complete"
        );

        let persist = self.spawn_persist(papers.clone());
        Ok(Discovery { papers, persist })
    }

    fn spawn_persist(&self, papers: Vec<PaperRecord>) -> PersistHandle {
        let pending = papers.len();
        let store = Arc::clone(&self.store);

        let task = tokio::spawn(async move {
            let mut report = PersistReport::default();
            for paper in papers {
                let title = paper.title.clone();
                match store.insert(paper).await {
                    Ok(()) => report.stored += 1,
                    Err(e) => {
                        warn!(title = %title, error = %e, "Failed to store discovered paper");
                        report.failed += 1;
                    }
                }
            }
            debug!(stored = report.stored, failed = report.failed, "Discovery persist finished");
            report
        });

        PersistHandle { task, pending }
    }
}
