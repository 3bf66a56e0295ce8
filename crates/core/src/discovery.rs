//! Discovery trait: external paper search.
//!
//! Discovery sources are untrusted and rate-limited. Results come back in
//! provider order; no re-ranking happens downstream.

use async_trait::async_trait;
use crate::error::DiscoveryError;
use crate::paper::PaperRecord;

#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// A human-readable name (e.g., "arxiv").
    fn name(&self) -> &str;

    /// Search for up to `max_results` papers matching `query`.
    ///
    /// Returned records have `topic` set to `query`.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> std::result::Result<Vec<PaperRecord>, DiscoveryError>;
}
