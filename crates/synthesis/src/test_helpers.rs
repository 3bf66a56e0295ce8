//! Shared test doubles for pipeline tests.

use async_trait::async_trait;
use papertrail_core::error::{ProviderError, StoreError};
use papertrail_core::paper::MetadataUpdate;
use papertrail_core::provider::{Provider, ProviderRequest, ProviderResponse};
use papertrail_core::store::{PaperStore, in_topic_range};
use papertrail_core::PaperRecord;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

enum Script {
    Queue(Mutex<VecDeque<Result<String, ProviderError>>>),
    Always(Result<String, ProviderError>),
    Echo(Duration),
}

/// A provider that replays scripted outcomes and records every prompt.
///
/// A queue script panics when it runs out.
pub struct ScriptedProvider {
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(outcomes: Vec<Result<String, ProviderError>>) -> Self {
        Self::with_script(Script::Queue(Mutex::new(outcomes.into())))
    }

    pub fn always_text(text: &str) -> Self {
        Self::with_script(Script::Always(Ok(text.to_string())))
    }

    pub fn always_err(err: ProviderError) -> Self {
        Self::with_script(Script::Always(Err(err)))
    }

    /// Replies with the prompt itself after `delay`.
    pub fn echo_with_delay(delay: Duration) -> Self {
        Self::with_script(Script::Echo(delay))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());

        let outcome = match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("ScriptedProvider: script exhausted")),
            Script::Always(outcome) => outcome.clone(),
            Script::Echo(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(request.prompt.clone())
            }
        };

        outcome.map(|text| ProviderResponse {
            text,
            model: request.model,
            usage: None,
        })
    }
}

/// A provider that never answers.
pub struct HangingProvider;

#[async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ProviderError::Network("unreachable".into()))
    }
}

/// A store over a fixed record list that logs every lookup.
pub struct RecordingStore {
    records: Vec<PaperRecord>,
    title_lookups: Mutex<Vec<String>>,
    range_queries: Mutex<Vec<(String, i32, i32)>>,
    unavailable: bool,
}

impl RecordingStore {
    pub fn new(records: Vec<PaperRecord>) -> Self {
        Self {
            records,
            title_lookups: Mutex::new(Vec::new()),
            range_queries: Mutex::new(Vec::new()),
            unavailable: false,
        }
    }

    /// A store whose every read fails.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn title_lookups(&self) -> Vec<String> {
        self.title_lookups.lock().unwrap().clone()
    }

    pub fn range_queries(&self) -> Vec<(String, i32, i32)> {
        self.range_queries.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::QueryFailed("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PaperStore for RecordingStore {
    fn name(&self) -> &str {
        "recording_mock"
    }

    async fn get_by_topic_and_range(
        &self,
        topic: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<PaperRecord>, StoreError> {
        self.range_queries
            .lock()
            .unwrap()
            .push((topic.to_string(), start_year, end_year));
        self.check()?;
        // Records are kept in the order given; tests seed them newest first.
        Ok(self
            .records
            .iter()
            .filter(|r| in_topic_range(r, topic, start_year, end_year))
            .cloned()
            .collect())
    }

    async fn get_by_title(&self, title: &str) -> Result<Option<PaperRecord>, StoreError> {
        self.title_lookups.lock().unwrap().push(title.to_string());
        self.check()?;
        Ok(self.records.iter().find(|r| r.title == title).cloned())
    }

    async fn insert(&self, _record: PaperRecord) -> Result<(), StoreError> {
        Err(StoreError::Storage("read-only mock".into()))
    }

    async fn update_metadata(&self, _title: &str, _update: MetadataUpdate) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.len())
    }
}

/// A record with a long abstract, dated in `year`.
pub fn paper(title: &str, topic: &str, year: i32, abstract_len: usize) -> PaperRecord {
    PaperRecord::new(
        title,
        vec![format!("{title} Author"), "Co Author".into()],
        "q".repeat(abstract_len),
        format!("{year}-06-01T00:00:00"),
    )
    .with_topic(topic)
}
