//! The synthesis pipeline: select → budget → prompt → generate → annotate.
//!
//! Store failures abort a task with [`PipelineError::Store`]. Generation
//! failures never do: they surface as [`SynthesisStatus::GenerationFailed`]
//! with empty text.

use chrono::Datelike;
use papertrail_config::SynthesisConfig;
use papertrail_core::PaperRecord;
use papertrail_core::error::StoreError;
use papertrail_core::store::PaperStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::budget::budget_all;
use crate::citation::{CitationAnnotator, TitleMatchAnnotator};
use crate::invoker::{Generation, GenerationInvoker};
use crate::prompt::{PromptBuilder, PromptTask};
use crate::selector::select;

#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("Paper store unavailable: {0}")]
    Store(#[from] StoreError),
}

/// A task for [`SynthesisPipeline::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskRequest {
    Question {
        question: String,
        candidate_titles: Vec<String>,
    },
    Review {
        topic: String,
        candidate_records: Vec<PaperRecord>,
    },
    FutureWork {
        topic: String,
        candidate_records: Vec<PaperRecord>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStatus {
    /// The model produced non-blank text.
    Generated,
    /// The model answered with blank text.
    Empty,
    /// Generation failed; `text` is empty.
    GenerationFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisResult {
    pub text: String,
    pub status: SynthesisStatus,
    /// Records that made it into the prompt.
    pub papers_used: usize,
}

impl SynthesisResult {
    fn from_generation(generation: Generation, papers_used: usize) -> Self {
        let (text, status) = match generation {
            Generation::Text(text) if text.trim().is_empty() => (text, SynthesisStatus::Empty),
            Generation::Text(text) => (text, SynthesisStatus::Generated),
            Generation::Failed(_) => (String::new(), SynthesisStatus::GenerationFailed),
        };
        Self {
            text,
            status,
            papers_used,
        }
    }
}

pub struct SynthesisPipeline {
    store: Arc<dyn PaperStore>,
    invoker: GenerationInvoker,
    annotator: Box<dyn CitationAnnotator>,
    prompts: PromptBuilder,
    limits: SynthesisConfig,
    current_year: Option<i32>,
}

impl SynthesisPipeline {
    pub fn new(store: Arc<dyn PaperStore>, invoker: GenerationInvoker, limits: SynthesisConfig) -> Self {
        Self {
            store,
            invoker,
            annotator: Box::new(TitleMatchAnnotator),
            prompts: PromptBuilder::new(),
            limits,
            current_year: None,
        }
    }

    /// Replace the citation strategy used for Q&A.
    pub fn with_annotator(mut self, annotator: Box<dyn CitationAnnotator>) -> Self {
        self.annotator = annotator;
        self
    }

    /// Pin the year the review window ends on (defaults to the current UTC year).
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    pub fn invoker(&self) -> &GenerationInvoker {
        &self.invoker
    }

    /// The inclusive `[start, end]` year window used for topic lookups.
    pub fn review_window(&self) -> (i32, i32) {
        let end = self
            .current_year
            .unwrap_or_else(|| chrono::Utc::now().year());
        (end - self.limits.window_years, end)
    }

    /// Literature review over the most recent papers stored for `topic`.
    pub async fn generate_review(&self, topic: &str) -> Result<SynthesisResult, PipelineError> {
        let candidates = self.recent_for_topic(topic).await?;
        Ok(self.review_from(topic, &candidates).await)
    }

    /// Open problems and future directions over the most recent papers
    /// stored for `topic`.
    pub async fn suggest_future_work(&self, topic: &str) -> Result<SynthesisResult, PipelineError> {
        let candidates = self.recent_for_topic(topic).await?;
        Ok(self.future_work_from(topic, &candidates).await)
    }

    /// Answer `question` from the first few titles in `titles`.
    ///
    /// Titles past the limit are never looked up; titles the store doesn't
    /// know are skipped.
    pub async fn answer_question(
        &self,
        question: &str,
        titles: &[String],
    ) -> Result<SynthesisResult, PipelineError> {
        // ── Select titles, then resolve ──
        let selected = select(titles, self.limits.qa_max_papers);
        let mut papers = Vec::with_capacity(selected.len());
        for title in selected {
            match self.store.get_by_title(title).await? {
                Some(paper) => papers.push(paper),
                None => debug!(title = %title, "Title not in store; skipping"),
            }
        }

        info!(
            requested = titles.len(),
            considered = selected.len(),
            resolved = papers.len(),
            "Answering question"
        );

        // ── Budget, prompt, generate ──
        let budgeted = budget_all(&papers, self.limits.qa_abstract_chars);
        let task = PromptTask::Question {
            question: question.to_string(),
        };
        let prompt = self.prompts.build(&task, &budgeted);
        let mut result = SynthesisResult::from_generation(self.invoker.generate(&prompt).await, budgeted.len());

        // ── Annotate ──
        if result.status == SynthesisStatus::Generated {
            result.text = self.annotator.annotate(&result.text, &papers);
        }
        Ok(result)
    }

    /// Run a task whose candidates the caller already holds.
    pub async fn run(&self, request: TaskRequest) -> Result<SynthesisResult, PipelineError> {
        match request {
            TaskRequest::Question {
                question,
                candidate_titles,
            } => self.answer_question(&question, &candidate_titles).await,
            TaskRequest::Review {
                topic,
                candidate_records,
            } => Ok(self.review_from(&topic, &candidate_records).await),
            TaskRequest::FutureWork {
                topic,
                candidate_records,
            } => Ok(self.future_work_from(&topic, &candidate_records).await),
        }
    }

    async fn recent_for_topic(&self, topic: &str) -> Result<Vec<PaperRecord>, StoreError> {
        let (start, end) = self.review_window();
        let records = self.store.get_by_topic_and_range(topic, start, end).await?;
        debug!(topic, start, end, found = records.len(), "Loaded topic candidates");
        Ok(records)
    }

    async fn review_from(&self, topic: &str, candidates: &[PaperRecord]) -> SynthesisResult {
        let task = PromptTask::Review {
            topic: topic.to_string(),
        };
        self.synthesize(
            task,
            candidates,
            self.limits.review_max_papers,
            self.limits.review_abstract_chars,
        )
        .await
    }

    async fn future_work_from(&self, topic: &str, candidates: &[PaperRecord]) -> SynthesisResult {
        let task = PromptTask::FutureWork {
            topic: topic.to_string(),
        };
        self.synthesize(
            task,
            candidates,
            self.limits.future_work_max_papers,
            self.limits.future_work_abstract_chars,
        )
        .await
    }

    /// Shared path for topic tasks. Records without a title are dropped
    /// before selection.
    async fn synthesize(
        &self,
        task: PromptTask,
        candidates: &[PaperRecord],
        max_papers: usize,
        abstract_chars: usize,
    ) -> SynthesisResult {
        let usable: Vec<PaperRecord> = candidates
            .iter()
            .filter(|r| !r.title.trim().is_empty())
            .cloned()
            .collect();
        let selected = budget_all(select(&usable, max_papers), abstract_chars);

        info!(
            task = ?task,
            candidates = candidates.len(),
            selected = selected.len(),
            "Synthesizing"
        );

        let prompt = self.prompts.build(&task, &selected);
        SynthesisResult::from_generation(self.invoker.generate(&prompt).await, selected.len())
    }
}
