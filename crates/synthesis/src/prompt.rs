//! Prompt rendering.
//!
//! Records are rendered in the order given, one block per record, blocks
//! separated by a blank line. Abstracts are expected to be budgeted already.
//! Prompts are plain text with no model-specific control tokens.

use papertrail_core::PaperRecord;

/// What the prompt asks the model to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptTask {
    /// Literature review on a topic.
    Review { topic: String },
    /// Answer a question from the supplied papers.
    Question { question: String },
    /// Open problems and future directions on a topic.
    FutureWork { topic: String },
}

impl PromptTask {
    /// Label of the first line of each record block.
    fn title_label(&self) -> &'static str {
        match self {
            PromptTask::Question { .. } => "Paper",
            PromptTask::Review { .. } | PromptTask::FutureWork { .. } => "Title",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Render the full prompt for `task` over `records`.
    pub fn build(&self, task: &PromptTask, records: &[PaperRecord]) -> String {
        let papers = self.render_records(task.title_label(), records);
        match task {
            PromptTask::Review { topic } => format!(
                "Write a concise research review on the topic '{topic}'.\n\
                 Consider the following papers as reference:\n\n\
                 {papers}\n\n\
                 Focus on:\n\
                 1. A brief introduction to the topic.\n\
                 2. Major approaches and key findings.\n\
                 3. Main challenges faced in the field.\n\
                 4. Possible future research directions.\n\n\
                 Review:"
            ),
            PromptTask::Question { question } => format!(
                "Based on the following research papers:\n\n\
                 {papers}\n\n\
                 Question: {question}\n\n\
                 Please provide a brief answer, citing specific papers by title if relevant.\n\n\
                 Answer:"
            ),
            PromptTask::FutureWork { topic } => format!(
                "Identify open problems and future research directions for the topic '{topic}'.\n\
                 Consider the following papers as reference:\n\n\
                 {papers}\n\n\
                 Focus on:\n\
                 1. Open problems the papers leave unsolved.\n\
                 2. Gaps and limitations in current approaches.\n\
                 3. Concrete, testable directions for future research.\n\n\
                 Future work:"
            ),
        }
    }

    fn render_records(&self, label: &str, records: &[PaperRecord]) -> String {
        records
            .iter()
            .map(|r| {
                format!(
                    "{label}: {}\nAuthors: {}\nPublished: {}\nAbstract: {}",
                    r.title,
                    r.authors_joined(),
                    r.year(),
                    r.abstract_text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
