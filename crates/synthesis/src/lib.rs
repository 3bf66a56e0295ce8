//! The context-bounded synthesis pipeline.
//!
//! Every task runs the same leaf-first chain:
//!
//! 1. **Select** a bounded prefix of the candidates ([`selector`])
//! 2. **Budget** each record's abstract on a copy ([`budget`])
//! 3. **Render** a fixed-shape prompt for the task ([`prompt`])
//! 4. **Generate** through the fail-soft invoker ([`invoker`])
//! 5. **Annotate** Q&A answers with references ([`citation`])
//!
//! [`SynthesisPipeline`] composes the steps per task type.

pub mod budget;
pub mod citation;
pub mod invoker;
pub mod pipeline;
pub mod prompt;
pub mod selector;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use budget::{budgeted, truncate};
pub use citation::{CitationAnnotator, TitleMatchAnnotator};
pub use invoker::{Generation, GenerationInvoker, GenerationSettings};
pub use pipeline::{PipelineError, SynthesisPipeline, SynthesisResult, SynthesisStatus, TaskRequest};
pub use prompt::{PromptBuilder, PromptTask};
pub use selector::select;
