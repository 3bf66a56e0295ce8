//! `papertrail ask <question> --paper <title>...`
//!
//! Only the first few titles are consulted (`synthesis.qa_max_papers`);
//! titles not found in the store are skipped.

use super::{Output, load_state, print_result};

pub async fn run(
    question: &str,
    papers: &[String],
    output: Output,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = load_state().await?;
    let result = state.pipeline.answer_question(question, papers).await?;

    if !papers.is_empty() && result.papers_used == 0 && !output.json {
        eprintln!("⚠️  None of the given titles are stored; answering without paper context.");
    }

    print_result(&result, output)
}
