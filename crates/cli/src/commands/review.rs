//! `papertrail review <topic>`

use super::{Output, load_state, print_result};

pub async fn run(topic: &str, output: Output) -> Result<(), Box<dyn std::error::Error>> {
    let state = load_state().await?;
    let result = state.pipeline.generate_review(topic).await?;

    if result.papers_used == 0 && !output.json {
        let (start, end) = state.pipeline.review_window();
        eprintln!("⚠️  No stored papers on '{topic}' from {start}-{end}. Run `papertrail search \"{topic}\"` first.");
    }

    print_result(&result, output)
}
