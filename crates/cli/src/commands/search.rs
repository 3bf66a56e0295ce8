//! `papertrail search <topic>`: discover papers and persist them.

use super::{Output, load_state};

pub async fn run(
    topic: &str,
    from: Option<i32>,
    to: Option<i32>,
    output: Output,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = load_state().await?;

    let (default_start, default_end) = state.pipeline.review_window();
    let start = from.unwrap_or(default_start);
    let end = to.unwrap_or(default_end);
    if start > end {
        return Err(format!("--from {start} is after --to {end}").into());
    }

    let discovery = state.search.search(topic, start, end).await?;
    // The process exits right after printing, so inserts must finish first.
    let report = discovery.persist.wait().await;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&discovery.papers)?);
        return Ok(());
    }

    println!("🔎 {} paper(s) on '{topic}' published {start}-{end}\n", discovery.papers.len());
    for paper in &discovery.papers {
        let year = paper
            .published_year()
            .map(|y| y.to_string())
            .unwrap_or_else(|| "n.d.".into());
        println!("  • {} ({year})", paper.title);
        println!("    {}", paper.authors_joined());
        if !paper.url.is_empty() {
            println!("    {}", paper.url);
        }
    }

    println!();
    println!("  Stored: {}", report.stored);
    if report.failed > 0 {
        println!("  ⚠️  Failed to store: {}", report.failed);
    }

    Ok(())
}
