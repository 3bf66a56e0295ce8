//! `papertrail future-work <topic>`

use super::{Output, load_state, print_result};

pub async fn run(topic: &str, output: Output) -> Result<(), Box<dyn std::error::Error>> {
    let state = load_state().await?;
    let result = state.pipeline.suggest_future_work(topic).await?;
    print_result(&result, output)
}
