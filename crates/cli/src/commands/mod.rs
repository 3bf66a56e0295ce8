pub mod ask;
pub mod doctor;
pub mod future_work;
pub mod onboard;
pub mod review;
pub mod search;
pub mod serve;

use papertrail_config::AppConfig;
use papertrail_gateway::AppState;
use papertrail_synthesis::{SynthesisResult, SynthesisStatus};

/// How command results are printed.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Store, provider and discovery wired from the on-disk config.
pub async fn load_state() -> Result<AppState, Box<dyn std::error::Error>> {
    let config = load_config()?;
    Ok(AppState::from_config(&config).await?)
}

/// Print a synthesis result; the text alone unless `--json`.
pub fn print_result(
    result: &SynthesisResult,
    output: Output,
) -> Result<(), Box<dyn std::error::Error>> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    match result.status {
        SynthesisStatus::Generated => println!("{}", result.text),
        SynthesisStatus::Empty => {
            eprintln!("⚠️  The model returned an empty response.");
        }
        SynthesisStatus::GenerationFailed => {
            eprintln!("❌ Generation failed. Is the model provider running? Try `papertrail doctor`.");
        }
    }
    Ok(())
}
