//! Papertrail CLI, the main entry point.
//!
//! Commands:
//! - `onboard`      Write a default config to ~/.papertrail
//! - `serve`        Start the HTTP API
//! - `search`       Find papers on arXiv and store them
//! - `review`       Literature review over stored papers
//! - `ask`          Answer a question grounded in named papers
//! - `future-work`  Suggest open research directions
//! - `doctor`       Diagnose configuration, store and provider

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "papertrail",
    about = "Papertrail: literature reviews, Q&A and future work from arXiv papers",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Search arXiv for papers on a topic and store them
    Search {
        topic: String,

        /// First publication year to keep (default: five years ago)
        #[arg(long)]
        from: Option<i32>,

        /// Last publication year to keep (default: this year)
        #[arg(long)]
        to: Option<i32>,
    },

    /// Ask a question grounded in specific stored papers
    Ask {
        question: String,

        /// Title of a paper to consult (repeatable)
        #[arg(short, long = "paper")]
        papers: Vec<String>,
    },

    /// Generate a literature review for a topic
    Review { topic: String },

    /// Suggest future research directions for a topic
    FutureWork { topic: String },

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so generated text on stdout stays clean.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output = commands::Output { json: cli.json };

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Search { topic, from, to } => commands::search::run(&topic, from, to, output).await?,
        Commands::Ask { question, papers } => commands::ask::run(&question, &papers, output).await?,
        Commands::Review { topic } => commands::review::run(&topic, output).await?,
        Commands::FutureWork { topic } => commands::future_work::run(&topic, output).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
