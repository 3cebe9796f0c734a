use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "eventscout", about = "Family-event ingestion pipeline")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API and queue consumer tasks
    Run,
    /// Run one crawl job synchronously from the command line, bypassing
    /// the queue and the HTTP layer (useful for testing a new source).
    Trigger {
        #[arg(long)]
        source_id: String,
        #[arg(long)]
        source_url: String,
        /// rss | ics | scraper
        #[arg(long)]
        source_type: String,
        /// Path to a ScraperConfig TOML/JSON file, required when source_type=scraper
        #[arg(long)]
        scraper_config: Option<String>,
        /// Compute candidates but do not POST to the ingest endpoint
        #[arg(long)]
        dry_run: bool,
    },
    /// Classify a URL (rss/ics/json_ld/microdata/unknown) the same way
    /// `POST /crawl/detect` would.
    Detect {
        #[arg(long)]
        url: String,
    },
}
