mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use eventscout_core::AppConfig;
use tracing::warn;

// Use mimalloc to prevent memory bloat (glibc malloc doesn't release memory with high concurrency)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Crawling is I/O-bound (fetch/parse/dedupe across many sources), so a
    // larger worker pool than the default CPU-count pays off here.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(16)
        .thread_stack_size(8 * 1024 * 1024)
        .max_blocking_threads(256)
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let config: AppConfig = toml::from_str(&config_str)?;

    let format = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.general.log_level.clone())),
    );
    if config.general.log_format == "json" {
        format.json().init();
    } else {
        format.init();
    }

    match cli.command {
        Commands::Run => commands::run_server(config).await?,
        Commands::Trigger { source_id, source_url, source_type, scraper_config, dry_run } => {
            commands::trigger_once(config, source_id, source_url, source_type, scraper_config, dry_run).await?;
        }
        Commands::Detect { url } => commands::detect_url(config, url).await?,
    }

    Ok(())
}
