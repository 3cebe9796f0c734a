use std::sync::Arc;

use anyhow::{bail, Context, Result};
use eventscout_core::{AppConfig, CrawlJobPayload, ScraperConfig, SourceType};
use eventscout_queue::JobQueue;
use eventscout_scraper::HostThrottle;
use eventscout_worker::{run_crawl_job, spawn_consumers, IngestClient, WorkerContext};
use tracing::info;

/// `eventscout run`: brings up the HTTP API (§6) and one consumer task per
/// declared queue (§4.14), then waits for Ctrl-C.
pub async fn run_server(config: AppConfig) -> Result<()> {
    let http_client = reqwest::Client::new();
    let queue = JobQueue::connect(&config.queue).await;
    let state = eventscout_api::AppState::new(config.clone(), queue.clone(), http_client.clone());

    let worker_ctx = Arc::new(WorkerContext {
        queue,
        app_config: config.clone(),
        http_client,
        throttle: Arc::new(HostThrottle::new()),
        ingest: IngestClient::new(
            reqwest::Client::new(),
            config.ingest.backend_url.clone(),
            config.ingest.service_token.clone(),
        ),
    });
    let (consumer_handles, shutdown_tx) = spawn_consumers(worker_ctx);

    let app = eventscout_api::router(state);
    let addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.context("binding API listener")?;
    info!(addr = %addr, "eventscout API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    let _ = shutdown_tx.send(());
    for handle in consumer_handles {
        let _ = handle.await;
    }
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

/// `eventscout trigger`: runs one crawl job inline, printing the resulting
/// candidate count (and, on `--dry-run`, the candidates themselves).
pub async fn trigger_once(
    config: AppConfig,
    source_id: String,
    source_url: String,
    source_type: String,
    scraper_config_path: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let source_type = match source_type.as_str() {
        "rss" => SourceType::Rss,
        "ics" => SourceType::Ics,
        "scraper" => SourceType::Scraper,
        other => bail!("unknown source_type {other:?}, expected rss|ics|scraper"),
    };

    let scraper_config = match scraper_config_path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            let parsed: ScraperConfig = if path.ends_with(".json") {
                serde_json::from_str(&raw)?
            } else {
                toml::from_str(&raw)?
            };
            Some(parsed)
        }
        None => None,
    };
    if source_type == SourceType::Scraper && scraper_config.is_none() {
        bail!("source_type=scraper requires --scraper-config");
    }

    let payload = CrawlJobPayload {
        source_id,
        source_url,
        source_type,
        scraper_config,
        force: false,
        dry_run,
        enable_ai: config.ai.enabled,
        fetch_event_pages: true,
        ingest_run_id: None,
    };

    let http_client = reqwest::Client::new();
    let throttle = HostThrottle::new();
    let ingest = IngestClient::new(
        http_client.clone(),
        config.ingest.backend_url.clone(),
        config.ingest.service_token.clone(),
    );

    let result = run_crawl_job(
        &payload,
        &config,
        &http_client,
        &throttle,
        if dry_run { None } else { Some(&ingest) },
    )
    .await
    .map_err(|e| anyhow::anyhow!(e))?;

    println!("events_found={}", result.events_found);
    println!(
        "created={} updated={} duplicate={} error={}",
        result.counters.created, result.counters.updated, result.counters.duplicate, result.counters.error
    );
    if dry_run {
        println!("{}", serde_json::to_string_pretty(&result.candidates)?);
    }
    Ok(())
}

/// `eventscout detect`: classifies a URL the same way `POST /crawl/detect` does.
pub async fn detect_url(config: AppConfig, url: String) -> Result<()> {
    let client = reqwest::Client::new();
    let opts = eventscout_safety::fetch::FetchOptions {
        user_agent: config.scraper.user_agent.clone(),
        ..Default::default()
    };
    let resp = eventscout_safety::fetch::safe_get(&client, &url, &opts).await?;
    let kind = eventscout_safety::sniff::sniff(resp.content_type.as_deref(), &resp.body);
    println!("detected_type={kind:?}");

    if kind == eventscout_core::ContentKind::Html {
        let body = String::from_utf8_lossy(&resp.body);
        let jsonld = eventscout_extraction::structured::extract_jsonld(&body);
        println!("has_json_ld_events={}", !jsonld.is_empty());
        if jsonld.is_empty() {
            let microdata = eventscout_extraction::structured::extract_microdata(&body, &resp.final_url);
            println!("has_microdata_events={}", !microdata.is_empty());
        }
    }
    Ok(())
}
