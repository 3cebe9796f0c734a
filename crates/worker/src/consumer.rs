//! One Tokio task per registered queue, consuming to completion before
//! the next dequeue. Grounded in `src/crawl.rs`'s `run_crawl` worker-spawn
//! loop (`tokio::spawn` per network, `tokio::select!` against a shutdown
//! broadcast), generalized here from "one task per overlay network" to
//! "one task per queue name".

use std::sync::Arc;
use std::time::Duration;

use eventscout_core::{AppConfig, CrawlJobPayload, Job};
use eventscout_queue::JobQueue;
use eventscout_scraper::HostThrottle;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::ingest::IngestClient;
use crate::pipeline::{run_crawl_job, run_status_update};

/// How long a consumer sleeps after finding its queue empty before
/// polling again.
const IDLE_POLL: Duration = Duration::from_secs(2);

pub struct WorkerContext {
    pub queue: JobQueue,
    pub app_config: AppConfig,
    pub http_client: reqwest::Client,
    pub throttle: Arc<HostThrottle>,
    pub ingest: IngestClient,
}

/// Spawns one consumer task per declared queue name; returns their join
/// handles plus the shutdown sender used to stop them.
pub fn spawn_consumers(ctx: Arc<WorkerContext>) -> (Vec<tokio::task::JoinHandle<()>>, broadcast::Sender<()>) {
    let (shutdown_tx, _) = broadcast::channel(1);
    let mut handles = Vec::new();
    for queue_name in eventscout_queue::QUEUE_NAMES {
        let ctx = Arc::clone(&ctx);
        let mut shutdown = shutdown_tx.subscribe();
        let queue_name = queue_name.to_string();
        handles.push(tokio::spawn(async move {
            info!(queue = %queue_name, "consumer started");
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        info!(queue = %queue_name, "consumer shutting down");
                        break;
                    }
                    _ = run_once(&ctx, &queue_name) => {}
                }
            }
        }));
    }
    (handles, shutdown_tx)
}

async fn run_once(ctx: &WorkerContext, queue_name: &str) {
    let job = match ctx.queue.dequeue(queue_name).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            tokio::time::sleep(IDLE_POLL).await;
            return;
        }
        Err(err) => {
            warn!(queue = queue_name, error = %err, "dequeue failed");
            tokio::time::sleep(IDLE_POLL).await;
            return;
        }
    };
    handle_job(ctx, job).await;
}

/// Dispatches by job type. Unknown types fail immediately without a
/// retry, per §4.13's routing contract.
async fn handle_job(ctx: &WorkerContext, job: Job) {
    match eventscout_queue::route(&job.job_type) {
        Some("crawl") => handle_crawl(ctx, job).await,
        Some(_) => {
            // classify/score/geocode are reserved queue names for a
            // downstream consumer this binary does not implement; mark
            // them done immediately so depths/DLQ metrics stay honest.
            let result = serde_json::json!({"handled": false, "reason": "no local handler for this queue"});
            if let Err(err) = ctx.queue.complete(job, result).await {
                error!(error = %err, "failed to record no-op completion");
            }
        }
        None => {
            warn!(job_type = %job.job_type, "unknown job type, failing without retry");
            if let Err(err) = ctx.queue.fail(job, "unknown job type", false).await {
                error!(error = %err, "failed to record unknown-type failure");
            }
        }
    }
}

async fn handle_crawl(ctx: &WorkerContext, job: Job) {
    let payload: CrawlJobPayload = match serde_json::from_value(serde_json::Value::Object(job.payload.clone().into_iter().collect())) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "malformed crawl payload, failing without retry");
            let _ = ctx.queue.fail(job, format!("malformed payload: {err}"), false).await;
            return;
        }
    };

    if let Some(run_id) = &payload.ingest_run_id {
        let starting = crate::ingest::RunStatusUpdate {
            status: crate::ingest::RunStatus::Running,
            events_found: 0,
            events_created: 0,
            events_updated: 0,
            events_skipped: 0,
            error_message: None,
            error_details: None,
        };
        let _ = ctx.ingest.update_run_status(run_id, &starting).await;
    }

    let result = run_crawl_job(&payload, &ctx.app_config, &ctx.http_client, &ctx.throttle, Some(&ctx.ingest)).await;

    match result {
        Ok(run_result) => {
            info!(source_id = %payload.source_id, events = run_result.events_found, "crawl job finished");
            if let Some(run_id) = &payload.ingest_run_id {
                let update = run_status_update(&run_result);
                let _ = ctx.ingest.update_run_status(run_id, &update).await;
            }
            let summary = serde_json::json!({
                "events_found": run_result.events_found,
                "created": run_result.counters.created,
                "updated": run_result.counters.updated,
                "duplicate": run_result.counters.duplicate,
                "error": run_result.counters.error,
            });
            if let Err(err) = ctx.queue.complete(job, summary).await {
                error!(error = %err, "failed to record job completion");
            }
        }
        Err(err) => {
            warn!(source_id = %payload.source_id, error = %err, "crawl job failed");
            if let Some(run_id) = &payload.ingest_run_id {
                let update = crate::ingest::RunStatusUpdate {
                    status: crate::ingest::RunStatus::Failed,
                    events_found: 0,
                    events_created: 0,
                    events_updated: 0,
                    events_skipped: 0,
                    error_message: Some(err.clone()),
                    error_details: None,
                };
                let _ = ctx.ingest.update_run_status(run_id, &update).await;
            }
            if let Err(queue_err) = ctx.queue.fail(job, err, true).await {
                error!(error = %queue_err, "failed to record job failure");
            }
        }
    }
}
