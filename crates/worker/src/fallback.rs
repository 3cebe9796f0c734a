//! Synchronous fallback path: when the queue backend can't accept an
//! enqueue, the trigger handler calls this directly from a spawned task
//! instead, so the HTTP layer never blocks on queue availability (§4.14).

use std::sync::Arc;

use eventscout_core::CrawlJobPayload;
use tracing::{error, info, warn};

use crate::consumer::WorkerContext;
use crate::pipeline::{run_crawl_job, run_status_update};

/// Runs the crawl handler inline, in a detached task, bypassing the
/// queue entirely. Used only when `JobQueue` enqueue itself failed.
pub fn spawn_inline_crawl(ctx: Arc<WorkerContext>, payload: CrawlJobPayload) {
    tokio::spawn(async move {
        info!(source_id = %payload.source_id, "running crawl job inline (queue fallback)");
        let result = run_crawl_job(&payload, &ctx.app_config, &ctx.http_client, &ctx.throttle, Some(&ctx.ingest)).await;
        match result {
            Ok(run_result) => {
                if let Some(run_id) = &payload.ingest_run_id {
                    let update = run_status_update(&run_result);
                    let _ = ctx.ingest.update_run_status(run_id, &update).await;
                }
                info!(source_id = %payload.source_id, events = run_result.events_found, "inline crawl job finished");
            }
            Err(err) => {
                warn!(source_id = %payload.source_id, error = %err, "inline crawl job failed");
                error!(error = %err, "inline crawl has no queue to record the failure against");
            }
        }
    });
}
