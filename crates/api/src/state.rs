//! Shared request state, the `axum::extract::State` payload for every
//! handler. Wraps the same `WorkerContext` the queue consumers and the
//! inline-fallback path run against, plus the process-wide AI budget
//! counter `GET /metrics` reports.

use std::sync::Arc;

use eventscout_core::{AppConfig, BudgetCounter};
use eventscout_queue::JobQueue;
use eventscout_scraper::HostThrottle;
use eventscout_worker::{IngestClient, WorkerContext};

#[derive(Clone)]
pub struct AppState {
    pub worker: Arc<WorkerContext>,
    pub budget: Arc<BudgetCounter>,
}

impl AppState {
    pub fn new(app_config: AppConfig, queue: JobQueue, http_client: reqwest::Client) -> Self {
        let ingest = IngestClient::new(
            http_client.clone(),
            app_config.ingest.backend_url.clone(),
            app_config.ingest.service_token.clone(),
        );
        let budget = Arc::new(BudgetCounter::new(
            app_config.ai.daily_budget_cents,
            app_config.ai.monthly_budget_cents,
        ));
        let worker = Arc::new(WorkerContext {
            queue,
            app_config,
            http_client,
            throttle: Arc::new(HostThrottle::new()),
            ingest,
        });
        Self { worker, budget }
    }
}
