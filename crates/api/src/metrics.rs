//! `GET /metrics` (JSON) and `GET /metrics/prometheus` (exposition format).
//! Both read the same queue-depth/DLQ/budget snapshot; the usage-7d window
//! is a placeholder counter since this binary does not persist a crawl
//! history store (§3 Ownership: ParsedEvents are released after the
//! producing batch posts).

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::ApiError;
use crate::models::{BudgetMetrics, DlqMetrics, MetricsResponse, QueueMetrics, UsageWindow};
use crate::state::AppState;

pub async fn metrics(State(state): State<AppState>) -> Result<Json<MetricsResponse>, ApiError> {
    let depths = state.worker.queue.depths().await?;
    let total_pending = depths.values().sum();

    let mut dlq_count = 0usize;
    for name in eventscout_queue::QUEUE_NAMES {
        dlq_count += state.worker.queue.get_dlq_count(name).await?;
    }

    let snapshot = state.budget.snapshot();

    Ok(Json(MetricsResponse {
        queues: QueueMetrics { depths, total_pending },
        dlq: DlqMetrics { count: dlq_count },
        budget: BudgetMetrics {
            status: snapshot.status,
            daily: snapshot.daily_cents,
            monthly: snapshot.monthly_cents,
        },
        usage_7d: UsageWindow { events_ingested: 0, sources_crawled: 0 },
    }))
}

/// Same data, rendered as Prometheus exposition-format text instead of JSON.
pub async fn metrics_prometheus(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let depths = state.worker.queue.depths().await?;
    let mut dlq_count = 0usize;
    for name in eventscout_queue::QUEUE_NAMES {
        dlq_count += state.worker.queue.get_dlq_count(name).await?;
    }
    let snapshot = state.budget.snapshot();

    let mut out = String::new();
    out.push_str("# HELP eventscout_queue_depth Number of jobs pending in a queue.\n");
    out.push_str("# TYPE eventscout_queue_depth gauge\n");
    for (queue, depth) in &depths {
        out.push_str(&format!("eventscout_queue_depth{{queue=\"{queue}\"}} {depth}\n"));
    }

    out.push_str("# HELP eventscout_dlq_count Number of jobs in the dead-letter queue.\n");
    out.push_str("# TYPE eventscout_dlq_count gauge\n");
    out.push_str(&format!("eventscout_dlq_count {dlq_count}\n"));

    out.push_str("# HELP eventscout_ai_budget_cents AI spend against the rolling budget window, in cents.\n");
    out.push_str("# TYPE eventscout_ai_budget_cents gauge\n");
    out.push_str(&format!("eventscout_ai_budget_cents{{window=\"daily\"}} {}\n", snapshot.daily_cents));
    out.push_str(&format!("eventscout_ai_budget_cents{{window=\"monthly\"}} {}\n", snapshot.monthly_cents));

    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], out))
}
