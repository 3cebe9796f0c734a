//! Inbound HTTP surface (§6): the six routes the worker's job queue and
//! crawl pipeline sit behind. Built axum-`Router` style, with tower-http
//! trace and cors layering.

pub mod error;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = if state.worker.app_config.api.cors_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any)
    } else {
        let origins: Vec<_> = state
            .worker
            .app_config
            .api
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins).allow_methods(Any)
    };

    Router::new()
        .route("/crawl/trigger", post(routes::trigger))
        .route("/crawl/status/:job_id", get(routes::status))
        .route("/crawl/detect", post(routes::detect))
        .route("/crawl/single-event", post(routes::single_event))
        .route("/metrics", get(metrics::metrics))
        .route("/metrics/prometheus", get(metrics::metrics_prometheus))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use eventscout_core::{AiConfig, ApiConfig, AppConfig, DeepFetchConfig, GeneralConfig, IngestConfig, QueueConfig, ScraperDefaults};
    use tower::ServiceExt;

    fn test_config() -> AppConfig {
        AppConfig {
            general: GeneralConfig { log_level: "info".into(), log_format: "text".into() },
            scraper: ScraperDefaults {
                default_rate_limit_ms: 2000,
                default_max_retries: 3,
                default_timeout_seconds: 15,
                max_body_bytes: 5 * 1024 * 1024,
                user_agent: "EventscoutBot/1.0".into(),
            },
            deep_fetch: DeepFetchConfig {
                max_concurrent_requests: 5,
                min_delay_per_domain_ms: 2000,
                min_valid_year: 2020,
                max_valid_year: 2030,
                max_date_drift_days: 90,
                require_price: false,
            },
            queue: QueueConfig {
                redis_url: None,
                crawl_lock_ttl_seconds: 300,
                job_ttl_hours: 24,
                result_ttl_hours: 1,
                default_max_attempts: 5,
            },
            ingest: IngestConfig { backend_url: "https://backend.invalid".into(), service_token: None },
            ai: AiConfig { enabled: false, openai_api_key: None, anthropic_api_key: None, daily_budget_cents: 500, monthly_budget_cents: 10_000 },
            api: ApiConfig { port: 8080, cors_origins: Vec::new() },
        }
    }

    #[tokio::test]
    async fn single_event_rejects_ssrf_target() {
        let state = AppState::new(test_config(), eventscout_queue::JobQueue::memory(), reqwest::Client::new());
        let app = router(state);
        let body = serde_json::json!({ "url": "http://10.0.0.1/x" });
        let request = Request::builder()
            .method("POST")
            .uri("/crawl/single-event")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["success"], false);
        assert!(parsed["error"].as_str().unwrap().starts_with("URL blocked"));
    }

    #[tokio::test]
    async fn status_for_unknown_job_is_404() {
        let state = AppState::new(test_config(), eventscout_queue::JobQueue::memory(), reqwest::Client::new());
        let app = router(state);
        let request = Request::builder()
            .uri("/crawl/status/does-not-exist")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_reports_empty_queues() {
        let state = AppState::new(test_config(), eventscout_queue::JobQueue::memory(), reqwest::Client::new());
        let app = router(state);
        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["queues"]["total_pending"], 0);
        assert_eq!(parsed["dlq"]["count"], 0);
    }
}
