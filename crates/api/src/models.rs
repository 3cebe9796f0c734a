//! Request/response bodies for the six inbound routes (§6).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use eventscout_core::{BudgetStatus, ScraperConfig, SourceType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    pub source_id: String,
    pub source_url: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub scraper_config: Option<ScraperConfig>,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub enable_ai: bool,
    #[serde(default)]
    pub fetch_event_pages: bool,
    #[serde(default)]
    pub ingest_run_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub job_id: String,
    pub source_id: String,
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<eventscout_core::CanonicalCandidate>>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub source_id: Option<String>,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub events_found: Option<usize>,
    pub events_new: Option<usize>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub detected_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rss_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ics_url: Option<String>,
    pub has_json_ld_events: bool,
    pub has_microdata_events: bool,
    pub sample_events: Vec<serde_json::Value>,
    pub recommendation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitemap_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SingleEventRequest {
    pub url: String,
    #[serde(default)]
    pub fields_needed: Option<Vec<String>>,
    #[serde(default)]
    pub use_ai: bool,
    #[serde(default)]
    pub detail_page_config: Option<HashMap<String, eventscout_core::FieldSelector>>,
    #[serde(default)]
    pub source_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SingleEventResponse {
    pub success: bool,
    pub fields_found: HashMap<String, serde_json::Value>,
    pub fields_missing: Vec<String>,
    pub extraction_method: String,
    pub field_provenance: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_selectors: Option<HashMap<String, eventscout_core::FieldSelector>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueueMetrics {
    pub depths: HashMap<String, usize>,
    pub total_pending: usize,
}

#[derive(Debug, Serialize)]
pub struct DlqMetrics {
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct BudgetMetrics {
    pub status: BudgetStatus,
    pub daily: u64,
    pub monthly: u64,
}

#[derive(Debug, Serialize)]
pub struct UsageWindow {
    pub events_ingested: u64,
    pub sources_crawled: u64,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub queues: QueueMetrics,
    pub dlq: DlqMetrics,
    pub budget: BudgetMetrics,
    pub usage_7d: UsageWindow,
}
