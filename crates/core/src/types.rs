use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Intermediate representation produced by a feed parse or a scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedEvent {
    pub external_id: String,
    pub fingerprint: String,

    pub title: String,
    pub description: Option<String>,

    pub start_datetime: Option<DateTime<Utc>>,
    pub end_datetime: Option<DateTime<Utc>>,

    pub location_name: Option<String>,
    pub location_address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,

    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub organizer_name: Option<String>,

    pub image_url: Option<String>,
    pub source_url: Option<String>,

    pub raw_data: HashMap<String, serde_json::Value>,
    pub deep_fetched: bool,
}

impl ParsedEvent {
    pub const MAX_TITLE: usize = 200;
    pub const MAX_DESCRIPTION: usize = 5000;
    pub const MAX_ADDRESS: usize = 300;
    pub const MAX_URL: usize = 500;
    pub const MAX_EXTERNAL_ID: usize = 255;

    /// Truncates every length-bounded string field to its cap.
    pub fn enforce_field_bounds(&mut self) {
        truncate_in_place(&mut self.title, Self::MAX_TITLE);
        if let Some(d) = self.description.as_mut() {
            truncate_in_place(d, Self::MAX_DESCRIPTION);
        }
        if let Some(a) = self.location_address.as_mut() {
            truncate_in_place(a, Self::MAX_ADDRESS);
        }
        if let Some(u) = self.source_url.as_mut() {
            truncate_in_place(u, Self::MAX_URL);
        }
        if let Some(u) = self.image_url.as_mut() {
            truncate_in_place(u, Self::MAX_URL);
        }
        truncate_in_place(&mut self.external_id, Self::MAX_EXTERNAL_ID);
    }
}

fn truncate_in_place(s: &mut String, max_chars: usize) {
    if s.chars().count() > max_chars {
        *s = s.chars().take(max_chars).collect();
    }
}

/// Per-field provenance record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub value: serde_json::Value,
    pub confidence: f64,
    pub source: ExtractionSource,
    pub evidence: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    /// Lowest priority number = wins ties in the extractor-precedence fold.
    CustomSelector,
    JsonLd,
    Microdata,
    Heuristic,
    Ai,
}

impl ExtractionSource {
    /// Default confidence ranges named in 
    pub fn baseline_confidence(self) -> f64 {
        match self {
            ExtractionSource::CustomSelector => 0.95,
            ExtractionSource::JsonLd | ExtractionSource::Microdata => 0.90,
            ExtractionSource::Heuristic => 0.65,
            ExtractionSource::Ai => 0.65,
        }
    }
}

/// Output of a single extractor stage — same shape as ParsedEvent minus
/// fingerprint/deep_fetched, but every field is provenance-tagged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedEvent {
    pub fields: HashMap<String, ExtractionResult>,
}

impl ExtractedEvent {
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field).map(|r| &r.value)
    }

    pub fn get_str(&self, field: &str) -> Option<String> {
        self.get(field).and_then(|v| v.as_str()).map(str::to_string)
    }

    pub fn set(&mut self, field: &str, value: serde_json::Value, source: ExtractionSource, evidence: impl Into<String>) {
        self.fields.insert(
            field.to_string(),
            ExtractionResult {
                value,
                confidence: source.baseline_confidence(),
                source,
                evidence: evidence.into(),
            },
        );
    }

    pub fn is_empty_field(&self, field: &str) -> bool {
        match self.fields.get(field) {
            None => true,
            Some(r) => match &r.value {
                serde_json::Value::Null => true,
                serde_json::Value::String(s) => s.trim().is_empty(),
                _ => false,
            },
        }
    }
}

/// Which declarative strategies a source may run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    JsonLd,
    Microdata,
    Css,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    List,
    Calendar,
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorAttr {
    Text,
    Datetime,
    Src,
    Href,
    Content,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSelector {
    pub css: Vec<String>,
    pub attr: SelectorAttr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub next_selector: Option<String>,
    pub max_pages: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { next_selector: None, max_pages: 1 }
    }
}

/// Declarative per-source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub url: String,
    pub page_type: PageType,
    #[serde(default)]
    pub use_sitemap: bool,
    #[serde(default = "default_max_sitemap_urls")]
    pub max_sitemap_urls: usize,

    #[serde(default = "default_strategies")]
    pub strategies: Vec<Strategy>,
    #[serde(default)]
    pub selectors: HashMap<String, FieldSelector>,

    pub date_format: Option<String>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub pagination: Option<PaginationConfig>,

    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    #[serde(default = "default_true")]
    pub respect_robots: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_max_sitemap_urls() -> usize {
    200
}
fn default_strategies() -> Vec<Strategy> {
    vec![Strategy::JsonLd, Strategy::Microdata, Strategy::Css]
}
pub fn default_rate_limit_ms() -> u64 {
    2000
}
fn default_true() -> bool {
    true
}
fn default_user_agent() -> String {
    "EventscoutBot/1.0 (+https://example.invalid/bot)".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_seconds() -> u64 {
    15
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Success,
    Failed,
    Cancelled,
}

/// Queued unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub queue: String,
    pub payload: HashMap<String, serde_json::Value>,
    pub status: JobStatus,
    pub priority: i64,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub attempts: u32,
    pub max_attempts: u32,
}

impl Job {
    pub fn new(
        id: String,
        job_type: impl Into<String>,
        queue: impl Into<String>,
        payload: HashMap<String, serde_json::Value>,
        priority: i64,
        max_attempts: u32,
    ) -> Self {
        Self {
            id,
            job_type: job_type.into(),
            queue: queue.into(),
            payload,
            status: JobStatus::Queued,
            priority,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
            attempts: 0,
            max_attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Rss,
    Ics,
    Scraper,
}

/// Request body for `POST /crawl/trigger`, also the shape carried as a
/// `crawl`-type `Job`'s payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJobPayload {
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

/// Payload handed to the downstream ingest endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalCandidate {
    pub source_type: SourceType,
    pub source_url: String,
    pub external_id: Option<String>,
    pub fingerprint: String,
    pub raw_hash: String,
    pub extracted_at: DateTime<Utc>,
    pub data: HashMap<String, serde_json::Value>,
    pub ai: Option<serde_json::Value>,
    pub versions: Option<serde_json::Value>,
}

/// Structured price split into adult/child/family components.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub adult: Option<Decimal>,
    pub child: Option<Decimal>,
    pub family: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    Free,
    Paid,
    Range,
    Donation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Cancelled,
    Postponed,
    SoldOut,
    Waitlist,
    RegistrationRequired,
    Available,
}

/// Contact details extracted from visible text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
}

/// Fully canonicalized, flat event record produced by the normalizer
/// before it is flattened into `CanonicalCandidate.data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub title: String,
    pub description_short: Option<String>,
    pub description_long: Option<String>,

    pub start_datetime: Option<DateTime<chrono_tz::Tz>>,
    pub end_datetime: Option<DateTime<chrono_tz::Tz>>,

    pub venue_name: Option<String>,
    pub location_address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,

    pub price_type: PriceType,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub price_breakdown: Option<PriceBreakdown>,

    pub availability: AvailabilityStatus,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
    pub indoor_outdoor: Option<String>,
    pub language: String,
    pub recurrence_rule: Option<String>,
    pub contact: ContactInfo,
    pub images: Vec<String>,
    pub organizer_name: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Rss,
    Ics,
    Html,
    Unknown,
}
