use serde::Deserialize;

/// Top-level, immutable-after-startup configuration. Loaded from a TOML
/// base file and overlaid with environment variables: the same
/// `AppConfig`/`config/default.toml` split this codebase has always used.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub scraper: ScraperDefaults,
    pub deep_fetch: DeepFetchConfig,
    pub queue: QueueConfig,
    pub ingest: IngestConfig,
    pub ai: AiConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScraperDefaults {
    #[serde(default = "default_rate_limit_ms")]
    pub default_rate_limit_ms: u64,
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,
    #[serde(default = "default_timeout_seconds")]
    pub default_timeout_seconds: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeepFetchConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_min_delay_per_domain_ms")]
    pub min_delay_per_domain_ms: u64,
    #[serde(default = "default_min_valid_year")]
    pub min_valid_year: i32,
    #[serde(default = "default_max_valid_year")]
    pub max_valid_year: i32,
    #[serde(default = "default_max_date_drift_days")]
    pub max_date_drift_days: i64,
    #[serde(default)]
    pub require_price: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    pub redis_url: Option<String>,
    #[serde(default = "default_crawl_lock_ttl")]
    pub crawl_lock_ttl_seconds: u64,
    #[serde(default = "default_job_ttl_hours")]
    pub job_ttl_hours: i64,
    #[serde(default = "default_result_ttl_hours")]
    pub result_ttl_hours: i64,
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    pub backend_url: String,
    pub service_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    #[serde(default = "default_daily_budget_cents")]
    pub daily_budget_cents: u64,
    #[serde(default = "default_monthly_budget_cents")]
    pub monthly_budget_cents: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ApiConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_rate_limit_ms() -> u64 {
    2000
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_seconds() -> u64 {
    15
}
fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024
}
fn default_user_agent() -> String {
    "EventscoutBot/1.0 (+https://example.invalid/bot)".to_string()
}
fn default_max_concurrent() -> usize {
    5
}
fn default_min_delay_per_domain_ms() -> u64 {
    2000
}
fn default_min_valid_year() -> i32 {
    2020
}
fn default_max_valid_year() -> i32 {
    2030
}
fn default_max_date_drift_days() -> i64 {
    90
}
fn default_crawl_lock_ttl() -> u64 {
    300
}
fn default_job_ttl_hours() -> i64 {
    24
}
fn default_result_ttl_hours() -> i64 {
    1
}
fn default_max_attempts() -> u32 {
    5
}
fn default_daily_budget_cents() -> u64 {
    500
}
fn default_monthly_budget_cents() -> u64 {
    10_000
}
fn default_port() -> u16 {
    8080
}

impl AppConfig {
    /// Loads the base TOML file then layers environment-variable overrides on
    /// top, following the same hand-rolled env-override pattern rather
    /// than pulling in a config-merging crate.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config file {path}: {e}"))?;
        let mut cfg: AppConfig = toml::from_str(&raw)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("REDIS_URL") {
            self.queue.redis_url = Some(v);
        }
        if let Ok(v) = std::env::var("BACKEND_URL") {
            self.ingest.backend_url = v;
        }
        if let Ok(v) = std::env::var("SERVICE_TOKEN") {
            self.ingest.service_token = Some(v);
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            self.ai.openai_api_key = Some(v);
        }
        if let Ok(v) = std::env::var("ANTHROPIC_API_KEY") {
            self.ai.anthropic_api_key = Some(v);
        }
        if let Ok(v) = std::env::var("ENABLE_AI") {
            self.ai.enabled = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            self.general.log_level = v;
        }
        if let Ok(v) = std::env::var("LOG_FORMAT") {
            self.general.log_format = v;
        }
        if let Ok(v) = std::env::var("CORS_ORIGINS") {
            self.api.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = std::env::var("MAX_CONCURRENT_PER_DOMAIN") {
            if let Ok(n) = v.parse() {
                self.deep_fetch.max_concurrent_requests = n;
            }
        }
        if let Ok(v) = std::env::var("CRAWL_LOCK_TTL_SECONDS") {
            if let Ok(n) = v.parse() {
                self.queue.crawl_lock_ttl_seconds = n;
            }
        }
    }
}
