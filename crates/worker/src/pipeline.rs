//! The crawl job handler: source fetch -> extraction -> deep-fetch ->
//! normalize -> dedupe -> ingest, matching the control flow spec.md §2
//! lays out: "the worker consumes a crawl job, invokes the appropriate
//! parser ..., the polite scraper coordinates extraction strategies, the
//! deep-fetcher enriches under-filled results, the normalizer finalizes
//! fields, the deduplicator removes in-run duplicates, and the worker
//! POSTs the batch to the external ingest endpoint".

use std::collections::HashMap;

use chrono::Utc;
use eventscout_core::{
    AppConfig, CanonicalCandidate, CrawlJobPayload, NormalizedEvent, ParsedEvent, SourceType,
};
use eventscout_enrich::{dedupe, deep_fetch, normalize};
use eventscout_scraper::HostThrottle;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::ingest::{IngestAction, IngestClient, RunStatus, RunStatusUpdate};

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestCounters {
    pub created: usize,
    pub updated: usize,
    pub duplicate: usize,
    pub error: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Partial,
    Failed,
}

pub struct CrawlRunResult {
    pub events_found: usize,
    pub counters: IngestCounters,
    pub outcome: JobOutcome,
    pub candidates: Vec<CanonicalCandidate>,
}

/// Runs the full pipeline for one crawl payload. `ingest` is `None` for a
/// dry run: candidates are computed and returned but never POSTed.
pub async fn run_crawl_job(
    payload: &CrawlJobPayload,
    app_config: &AppConfig,
    client: &reqwest::Client,
    throttle: &HostThrottle,
    ingest: Option<&IngestClient>,
) -> Result<CrawlRunResult, String> {
    let raw_events = fetch_source(payload, client, app_config).await?;
    let source_type = payload.source_type;

    let (fetched, _deep_stats) = deep_fetch::enrich_batch(
        client,
        throttle,
        &app_config.deep_fetch,
        payload.scraper_config.as_ref().map(|c| &c.selectors),
        &app_config.scraper.user_agent,
        raw_events,
    )
    .await;

    let (deduped, _dedupe_stats) = dedupe::dedupe(fetched, |e: &ParsedEvent| e.fingerprint.clone());

    let mut candidates = Vec::with_capacity(deduped.len());
    for event in &deduped {
        let normalized = normalize(event);
        candidates.push(to_canonical(source_type, event, &normalized));
    }

    let events_found = candidates.len();
    if ingest.is_none() {
        return Ok(CrawlRunResult {
            events_found,
            counters: IngestCounters::default(),
            outcome: JobOutcome::Success,
            candidates,
        });
    }
    let ingest = ingest.unwrap();

    let mut counters = IngestCounters::default();
    for candidate in &candidates {
        match ingest.ingest_event(candidate).await {
            Ok(IngestAction::Created) => counters.created += 1,
            Ok(IngestAction::Updated) => counters.updated += 1,
            Ok(IngestAction::Duplicate) => counters.duplicate += 1,
            Ok(IngestAction::Error) => counters.error += 1,
            Err(err) => {
                warn!(error = %err, source_url = %candidate.source_url, "ingest call failed");
                counters.error += 1;
            }
        }
    }

    let emitted_ok = counters.created + counters.updated + counters.duplicate;
    let outcome = if events_found == 0 {
        JobOutcome::Success
    } else if emitted_ok == events_found {
        JobOutcome::Success
    } else if emitted_ok > 0 {
        JobOutcome::Partial
    } else {
        JobOutcome::Failed
    };

    Ok(CrawlRunResult { events_found, counters, outcome, candidates })
}

async fn fetch_source(
    payload: &CrawlJobPayload,
    client: &reqwest::Client,
    app_config: &AppConfig,
) -> Result<Vec<ParsedEvent>, String> {
    match payload.source_type {
        SourceType::Rss => {
            let resp = eventscout_safety::safe_get(client, &payload.source_url, &fetch_opts(app_config))
                .await
                .map_err(|e| e.to_string())?;
            eventscout_feeds::parse_rss_atom(&resp.body, &payload.source_url)
        }
        SourceType::Ics => {
            let resp = eventscout_safety::safe_get(client, &payload.source_url, &fetch_opts(app_config))
                .await
                .map_err(|e| e.to_string())?;
            let body = String::from_utf8_lossy(&resp.body).into_owned();
            eventscout_feeds::parse_ics(&body, &payload.source_url)
        }
        SourceType::Scraper => {
            let config = payload
                .scraper_config
                .clone()
                .ok_or_else(|| "scraper source requires scraper_config".to_string())?;
            let throttle = HostThrottle::new();
            let (events, stats) = eventscout_scraper::scrape_source(client, &throttle, &config).await?;
            info!(pages = stats.pages_fetched, found = stats.events_found, "scraper pass complete");
            Ok(events)
        }
    }
}

fn fetch_opts(app_config: &AppConfig) -> eventscout_safety::FetchOptions {
    eventscout_safety::FetchOptions {
        timeout: std::time::Duration::from_secs(app_config.scraper.default_timeout_seconds),
        user_agent: app_config.scraper.user_agent.clone(),
        ..Default::default()
    }
}

fn to_canonical(source_type: SourceType, parsed: &ParsedEvent, normalized: &NormalizedEvent) -> CanonicalCandidate {
    let data = flatten(normalized);
    let raw_hash = hash_payload(&data);
    CanonicalCandidate {
        source_type,
        source_url: parsed.source_url.clone().unwrap_or_default(),
        external_id: Some(parsed.external_id.clone()),
        fingerprint: parsed.fingerprint.clone(),
        raw_hash,
        extracted_at: Utc::now(),
        data,
        ai: None,
        versions: None,
    }
}

fn flatten(normalized: &NormalizedEvent) -> HashMap<String, serde_json::Value> {
    match serde_json::to_value(normalized) {
        Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
        _ => HashMap::new(),
    }
}

/// 32-char hash of the flattened payload, used by the downstream store for
/// change detection between crawls of the same event.
fn hash_payload(data: &HashMap<String, serde_json::Value>) -> String {
    let mut keys: Vec<&String> = data.keys().collect();
    keys.sort();
    let mut canonical = String::new();
    for key in keys {
        canonical.push_str(key);
        canonical.push('=');
        canonical.push_str(&data[key].to_string());
        canonical.push('\n');
    }
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)[..32].to_string()
}

pub fn run_status_update(result: &CrawlRunResult) -> RunStatusUpdate {
    let status = match result.outcome {
        JobOutcome::Success => RunStatus::Success,
        JobOutcome::Partial => RunStatus::Partial,
        JobOutcome::Failed => RunStatus::NeedsAttention,
    };
    RunStatusUpdate {
        status,
        events_found: result.events_found,
        events_created: result.counters.created,
        events_updated: result.counters.updated,
        events_skipped: result.counters.duplicate,
        error_message: if result.outcome == JobOutcome::Failed {
            Some("all ingest calls failed".to_string())
        } else {
            None
        },
        error_details: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_regardless_of_key_insertion_order() {
        let mut a = HashMap::new();
        a.insert("title".to_string(), serde_json::json!("Flohmarkt"));
        a.insert("language".to_string(), serde_json::json!("de"));

        let mut b = HashMap::new();
        b.insert("language".to_string(), serde_json::json!("de"));
        b.insert("title".to_string(), serde_json::json!("Flohmarkt"));

        assert_eq!(hash_payload(&a), hash_payload(&b));
        assert_eq!(hash_payload(&a).len(), 32);
    }

    #[test]
    fn hash_changes_when_a_value_changes() {
        let mut a = HashMap::new();
        a.insert("title".to_string(), serde_json::json!("Flohmarkt"));
        let mut b = a.clone();
        b.insert("title".to_string(), serde_json::json!("Konzert"));
        assert_ne!(hash_payload(&a), hash_payload(&b));
    }

    #[test]
    fn success_outcome_when_every_event_ingests_cleanly() {
        let result = CrawlRunResult {
            events_found: 2,
            counters: IngestCounters { created: 1, updated: 1, duplicate: 0, error: 0 },
            outcome: JobOutcome::Success,
            candidates: Vec::new(),
        };
        let update = run_status_update(&result);
        assert_eq!(update.events_created, 1);
        assert!(update.error_message.is_none());
    }
}
