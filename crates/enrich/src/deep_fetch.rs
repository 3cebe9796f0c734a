//! Selective deep-fetch: opportunistic enrichment of `ParsedEvent`s that
//! are missing key fields, under per-domain rate limiting and bounded
//! global concurrency.
//!
//! Grounded in `crates/frontier/src/lib.rs`'s per-host instant-gated
//! concurrency pattern (`host_last_seen` + `can_visit_host`), reused here
//! via `eventscout-scraper`'s `HostThrottle`; the global concurrency cap
//! is the `futures_util::stream::buffer_unordered` equivalent of the
//! spec's `Semaphore(max_concurrent_requests)` — bounding how many detail
//! pages are in flight at once without a separate permit object.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use eventscout_core::{DeepFetchConfig, ExtractedEvent, FieldSelector, ParsedEvent};
use eventscout_extraction::ExtractionStage;
use eventscout_safety::fetch::{safe_get, FetchOptions};
use eventscout_scraper::HostThrottle;
use futures_util::stream::{self, StreamExt};
use url::Url;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeepFetchStats {
    pub total: usize,
    pub needing_fetch: usize,
    pub successful: usize,
    pub failed: usize,
    pub enriched: usize,
    pub skipped_no_url: usize,
}

/// True iff `event` is a deep-fetch candidate: fetchable `source_url`,
/// not already deep-fetched, and missing at least one required field.
fn needs_deep_fetch(event: &ParsedEvent, require_price: bool) -> bool {
    if event.deep_fetched {
        return false;
    }
    let location_thin = event
        .location_address
        .as_deref()
        .map(|a| a.trim().chars().count() < 15)
        .unwrap_or(true);
    let end_missing = event.end_datetime.is_none();
    let image_missing = event.image_url.is_none();
    let price_missing = require_price && event.price.is_none();
    location_thin || end_missing || image_missing || price_missing
}

fn is_fetchable(event: &ParsedEvent) -> bool {
    event
        .source_url
        .as_deref()
        .map(|u| u.starts_with("http://") || u.starts_with("https://"))
        .unwrap_or(false)
}

/// Runs the deep-fetch pass over a batch of events from a single crawl,
/// bounding total in-flight requests to `config.max_concurrent_requests`
/// and the gap between requests to any one domain to
/// `config.min_delay_per_domain_ms`.
pub async fn enrich_batch(
    client: &reqwest::Client,
    throttle: &HostThrottle,
    config: &DeepFetchConfig,
    detail_selectors: Option<&HashMap<String, FieldSelector>>,
    user_agent: &str,
    events: Vec<ParsedEvent>,
) -> (Vec<ParsedEvent>, DeepFetchStats) {
    let mut stats = DeepFetchStats { total: events.len(), ..Default::default() };

    let mut unchanged = Vec::new();
    let mut candidates = Vec::new();
    for event in events {
        if !needs_deep_fetch(&event, config.require_price) {
            unchanged.push(event);
        } else if !is_fetchable(&event) {
            stats.skipped_no_url += 1;
            unchanged.push(event);
        } else {
            candidates.push(event);
        }
    }
    stats.needing_fetch = candidates.len();

    let concurrency = config.max_concurrent_requests.max(1);
    let results: Vec<(ParsedEvent, bool, bool)> = stream::iter(candidates)
        .map(|event| fetch_one(client, throttle, config, detail_selectors, user_agent, event))
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut out = unchanged;
    for (event, ok, changed) in results {
        if ok {
            stats.successful += 1;
        } else {
            stats.failed += 1;
        }
        if changed {
            stats.enriched += 1;
        }
        out.push(event);
    }

    (out, stats)
}

async fn fetch_one(
    client: &reqwest::Client,
    throttle: &HostThrottle,
    config: &DeepFetchConfig,
    detail_selectors: Option<&HashMap<String, FieldSelector>>,
    user_agent: &str,
    mut event: ParsedEvent,
) -> (ParsedEvent, bool, bool) {
    let Some(source_url) = event.source_url.clone() else {
        return (event, false, false);
    };
    let Ok(url) = Url::parse(&source_url) else {
        return (event, false, false);
    };
    let host = url.host_str().unwrap_or("").to_string();

    throttle
        .wait_turn(&host, std::time::Duration::from_millis(config.min_delay_per_domain_ms))
        .await;

    let opts = FetchOptions { user_agent: user_agent.to_string(), ..FetchOptions::default() };
    let resp = match safe_get(client, url.as_str(), &opts).await {
        Ok(r) if r.status < 400 => r,
        _ => {
            event.deep_fetched = true;
            return (event, false, false);
        }
    };

    let html = String::from_utf8_lossy(&resp.body).to_string();
    let mut stages = Vec::new();
    if let Some(selectors) = detail_selectors {
        if !selectors.is_empty() {
            stages.push(ExtractionStage::CustomSelector { selectors });
        }
    }
    stages.push(ExtractionStage::StructuredData);
    stages.push(ExtractionStage::Heuristic);
    let extracted = eventscout_extraction::run(&html, &url, &stages);

    let changed = merge_into(&mut event, &extracted, config);
    event.deep_fetched = true;
    (event, true, changed)
}

fn parse_and_validate_datetime(
    extracted: &ExtractedEvent,
    field: &str,
    config: &DeepFetchConfig,
    original: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    let raw = extracted.get_str(field)?;
    let dt = DateTime::parse_from_rfc3339(&raw).ok()?.with_timezone(&Utc);
    let year = dt.year();
    if year < config.min_valid_year || year > config.max_valid_year {
        return None;
    }
    if let Some(orig) = original {
        let drift_days = (dt - orig).num_days().abs();
        if drift_days > config.max_date_drift_days {
            return None;
        }
    }
    Some(dt)
}

/// Applies the §4.10 merge rules into `event`, returning whether any
/// field actually changed.
fn merge_into(event: &mut ParsedEvent, extracted: &ExtractedEvent, config: &DeepFetchConfig) -> bool {
    let mut changed = false;

    let description_thin = event.description.as_deref().map(|d| d.trim().chars().count() < 50).unwrap_or(true);
    if description_thin {
        if let Some(desc) = extracted.get_str("description") {
            if !desc.trim().is_empty() {
                event.description = Some(desc);
                changed = true;
            }
        }
    }

    if let Some(start) = parse_and_validate_datetime(extracted, "start_datetime", config, event.start_datetime) {
        event.start_datetime = Some(start);
        changed = true;
    }

    if event.end_datetime.is_none() {
        if let Some(end) = parse_and_validate_datetime(extracted, "end_datetime", config, event.start_datetime) {
            event.end_datetime = Some(end);
            changed = true;
        }
    }

    let location_thin = event.location_address.as_deref().map(|a| a.trim().chars().count() < 15).unwrap_or(true);
    if location_thin {
        let venue = extracted.get_str("location_name").filter(|v| !v.trim().is_empty());
        let address = extracted.get_str("location_address").filter(|a| !a.trim().is_empty());
        match (venue, address) {
            (Some(v), Some(a)) => {
                event.location_address = Some(format!("{v}, {a}"));
                if event.location_name.is_none() {
                    event.location_name = Some(v);
                }
                changed = true;
            }
            (None, Some(a)) => {
                event.location_address = Some(a);
                changed = true;
            }
            (Some(v), None) => {
                if event.location_name.is_none() {
                    event.location_name = Some(v);
                    changed = true;
                }
            }
            (None, None) => {}
        }
    } else if event.location_name.is_none() {
        if let Some(v) = extracted.get_str("location_name") {
            event.location_name = Some(v);
            changed = true;
        }
    }

    if event.lat.is_none() {
        if let Some(lat) = extracted.get("lat").and_then(|v| v.as_f64()) {
            event.lat = Some(lat);
            changed = true;
        }
    }
    if event.lng.is_none() {
        if let Some(lng) = extracted.get("lng").and_then(|v| v.as_f64()) {
            event.lng = Some(lng);
            changed = true;
        }
    }

    if event.image_url.is_none() {
        if let Some(img) = extracted.get_str("image_url") {
            event.image_url = Some(img);
            changed = true;
        }
    }

    if event.price.is_none() {
        let price = extracted
            .get_str("price")
            .and_then(|p| p.parse::<rust_decimal::Decimal>().ok())
            .or_else(|| extracted.get("price").and_then(|v| v.as_f64()).and_then(rust_decimal::Decimal::from_f64_retain));
        if let Some(price) = price {
            event.price = Some(price);
            if let Some(currency) = extracted.get_str("currency") {
                event.currency = Some(currency);
            }
            changed = true;
        }
    }

    if event.organizer_name.is_none() {
        if let Some(org) = extracted.get_str("organizer_name") {
            event.organizer_name = Some(org);
            changed = true;
        }
    }

    event.enforce_field_bounds();
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventscout_core::ExtractionSource;
    use std::collections::HashMap as Map;

    fn config() -> DeepFetchConfig {
        DeepFetchConfig {
            max_concurrent_requests: 5,
            min_delay_per_domain_ms: 0,
            min_valid_year: 2020,
            max_valid_year: 2030,
            max_date_drift_days: 90,
            require_price: false,
        }
    }

    fn thin_event() -> ParsedEvent {
        ParsedEvent {
            external_id: "e1".to_string(),
            fingerprint: "f".repeat(32),
            title: "Flohmarkt".to_string(),
            description: None,
            start_datetime: Some(Utc::now()),
            end_datetime: None,
            location_name: None,
            location_address: None,
            lat: None,
            lng: None,
            price: None,
            currency: None,
            organizer_name: None,
            image_url: None,
            source_url: Some("https://ex.invalid/e1".to_string()),
            raw_data: Map::new(),
            deep_fetched: false,
        }
    }

    #[test]
    fn candidate_needs_deep_fetch_when_location_and_image_missing() {
        assert!(needs_deep_fetch(&thin_event(), false));
    }

    #[test]
    fn already_deep_fetched_event_is_skipped() {
        let mut ev = thin_event();
        ev.deep_fetched = true;
        assert!(!needs_deep_fetch(&ev, false));
    }

    #[test]
    fn well_filled_event_does_not_need_deep_fetch() {
        let mut ev = thin_event();
        ev.location_address = Some("Hermann-Levi-Platz 1, 76137 Karlsruhe".to_string());
        ev.end_datetime = Some(Utc::now());
        ev.image_url = Some("https://ex.invalid/i.jpg".to_string());
        assert!(!needs_deep_fetch(&ev, false));
    }

    #[test]
    fn merge_fills_missing_fields_and_sets_deep_fetched() {
        let mut ev = thin_event();
        let mut extracted = ExtractedEvent::default();
        extracted.set("image_url", serde_json::json!("https://ex.invalid/img.jpg"), ExtractionSource::JsonLd, "image");
        extracted.set("location_address", serde_json::json!("Hauptstr. 1, 76133 Karlsruhe"), ExtractionSource::JsonLd, "addr");
        let changed = merge_into(&mut ev, &extracted, &config());
        assert!(changed);
        assert_eq!(ev.image_url.as_deref(), Some("https://ex.invalid/img.jpg"));
        assert!(ev.location_address.unwrap().contains("76133"));
    }

    #[test]
    fn drifted_date_is_rejected() {
        let mut ev = thin_event();
        let original = ev.start_datetime;
        let mut extracted = ExtractedEvent::default();
        let far_future = (original.unwrap() + chrono::Duration::days(400)).to_rfc3339();
        extracted.set("start_datetime", serde_json::json!(far_future), ExtractionSource::JsonLd, "startDate");
        merge_into(&mut ev, &extracted, &config());
        assert_eq!(ev.start_datetime, original);
    }

    #[test]
    fn existing_end_datetime_is_not_overwritten() {
        let mut ev = thin_event();
        let existing_end = Utc::now();
        ev.end_datetime = Some(existing_end);
        let mut extracted = ExtractedEvent::default();
        extracted.set("end_datetime", serde_json::json!((existing_end + chrono::Duration::hours(1)).to_rfc3339()), ExtractionSource::JsonLd, "endDate");
        merge_into(&mut ev, &extracted, &config());
        assert_eq!(ev.end_datetime, Some(existing_end));
    }
}
