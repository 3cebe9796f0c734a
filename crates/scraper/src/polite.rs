//! Orchestrates extraction for a single configured source: robots.txt
//! adaptive rate limit, sitemap-first discovery, then strategy sequencing
//! (structured data before falling back to CSS heuristics).

use std::collections::HashMap;
use std::time::Duration;

use eventscout_core::{ParsedEvent, ScraperConfig, Strategy};
use eventscout_extraction::{to_parsed_event, ExtractionStage};
use url::Url;

use crate::fetcher::PoliteFetcher;
use crate::robots::{fetch_policy, RobotsPolicy};
use crate::throttle::HostThrottle;

pub struct ScrapeStats {
    pub pages_fetched: usize,
    pub events_found: usize,
}

/// Runs a single source's configured scrape, returning every unique
/// (by fingerprint) `ParsedEvent` found in this pass.
pub async fn scrape_source(
    client: &reqwest::Client,
    throttle: &HostThrottle,
    config: &ScraperConfig,
) -> Result<(Vec<ParsedEvent>, ScrapeStats), String> {
    let base_url = Url::parse(&config.url).map_err(|e| e.to_string())?;

    let mut rate_limit_ms = config.rate_limit_ms.max(2000);
    let policy = if config.respect_robots {
        let policy = fetch_policy(client, &base_url, &config.user_agent).await;
        if let Some(crawl_delay) = policy.crawl_delay {
            rate_limit_ms = rate_limit_ms.max(crawl_delay.as_millis() as u64);
        }
        policy
    } else {
        RobotsPolicy::default()
    };

    let fetcher = PoliteFetcher {
        client,
        throttle,
        user_agent: config.user_agent.clone(),
        rate_limit: Duration::from_millis(rate_limit_ms),
        max_retries: config.max_retries,
        timeout: Duration::from_secs(config.timeout_seconds),
        respect_robots: config.respect_robots,
    };

    if config.use_sitemap {
        return scrape_via_sitemap(client, &fetcher, &policy, config).await;
    }
    scrape_single_page(&fetcher, &policy, config, &base_url).await
}

async fn scrape_via_sitemap(
    client: &reqwest::Client,
    fetcher: &PoliteFetcher<'_>,
    policy: &RobotsPolicy,
    config: &ScraperConfig,
) -> Result<(Vec<ParsedEvent>, ScrapeStats), String> {
    let urls = eventscout_feeds::sitemap::walk(client, &config.url, None, true, config.max_sitemap_urls).await?;

    let mut events = Vec::new();
    let mut seen_fingerprints = std::collections::HashSet::new();
    let mut pages_fetched = 0;

    for url_str in urls {
        let Ok(url) = Url::parse(&url_str) else { continue };
        let Some(resp) = fetcher.get(&url, policy).await.map_err(|e| e.to_string())? else {
            continue;
        };
        pages_fetched += 1;

        let html = String::from_utf8_lossy(&resp.body).to_string();
        let stages = [ExtractionStage::StructuredData];
        let extracted = eventscout_extraction::run(&html, &url, &stages);

        if let Some(event) = to_parsed_event(&extracted, url.as_str()) {
            if seen_fingerprints.insert(event.fingerprint.clone()) {
                events.push(event);
            }
        }
    }

    let stats = ScrapeStats { pages_fetched, events_found: events.len() };
    Ok((events, stats))
}

async fn scrape_single_page(
    fetcher: &PoliteFetcher<'_>,
    policy: &RobotsPolicy,
    config: &ScraperConfig,
    base_url: &Url,
) -> Result<(Vec<ParsedEvent>, ScrapeStats), String> {
    let Some(resp) = fetcher.get(base_url, policy).await.map_err(|e| e.to_string())? else {
        return Ok((Vec::new(), ScrapeStats { pages_fetched: 0, events_found: 0 }));
    };
    let html = String::from_utf8_lossy(&resp.body).to_string();

    let structured_only = ExtractionStage::StructuredData;
    let structured_result = eventscout_extraction::run(&html, base_url, std::slice::from_ref(&structured_only));
    let has_structured_event = !structured_result.fields.is_empty();

    let extracted = if has_structured_event {
        structured_result
    } else if config.strategies.contains(&Strategy::Css) {
        let stages = eventscout_extraction::default_stages(&config.strategies, Some(&config.selectors));
        eventscout_extraction::run(&html, base_url, &stages)
    } else {
        eventscout_core::ExtractedEvent::default()
    };

    let events = to_parsed_event(&extracted, base_url.as_str()).into_iter().collect::<Vec<_>>();
    let stats = ScrapeStats { pages_fetched: 1, events_found: events.len() };
    Ok((events, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_floor_is_two_seconds() {
        let config = ScraperConfig {
            url: "https://example.invalid/".to_string(),
            page_type: eventscout_core::PageType::Single,
            use_sitemap: false,
            max_sitemap_urls: 200,
            strategies: vec![Strategy::JsonLd, Strategy::Css],
            selectors: HashMap::new(),
            date_format: None,
            timezone: None,
            pagination: None,
            rate_limit_ms: 500,
            respect_robots: true,
            user_agent: "EventscoutBot/1.0".to_string(),
            max_retries: 3,
            timeout_seconds: 15,
        };
        assert!(config.rate_limit_ms.max(2000) >= 2000);
    }
}
