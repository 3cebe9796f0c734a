//! RSS/Atom feed parsing. `feed_rs` normalizes both dialects into one
//! `feed_rs::model::Feed`, giving a single unified `ParsedEvent` output
//! regardless of feed flavor.
//!
//! Grounded in `fourthplaces-rootsignal`'s `rootsignal-scout/src/pipeline/scraper.rs`
//! `feed_rs::parser::parse` usage.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use eventscout_core::fingerprint::fingerprint;
use eventscout_core::ParsedEvent;

/// Strips HTML tags for description fields, same simple-regex-free approach
/// used across this codebase's heuristic extractor (`scraper`'s own text()
/// walker is reserved for full documents; feed summaries are usually small
/// HTML fragments that don't need a DOM).
pub fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn parse(body: &[u8], source_url: &str) -> Result<Vec<ParsedEvent>, String> {
    let feed = feed_rs::parser::parse(body).map_err(|e| e.to_string())?;

    let mut out = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default();
        if title.is_empty() {
            // Non-empty title is required; malformed entries are swallowed
            // per-item rather than failing the whole feed.
            continue;
        }

        // Date preference: published, then updated.
        let start_datetime: Option<DateTime<Utc>> = entry.published.or(entry.updated);

        let description = entry
            .summary
            .as_ref()
            .map(|s| s.content.clone())
            .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
            .map(|s| strip_html(&s));

        let link = entry.links.first().map(|l| l.href.clone());

        // external_id preference: id, then link, then md5(title).
        let external_id = if !entry.id.trim().is_empty() {
            entry.id.clone()
        } else if let Some(l) = &link {
            l.clone()
        } else {
            format!("{:x}", md5::compute(title.as_bytes()))
        };

        let date_str = start_datetime.map(|d| d.format("%Y-%m-%d").to_string());
        let fp = fingerprint(&title, date_str.as_deref(), None);

        let mut raw_data: HashMap<String, serde_json::Value> = HashMap::new();
        raw_data.insert("feed_entry_id".to_string(), serde_json::json!(entry.id));

        let mut event = ParsedEvent {
            external_id,
            fingerprint: fp,
            title,
            description,
            start_datetime,
            end_datetime: None,
            location_name: None,
            location_address: None,
            lat: None,
            lng: None,
            price: None,
            currency: None,
            organizer_name: entry.authors.first().map(|a| a.name.clone()),
            image_url: entry.media.first().and_then(|m| {
                m.content
                    .first()
                    .and_then(|c| c.url.as_ref())
                    .map(|u| u.to_string())
            }),
            source_url: link.or_else(|| Some(source_url.to_string())),
            raw_data,
            deep_fetched: false,
        };
        event.enforce_field_bounds();
        out.push(event);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
<title>Family Events</title>
<item>
<title>Kinderkonzert</title>
<link>https://ex/x</link>
<pubDate>Sat, 14 Feb 2026 18:00:00 +0100</pubDate>
<description>Ein schoenes Konzert fuer Kinder.</description>
</item>
</channel>
</rss>"#;

    #[test]
    fn parses_rss_item_into_parsed_event() {
        let events = parse(RSS_SAMPLE.as_bytes(), "https://ex/feed.xml").unwrap();
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.title, "Kinderkonzert");
        let start = e.start_datetime.unwrap();
        assert_eq!(start.format("%Y-%m-%dT%H:%M").to_string(), "2026-02-14T17:00");
        assert_eq!(e.fingerprint.len(), 32);
        assert_eq!(
            e.fingerprint,
            eventscout_core::fingerprint::fingerprint("Kinderkonzert", Some("2026-02-14"), None)
        );
    }

    #[test]
    fn strip_html_collapses_tags_and_whitespace() {
        assert_eq!(strip_html("<p>Hello   <b>world</b></p>"), "Hello world");
    }

    #[test]
    fn entries_without_title_are_skipped() {
        let rss = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>F</title>
<item><link>https://ex/y</link></item>
</channel></rss>"#;
        let events = parse(rss.as_bytes(), "https://ex/feed.xml").unwrap();
        assert!(events.is_empty());
    }
}
