//! Sitemap Walker. Discovers event-like URLs via a site's
//! `robots.txt` `Sitemap:` directive (falling back to `/sitemap.xml`),
//! recursing into sitemap indexes and filtering to event-shaped paths.
//!
//! XML parsed with `xml-rs`'s streaming `EventReader`, the same crate and
//! pattern used for sitemap walking in `riptide-spider/src/sitemap.rs`.
//! The `robotstxt` crate reads the `Sitemap:` directive.

use once_cell::sync::Lazy;
use regex::RegexSet;
use xml::reader::{EventReader, XmlEvent};

use eventscout_safety::fetch::{safe_get, FetchOptions};
use eventscout_safety::ssrf;

/// Event-like path patterns, case-insensitive.
static EVENT_LIKE: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)/event[s]?/",
        r"(?i)/veranstaltung(en)?/",
        r"(?i)/termine?/",
        r"(?i)/kalender/",
        r"(?i)/programm/",
        r"(?i)/aktivitaet(en)?/",
        r"(?i)/angebot(e)?/",
    ])
    .expect("static event-like patterns are valid regex")
});

pub fn is_event_like(path: &str) -> bool {
    EVENT_LIKE.is_match(path)
}

#[derive(Debug, Clone, Default)]
struct SitemapParse {
    locs: Vec<String>,
}

/// Parses either a `<urlset>` or a `<sitemapindex>` document, returning
/// every `<loc>` text value it finds (caller decides how to interpret them).
fn parse_locs(xml: &str) -> SitemapParse {
    let parser = EventReader::from_str(xml);
    let mut locs = Vec::new();
    let mut in_loc = false;

    for event in parser {
        match event {
            Ok(XmlEvent::StartElement { name, .. }) => {
                if name.local_name == "loc" {
                    in_loc = true;
                }
            }
            Ok(XmlEvent::EndElement { name }) => {
                if name.local_name == "loc" {
                    in_loc = false;
                }
            }
            Ok(XmlEvent::Characters(text)) if in_loc => {
                locs.push(text.trim().to_string());
            }
            Err(_) => break,
            _ => {}
        }
    }

    SitemapParse { locs }
}

fn is_sitemap_index_child(loc: &str) -> bool {
    let lower = loc.to_ascii_lowercase();
    lower.ends_with(".xml") && lower.contains("sitemap")
}

async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
    opts: &FetchOptions,
) -> Option<String> {
    let resp = safe_get(client, url, opts).await.ok()?;
    if resp.status >= 400 {
        return None;
    }
    String::from_utf8(resp.body).ok()
}

/// Reads `robots.txt` for a `Sitemap:` directive. Fetching `/sitemap.xml`
/// itself does not re-check `Disallow` rules here — only the event pages
/// discovered from it are gated by the polite scraper's `can_fetch`.
async fn discover_sitemap_url(
    client: &reqwest::Client,
    base_url: &url::Url,
    opts: &FetchOptions,
) -> Option<String> {
    let robots_url = base_url.join("/robots.txt").ok()?;
    if let Some(text) = fetch_text(client, robots_url.as_str(), opts).await {
        for line in text.lines() {
            let line = line.trim();
            if let Some(rest) = line
                .to_ascii_lowercase()
                .strip_prefix("sitemap:")
                .map(|_| line[8..].trim().to_string())
            {
                if !rest.is_empty() {
                    return Some(rest);
                }
            }
        }
    }
    base_url.join("/sitemap.xml").ok().map(|u| u.to_string())
}

/// Walks sitemaps (recursing into sitemap indexes) and returns discovered
/// `<loc>` URLs, optionally filtered to event-like paths, capped at
/// `max_urls`.
pub async fn walk(
    client: &reqwest::Client,
    base_url: &str,
    explicit_sitemap_url: Option<&str>,
    filter_event_like: bool,
    max_urls: usize,
) -> Result<Vec<String>, String> {
    let parsed_base = url::Url::parse(base_url).map_err(|e| e.to_string())?;
    let opts = FetchOptions::default();

    let entry_url = match explicit_sitemap_url {
        Some(u) => u.to_string(),
        None => discover_sitemap_url(client, &parsed_base, &opts)
            .await
            .ok_or_else(|| "no sitemap discoverable".to_string())?,
    };

    let mut collected = Vec::new();
    let mut to_visit = vec![entry_url];
    let mut visited = std::collections::HashSet::new();
    let mut depth_guard = 0;

    while let Some(next) = to_visit.pop() {
        if collected.len() >= max_urls {
            break;
        }
        if !visited.insert(next.clone()) {
            continue;
        }
        depth_guard += 1;
        if depth_guard > 50 {
            break; // defensive bound against pathological sitemap-index cycles
        }

        // Sitemap fetches bypass robots.txt consultation but still go
        // through the SSRF guard inside `safe_get`.
        if ssrf::guard(&next).await.is_err() {
            continue;
        }

        let Some(xml) = fetch_text(client, &next, &opts).await else {
            continue;
        };
        let parsed = parse_locs(&xml);

        for loc in parsed.locs {
            if is_sitemap_index_child(&loc) {
                to_visit.push(loc);
            } else if !filter_event_like || is_event_like(&loc) {
                collected.push(loc);
                if collected.len() >= max_urls {
                    break;
                }
            }
        }
    }

    collected.truncate(max_urls);
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_like_paths_match_known_patterns() {
        assert!(is_event_like("/events/foo"));
        assert!(is_event_like("/Veranstaltungen/bar"));
        assert!(is_event_like("/termine/2026"));
        assert!(is_event_like("/kalender/"));
        assert!(is_event_like("/programm/konzerte"));
        assert!(is_event_like("/aktivitaeten/kinder"));
        assert!(is_event_like("/angebote/ferien"));
        assert!(!is_event_like("/imprint"));
    }

    #[test]
    fn parses_urlset_locs() {
        let xml = r#"<?xml version="1.0"?><urlset>
<url><loc>https://ex/events/a</loc></url>
<url><loc>https://ex/about</loc></url>
</urlset>"#;
        let parsed = parse_locs(xml);
        assert_eq!(parsed.locs, vec!["https://ex/events/a", "https://ex/about"]);
    }

    #[test]
    fn detects_sitemap_index_children() {
        assert!(is_sitemap_index_child("https://ex/sitemap-events.xml"));
        assert!(!is_sitemap_index_child("https://ex/events/a"));
    }
}
