//! Custom-selector extractor: runs a source's declared `FieldSelector`
//! map against a parsed document. Highest-precedence extractor, since an
//! operator hand-wrote the selectors for this exact source.
//!
//! Grounded in `crates/parser/src/html.rs`'s selector-list-with-fallback
//! pattern (try each CSS candidate in order, first non-empty match wins).

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use eventscout_core::{ExtractionSource, FieldSelector, SelectorAttr};
use scraper::Html;

use crate::dom::{resolve_url, selector};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y",
    "%Y-%m-%d",
];

/// Fields whose alias is the canonical name used elsewhere in the
/// pipeline, for sources whose config still uses the older name.
fn canonical_field(name: &str) -> &str {
    match name {
        "image" => "image_url",
        "organizer" => "organizer_name",
        other => other,
    }
}

fn parse_flexible_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()));
        }
    }
    DateTime::parse_from_rfc3339(trimmed).ok().map(|dt| dt.with_timezone(&Utc))
}

fn extract_attr_value(el: &scraper::ElementRef, attr: SelectorAttr) -> Option<String> {
    let value = match attr {
        SelectorAttr::Text => el.text().collect::<Vec<_>>().join(" "),
        SelectorAttr::Datetime => el
            .value()
            .attr("datetime")
            .map(str::to_string)
            .unwrap_or_else(|| el.text().collect::<String>()),
        SelectorAttr::Src => el.value().attr("src").unwrap_or("").to_string(),
        SelectorAttr::Href => el.value().attr("href").unwrap_or("").to_string(),
        SelectorAttr::Content => el.value().attr("content").unwrap_or("").to_string(),
    };
    let trimmed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn find_first_match(document: &Html, field_selector: &FieldSelector) -> Option<String> {
    for css in &field_selector.css {
        let Some(sel) = selector(css) else { continue };
        if let Some(el) = document.select(&sel).next() {
            if let Some(value) = extract_attr_value(&el, field_selector.attr) {
                return Some(value);
            }
        }
    }
    None
}

/// Runs every configured selector against the document, producing an
/// `ExtractedEvent` tagged `ExtractionSource::CustomSelector`.
pub fn extract(
    html: &str,
    selectors: &HashMap<String, FieldSelector>,
    base_url: &url::Url,
) -> eventscout_core::ExtractedEvent {
    let document = Html::parse_document(html);
    let mut ev = eventscout_core::ExtractedEvent::default();

    for (field, field_selector) in selectors {
        let Some(raw) = find_first_match(&document, field_selector) else {
            continue;
        };
        let canonical = canonical_field(field);
        let evidence = format!("selector:{}", field_selector.css.join(","));

        match canonical {
            "start_datetime" | "end_datetime" => {
                if let Some(dt) = parse_flexible_datetime(&raw) {
                    ev.set(canonical, serde_json::json!(dt.to_rfc3339()), ExtractionSource::CustomSelector, evidence);
                }
            }
            "image_url" | "source_url" => {
                if let Some(resolved) = resolve_url(base_url, &raw) {
                    ev.set(canonical, serde_json::json!(resolved), ExtractionSource::CustomSelector, evidence);
                }
            }
            _ => {
                ev.set(canonical, serde_json::json!(raw), ExtractionSource::CustomSelector, evidence);
            }
        }
    }

    ev
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(css: &[&str], attr: SelectorAttr) -> FieldSelector {
        FieldSelector {
            css: css.iter().map(|s| s.to_string()).collect(),
            attr,
        }
    }

    #[test]
    fn extracts_configured_fields_with_fallback_chain() {
        let html = r#"<html><body>
        <h2 class="title">Familien-Flohmarkt</h2>
        <time class="when" datetime="2026-06-01T10:00:00+02:00">1. Juni</time>
        <img class="cover" src="/img/flohmarkt.jpg">
        </body></html>"#;
        let mut selectors = HashMap::new();
        selectors.insert("title".to_string(), field(&["h1.title", "h2.title"], SelectorAttr::Text));
        selectors.insert("start_datetime".to_string(), field(&["time.when"], SelectorAttr::Datetime));
        selectors.insert("image".to_string(), field(&["img.cover"], SelectorAttr::Src));

        let base = url::Url::parse("https://example.invalid/events/1").unwrap();
        let ev = extract(html, &selectors, &base);

        assert_eq!(ev.get_str("title").unwrap(), "Familien-Flohmarkt");
        assert_eq!(ev.get_str("image_url").unwrap(), "https://example.invalid/img/flohmarkt.jpg");
        assert!(ev.get_str("start_datetime").unwrap().starts_with("2026-06-01T08:00:00"));
    }

    #[test]
    fn missing_selector_leaves_field_absent() {
        let html = "<html><body></body></html>";
        let mut selectors = HashMap::new();
        selectors.insert("title".to_string(), field(&["h1.missing"], SelectorAttr::Text));
        let base = url::Url::parse("https://example.invalid/").unwrap();
        let ev = extract(html, &selectors, &base);
        assert!(ev.is_empty_field("title"));
    }

    #[test]
    fn organizer_alias_maps_to_canonical_name() {
        let html = r#"<span class="org">Stadtjugendring</span>"#;
        let mut selectors = HashMap::new();
        selectors.insert("organizer".to_string(), field(&["span.org"], SelectorAttr::Text));
        let base = url::Url::parse("https://example.invalid/").unwrap();
        let ev = extract(html, &selectors, &base);
        assert_eq!(ev.get_str("organizer_name").unwrap(), "Stadtjugendring");
    }
}
