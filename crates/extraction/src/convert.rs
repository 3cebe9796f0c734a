//! Converts an `ExtractedEvent` produced by the pipeline fold into a
//! `ParsedEvent`, computing the stable fingerprint from the title/date/
//! address triad the same way the feed parsers do.

use eventscout_core::{fingerprint::fingerprint, ExtractedEvent, ParsedEvent};
use std::collections::HashMap;

/// Builds a `ParsedEvent` from extracted fields. Returns `None` if the
/// title field is absent or empty, since `ParsedEvent::title` must be
/// non-empty.
pub fn to_parsed_event(extracted: &ExtractedEvent, source_url: &str) -> Option<ParsedEvent> {
    let title = extracted.get_str("title").filter(|t| !t.trim().is_empty())?;

    let start_datetime = extracted
        .get_str("start_datetime")
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&chrono::Utc));
    let end_datetime = extracted
        .get_str("end_datetime")
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&chrono::Utc));

    let location_address = extracted.get_str("location_address");
    let date_str = start_datetime.map(|d| d.format("%Y-%m-%d").to_string());
    let fp = fingerprint(&title, date_str.as_deref(), location_address.as_deref());

    let price = extracted
        .get_str("price")
        .and_then(|p| p.parse::<rust_decimal::Decimal>().ok())
        .or_else(|| extracted.get("price").and_then(|v| v.as_f64()).and_then(rust_decimal::Decimal::from_f64_retain));

    let mut raw_data: HashMap<String, serde_json::Value> = HashMap::new();
    for (field, result) in &extracted.fields {
        raw_data.insert(field.clone(), serde_json::json!({"source": result.source, "evidence": result.evidence}));
    }

    let mut event = ParsedEvent {
        external_id: source_url.to_string(),
        fingerprint: fp,
        title,
        description: extracted.get_str("description"),
        start_datetime,
        end_datetime,
        location_name: extracted.get_str("location_name"),
        location_address,
        lat: extracted.get("lat").and_then(|v| v.as_f64()),
        lng: extracted.get("lng").and_then(|v| v.as_f64()),
        price,
        currency: extracted.get_str("currency"),
        organizer_name: extracted.get_str("organizer_name"),
        image_url: extracted.get_str("image_url"),
        source_url: Some(source_url.to_string()),
        raw_data,
        deep_fetched: false,
    };
    event.enforce_field_bounds();
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventscout_core::ExtractionSource;

    #[test]
    fn builds_parsed_event_with_fingerprint() {
        let mut ev = ExtractedEvent::default();
        ev.set("title", serde_json::json!("Kinderkonzert"), ExtractionSource::JsonLd, "name");
        ev.set("start_datetime", serde_json::json!("2026-02-14T18:00:00+01:00"), ExtractionSource::JsonLd, "startDate");

        let parsed = to_parsed_event(&ev, "https://ex/1").unwrap();
        assert_eq!(parsed.title, "Kinderkonzert");
        assert_eq!(parsed.fingerprint.len(), 32);
        assert!(!parsed.deep_fetched);
    }

    #[test]
    fn missing_title_yields_none() {
        let ev = ExtractedEvent::default();
        assert!(to_parsed_event(&ev, "https://ex/1").is_none());
    }
}
