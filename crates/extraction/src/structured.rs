//! Structured-data extractor: JSON-LD via `<script
//! type="application/ld+json">` tree-walking, and schema.org microdata via
//! `[itemtype]`/`[itemprop]` selectors. Both populate the same
//! `ExtractedEvent`, tagged `ExtractionSource::JsonLd` /
//! `ExtractionSource::Microdata`.

use eventscout_core::{ExtractedEvent, ExtractionSource};
use scraper::Html;

use crate::dom::{resolve_url, selector, text_of};

const EVENT_TYPES: &[&str] = &[
    "Event",
    "SocialEvent",
    "ChildrensEvent",
    "MusicEvent",
    "TheaterEvent",
    "SportsEvent",
    "ExhibitionEvent",
    "Festival",
    "CourseInstance",
];

fn is_event_type(t: &str) -> bool {
    let short = t.rsplit('/').next().unwrap_or(t);
    EVENT_TYPES.iter().any(|e| e.eq_ignore_ascii_case(short))
}

/// Extracts every JSON-LD event found in the document's `<script
/// type="application/ld+json">` blocks. Multiple events per page are
/// supported (`@graph` arrays, top-level arrays, or a single object).
pub fn extract_jsonld(html: &str) -> Vec<ExtractedEvent> {
    let document = Html::parse_document(html);
    let Some(sel) = selector(r#"script[type="application/ld+json"]"#) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for script in document.select(&sel) {
        let raw = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) else {
            continue; // malformed JSON-LD blocks are swallowed per-item, not fatal
        };
        collect_events_from_value(&value, &mut out);
    }
    out
}

fn collect_events_from_value(value: &serde_json::Value, out: &mut Vec<ExtractedEvent>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_events_from_value(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            if let Some(graph) = map.get("@graph") {
                collect_events_from_value(graph, out);
                return;
            }
            let type_matches = map
                .get("@type")
                .map(|t| match t {
                    serde_json::Value::String(s) => is_event_type(s),
                    serde_json::Value::Array(types) => types
                        .iter()
                        .filter_map(|v| v.as_str())
                        .any(is_event_type),
                    _ => false,
                })
                .unwrap_or(false);
            if type_matches {
                if let Some(ev) = map_jsonld_object(map) {
                    out.push(ev);
                }
            }
        }
        _ => {}
    }
}

fn map_jsonld_object(map: &serde_json::Map<String, serde_json::Value>) -> Option<ExtractedEvent> {
    let mut ev = ExtractedEvent::default();

    let name = map
        .get("name")
        .and_then(|v| v.as_str())
        .or_else(|| map.get("headline").and_then(|v| v.as_str()));
    let name = name?.trim();
    if name.is_empty() {
        return None;
    }
    ev.set("title", serde_json::json!(name), ExtractionSource::JsonLd, "name|headline");

    if let Some(v) = map.get("startDate").and_then(|v| v.as_str()) {
        ev.set("start_datetime", serde_json::json!(v), ExtractionSource::JsonLd, "startDate");
    }
    if let Some(v) = map.get("endDate").and_then(|v| v.as_str()) {
        ev.set("end_datetime", serde_json::json!(v), ExtractionSource::JsonLd, "endDate");
    }
    if let Some(v) = map.get("description").and_then(|v| v.as_str()) {
        ev.set("description", serde_json::json!(v), ExtractionSource::JsonLd, "description");
    }

    if let Some(loc) = map.get("location") {
        map_location(loc, &mut ev);
    }

    if let Some(offers) = map.get("offers") {
        map_offers(offers, &mut ev);
    }

    if let Some(org) = map.get("organizer").and_then(|v| v.get("name")).and_then(|v| v.as_str()) {
        ev.set("organizer_name", serde_json::json!(org), ExtractionSource::JsonLd, "organizer.name");
    }

    if let Some(image_url) = map.get("image").and_then(extract_image) {
        ev.set("image_url", serde_json::json!(image_url), ExtractionSource::JsonLd, "image");
    }

    Some(ev)
}

fn map_location(loc: &serde_json::Value, ev: &mut ExtractedEvent) {
    let obj = match loc {
        serde_json::Value::Object(m) => m,
        serde_json::Value::String(s) => {
            ev.set("location_name", serde_json::json!(s), ExtractionSource::JsonLd, "location");
            return;
        }
        _ => return,
    };

    if let Some(name) = obj.get("name").and_then(|v| v.as_str()) {
        ev.set("location_name", serde_json::json!(name), ExtractionSource::JsonLd, "location.name");
    }

    if let Some(addr) = obj.get("address") {
        match addr {
            serde_json::Value::String(s) => {
                ev.set("location_address", serde_json::json!(s), ExtractionSource::JsonLd, "location.address");
            }
            serde_json::Value::Object(addr_obj) => {
                let street = addr_obj.get("streetAddress").and_then(|v| v.as_str());
                let postal = addr_obj.get("postalCode").and_then(|v| v.as_str());
                let locality = addr_obj.get("addressLocality").and_then(|v| v.as_str());
                let parts: Vec<&str> = [street, postal, locality].into_iter().flatten().collect();
                if !parts.is_empty() {
                    let joined = parts.join(", ");
                    ev.set(
                        "location_address",
                        serde_json::json!(joined),
                        ExtractionSource::JsonLd,
                        "location.address (PostalAddress)",
                    );
                }
            }
            _ => {}
        }
    }

    if let Some(geo) = obj.get("geo") {
        if let Some(lat) = geo.get("latitude").and_then(number) {
            ev.set("lat", serde_json::json!(lat), ExtractionSource::JsonLd, "location.geo.latitude");
        }
        if let Some(lng) = geo.get("longitude").and_then(number) {
            ev.set("lng", serde_json::json!(lng), ExtractionSource::JsonLd, "location.geo.longitude");
        }
    }
}

fn map_offers(offers: &serde_json::Value, ev: &mut ExtractedEvent) {
    // Take the first offer if an array.
    let offer = match offers {
        serde_json::Value::Array(items) => items.first(),
        other => Some(other),
    };
    let Some(offer) = offer else { return };

    if let Some(price) = offer.get("price").and_then(number) {
        ev.set("price", serde_json::json!(price), ExtractionSource::JsonLd, "offers.price");
    }
    if let Some(currency) = offer.get("priceCurrency").and_then(|v| v.as_str()) {
        ev.set("currency", serde_json::json!(currency), ExtractionSource::JsonLd, "offers.priceCurrency");
    }
}

fn number(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn extract_image(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(m) => m.get("url").and_then(|v| v.as_str()).map(str::to_string),
        serde_json::Value::Array(items) => items.first().and_then(extract_image),
        _ => None,
    }
}

/// Extracts microdata events: elements whose `itemtype` contains
/// `schema.org/<EventType>`, reading `itemprop` descendants with value
/// preference `content -> datetime -> text`.
pub fn extract_microdata(html: &str, base_url: &url::Url) -> Vec<ExtractedEvent> {
    let document = Html::parse_document(html);
    let Some(item_sel) = selector("[itemtype]") else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for scope in document.select(&item_sel) {
        let itemtype = scope.value().attr("itemtype").unwrap_or("");
        let type_name = itemtype.rsplit('/').next().unwrap_or("");
        if !is_event_type(type_name) {
            continue;
        }

        let mut ev = ExtractedEvent::default();
        let Some(prop_sel) = selector("[itemprop]") else {
            continue;
        };

        for prop_el in scope.select(&prop_sel) {
            let Some(prop) = prop_el.value().attr("itemprop") else {
                continue;
            };
            let value = prop_el
                .value()
                .attr("content")
                .map(str::to_string)
                .or_else(|| prop_el.value().attr("datetime").map(str::to_string))
                .unwrap_or_else(|| text_of(&prop_el));
            if value.trim().is_empty() {
                continue;
            }
            map_microdata_prop(prop, &value, base_url, &mut ev);
        }

        if !ev.fields.is_empty() {
            out.push(ev);
        }
    }

    out
}

fn map_microdata_prop(prop: &str, value: &str, base_url: &url::Url, ev: &mut ExtractedEvent) {
    match prop {
        "name" => ev.set("title", serde_json::json!(value), ExtractionSource::Microdata, "itemprop=name"),
        "startDate" => ev.set("start_datetime", serde_json::json!(value), ExtractionSource::Microdata, "itemprop=startDate"),
        "endDate" => ev.set("end_datetime", serde_json::json!(value), ExtractionSource::Microdata, "itemprop=endDate"),
        "description" => ev.set("description", serde_json::json!(value), ExtractionSource::Microdata, "itemprop=description"),
        "location" => ev.set("location_name", serde_json::json!(value), ExtractionSource::Microdata, "itemprop=location"),
        "address" => ev.set("location_address", serde_json::json!(value), ExtractionSource::Microdata, "itemprop=address"),
        "price" => ev.set("price", serde_json::json!(value), ExtractionSource::Microdata, "itemprop=price"),
        "priceCurrency" => ev.set("currency", serde_json::json!(value), ExtractionSource::Microdata, "itemprop=priceCurrency"),
        "organizer" => ev.set("organizer_name", serde_json::json!(value), ExtractionSource::Microdata, "itemprop=organizer"),
        "image" => {
            if let Some(resolved) = resolve_url(base_url, value) {
                ev.set("image_url", serde_json::json!(resolved), ExtractionSource::Microdata, "itemprop=image");
            }
        }
        "url" => {
            if let Some(resolved) = resolve_url(base_url, value) {
                ev.set("source_url", serde_json::json!(resolved), ExtractionSource::Microdata, "itemprop=url");
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsonld_maps_event_with_postal_address_and_geo() {
        let html = r#"<html><head><script type="application/ld+json">
        {"@type":"Event","name":"Zoo-Fuehrung","startDate":"2026-04-02T11:00:00+02:00",
         "location":{"name":"Zoo","address":{"streetAddress":"Ettlinger Str. 6","postalCode":"76137","addressLocality":"Karlsruhe"},
         "geo":{"latitude":49.0,"longitude":8.4}},
         "offers":{"price":5,"priceCurrency":"EUR"}}
        </script></head><body></body></html>"#;
        let events = extract_jsonld(html);
        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert_eq!(ev.get_str("title").unwrap(), "Zoo-Fuehrung");
        assert_eq!(ev.get_str("location_address").unwrap(), "Ettlinger Str. 6, 76137, Karlsruhe");
        assert_eq!(ev.fields["title"].source, ExtractionSource::JsonLd);
        assert_eq!(ev.get("lat").unwrap().as_f64().unwrap(), 49.0);
    }

    #[test]
    fn jsonld_ignores_non_event_types() {
        let html = r#"<script type="application/ld+json">{"@type":"Organization","name":"Acme"}</script>"#;
        assert!(extract_jsonld(html).is_empty());
    }

    #[test]
    fn jsonld_handles_graph_array() {
        let html = r#"<script type="application/ld+json">{"@graph":[{"@type":"Event","name":"A"},{"@type":"Thing","name":"B"}]}</script>"#;
        let events = extract_jsonld(html);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].get_str("title").unwrap(), "A");
    }

    #[test]
    fn microdata_extracts_basic_fields() {
        let html = r#"<div itemscope itemtype="https://schema.org/MusicEvent">
        <span itemprop="name">Konzert</span>
        <time itemprop="startDate" datetime="2026-05-01T20:00:00">1. Mai</time>
        </div>"#;
        let base = url::Url::parse("https://ex/").unwrap();
        let events = extract_microdata(html, &base);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].get_str("title").unwrap(), "Konzert");
        assert_eq!(events[0].get_str("start_datetime").unwrap(), "2026-05-01T20:00:00");
    }
}
