//! The extraction pipeline: a tagged-variant fold over extraction
//! stages. Each stage receives the set of still-needed fields and
//! returns results for whichever of them it can fill; the fold
//! accumulates into one `ExtractedEvent` and subtracts filled fields
//! from the needs set before the next stage runs.
//!
//! AI extraction (the fourth tagged variant) lives in `eventscout-enrich`
//! since it needs the budget counter and an HTTP client; this module
//! only folds the three stages that are pure given a DOM.

use std::collections::{HashMap, HashSet};

use eventscout_core::{ExtractedEvent, ExtractionSource, FieldSelector};

use crate::{custom, structured};

pub const ALL_FIELDS: &[&str] = &[
    "title",
    "description",
    "start_datetime",
    "end_datetime",
    "location_name",
    "location_address",
    "lat",
    "lng",
    "price",
    "currency",
    "organizer_name",
    "image_url",
    "source_url",
];

/// One fold step. Each variant carries only what it needs to run;
/// `CustomSelector` needs the source's declared field map, the rest work
/// from the raw HTML alone.
pub enum ExtractionStage<'a> {
    CustomSelector { selectors: &'a HashMap<String, FieldSelector> },
    StructuredData,
    Heuristic,
}

/// Folds the configured stage sequence over `html`, stopping once every
/// field in `ALL_FIELDS` has a value or the stages are exhausted.
pub fn run(html: &str, base_url: &url::Url, stages: &[ExtractionStage<'_>]) -> ExtractedEvent {
    let mut acc = ExtractedEvent::default();
    let mut needed: HashSet<&str> = ALL_FIELDS.iter().copied().collect();

    for stage in stages {
        if needed.is_empty() {
            break;
        }
        let produced = run_stage(stage, html, base_url);
        fold_in(&mut acc, produced, &mut needed);
    }

    acc
}

fn run_stage(stage: &ExtractionStage<'_>, html: &str, base_url: &url::Url) -> Vec<ExtractedEvent> {
    match stage {
        ExtractionStage::CustomSelector { selectors } => {
            vec![custom::extract(html, selectors, base_url)]
        }
        ExtractionStage::StructuredData => {
            let mut out = structured::extract_jsonld(html);
            if out.is_empty() {
                out = structured::extract_microdata(html, base_url);
            }
            out
        }
        ExtractionStage::Heuristic => vec![crate::heuristic::extract(html, base_url)],
    }
}

/// Merges `produced` into `acc`, honoring extractor precedence: a field
/// already filled by a higher-priority stage (lower `ExtractionSource`
/// ordinal) is never overwritten.
fn fold_in(acc: &mut ExtractedEvent, produced: Vec<ExtractedEvent>, needed: &mut HashSet<&'static str>) {
    for event in produced {
        for (field, result) in event.fields {
            let Some(&field_key) = needed.iter().find(|f| **f == field) else {
                continue;
            };
            let should_set = match acc.fields.get(&field) {
                None => true,
                Some(existing) => result.source < existing.source,
            };
            if should_set {
                acc.fields.insert(field.clone(), result);
            }
            if acc.fields.contains_key(&field) {
                needed.remove(field_key);
            }
        }
    }
}

/// Convenience: builds the default strategy-ordered stage list from a
/// source's configured `Strategy` list plus optional custom selectors.
pub fn default_stages<'a>(
    strategies: &[eventscout_core::Strategy],
    selectors: Option<&'a HashMap<String, FieldSelector>>,
) -> Vec<ExtractionStage<'a>> {
    let mut stages = Vec::new();
    if let Some(selectors) = selectors {
        if !selectors.is_empty() {
            stages.push(ExtractionStage::CustomSelector { selectors });
        }
    }
    if strategies.contains(&eventscout_core::Strategy::JsonLd)
        || strategies.contains(&eventscout_core::Strategy::Microdata)
    {
        stages.push(ExtractionStage::StructuredData);
    }
    if strategies.contains(&eventscout_core::Strategy::Css) {
        stages.push(ExtractionStage::Heuristic);
    }
    stages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_selector_wins_over_structured_data() {
        let html = r#"<html><head><script type="application/ld+json">
        {"@type":"Event","name":"JSON-LD Titel","startDate":"2026-04-02T11:00:00+02:00"}
        </script></head><body>
        <h2 class="custom-title">Manuell gepflegter Titel</h2>
        </body></html>"#;

        let mut selectors = HashMap::new();
        selectors.insert(
            "title".to_string(),
            FieldSelector { css: vec!["h2.custom-title".to_string()], attr: eventscout_core::SelectorAttr::Text },
        );

        let base = url::Url::parse("https://example.invalid/").unwrap();
        let stages = vec![
            ExtractionStage::CustomSelector { selectors: &selectors },
            ExtractionStage::StructuredData,
        ];
        let result = run(html, &base, &stages);
        assert_eq!(result.get_str("title").unwrap(), "Manuell gepflegter Titel");
        // start_datetime has no custom selector, so structured data fills it.
        assert!(result.get_str("start_datetime").is_some());
    }

    #[test]
    fn falls_through_to_heuristic_when_structured_data_is_empty() {
        let html = r#"<html><body>
        <h1>Familientag im Park</h1>
        <p>14. Februar 2026, 15 Uhr</p>
        </body></html>"#;
        let base = url::Url::parse("https://example.invalid/").unwrap();
        let stages = vec![ExtractionStage::StructuredData, ExtractionStage::Heuristic];
        let result = run(html, &base, &stages);
        assert_eq!(result.get_str("title").unwrap(), "Familientag im Park");
        assert_eq!(result.fields["title"].source, ExtractionSource::Heuristic);
    }
}
