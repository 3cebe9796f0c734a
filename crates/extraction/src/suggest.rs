//! Selector suggester: given a parsed document and a set of known
//! `field -> value` pairs, produces reusable `FieldSelector`s. Pure
//! function, no network or I/O — operators feed it a sample page plus a
//! manually confirmed event to bootstrap a `ScraperConfig` for a new
//! source.

use std::collections::HashMap;

use eventscout_core::{FieldSelector, SelectorAttr};
use scraper::{ElementRef, Html};

use crate::dom::{selector, text_of};

const DATETIME_FIELDS: &[&str] = &["start_datetime", "end_datetime"];
const ATTR_FIELDS: &[&str] = &["image_url", "source_url"];

/// Suggests one `FieldSelector` per field whose known value could be
/// located in the document; fields with no match are omitted.
pub fn suggest(html: &str, known: &HashMap<String, String>) -> HashMap<String, FieldSelector> {
    let document = Html::parse_document(html);
    let mut out = HashMap::new();

    for (field, value) in known {
        if value.trim().is_empty() {
            continue;
        }
        let suggestion = if DATETIME_FIELDS.contains(&field.as_str()) {
            suggest_datetime(&document, value)
        } else if ATTR_FIELDS.contains(&field.as_str()) {
            suggest_attr_match(&document, value)
        } else {
            suggest_text(&document, value)
        };
        if let Some(fs) = suggestion {
            out.insert(field.clone(), fs);
        }
    }

    out
}

fn suggest_datetime(document: &Html, value: &str) -> Option<FieldSelector> {
    let iso_prefix = value.split(['T', ' ']).next().unwrap_or(value);

    if let Some(sel) = selector("time[datetime]") {
        for el in document.select(&sel) {
            if let Some(dt) = el.value().attr("datetime") {
                if dt.contains(iso_prefix) {
                    let css = build_unique_selector(document, el, "time[datetime]")?;
                    return Some(FieldSelector { css: vec![css], attr: SelectorAttr::Datetime });
                }
            }
        }
    }

    if let Some(sel) = selector("meta[content]") {
        for el in document.select(&sel) {
            if let Some(content) = el.value().attr("content") {
                if content.contains(iso_prefix) {
                    let css = build_unique_selector(document, el, "meta[content]")?;
                    return Some(FieldSelector { css: vec![css], attr: SelectorAttr::Content });
                }
            }
        }
    }

    // Fallback: any element whose text contains the value, tagged as datetime.
    let el = find_text_match(document, value)?;
    let css = build_unique_selector(document, el, element_tag(el))?;
    Some(FieldSelector { css: vec![css], attr: SelectorAttr::Datetime })
}

fn suggest_attr_match(document: &Html, value: &str) -> Option<FieldSelector> {
    for attr_name in ["src", "href"] {
        if let Some(sel) = selector(&format!("[{attr_name}]")) {
            for el in document.select(&sel) {
                if let Some(attr_value) = el.value().attr(attr_name) {
                    if attr_value == value || value.ends_with(attr_value) {
                        let css = build_unique_selector(document, el, element_tag(el))?;
                        let attr = if attr_name == "src" { SelectorAttr::Src } else { SelectorAttr::Href };
                        return Some(FieldSelector { css: vec![css], attr });
                    }
                }
            }
        }
    }
    None
}

fn suggest_text(document: &Html, value: &str) -> Option<FieldSelector> {
    let el = find_least_ancestor_match(document, value)?;
    let css = build_unique_selector(document, el, element_tag(el))?;
    Some(FieldSelector { css: vec![css], attr: SelectorAttr::Text })
}

fn element_tag(el: ElementRef) -> &'static str {
    match el.value().name() {
        "h1" => "h1",
        "h2" => "h2",
        "h3" => "h3",
        "time" => "time",
        "span" => "span",
        "div" => "div",
        "p" => "p",
        "a" => "a",
        "img" => "img",
        _ => "*",
    }
}

/// Finds the deepest (least-ancestor) element whose normalized text
/// contains `value`. DOM tree traversal prefers the most specific match:
/// a descendant match wins over its own ancestor's coarser match.
fn find_text_match<'a>(document: &'a Html, value: &str) -> Option<ElementRef<'a>> {
    find_least_ancestor_match(document, value)
}

fn find_least_ancestor_match<'a>(document: &'a Html, value: &str) -> Option<ElementRef<'a>> {
    let all_sel = selector("*")?;
    let mut candidates: Vec<ElementRef> = document
        .select(&all_sel)
        .filter(|el| text_of(el).contains(value.trim()))
        .collect();

    // Sort by descendant depth, deepest first, so the most specific
    // element (fewest descendants also matching) is tried first.
    candidates.sort_by_key(|el| std::cmp::Reverse(ancestor_depth(*el)));
    candidates.into_iter().next()
}

fn ancestor_depth(el: ElementRef) -> usize {
    el.ancestors().count()
}

/// Builds a selector following the priority `#id > [data-*] > tag.class
/// > [itemprop] > tag`, accepting only if it uniquely identifies the
/// element; otherwise walks up to 3 parent levels prepending class/id.
fn build_unique_selector(document: &Html, el: ElementRef, tag_hint: &str) -> Option<String> {
    let candidate = base_candidate(el, tag_hint);
    if is_unique(document, &candidate) {
        return Some(candidate);
    }

    let mut refined = candidate;
    let mut node = el;
    for _ in 0..3 {
        let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
            break;
        };
        let prefix = parent
            .value()
            .attr("id")
            .map(|id| format!("#{id}"))
            .or_else(|| {
                parent
                    .value()
                    .attr("class")
                    .and_then(|c| c.split_whitespace().next())
                    .map(|c| format!(".{c}"))
            });
        if let Some(prefix) = prefix {
            refined = format!("{prefix} {refined}");
            if is_unique(document, &refined) {
                return Some(refined);
            }
        }
        node = parent;
    }

    None
}

fn base_candidate(el: ElementRef, tag_hint: &str) -> String {
    if let Some(id) = el.value().attr("id") {
        return format!("#{id}");
    }
    if let Some(data_attr) = el.value().attrs().find(|(k, _)| k.starts_with("data-")) {
        return format!("[{}]", data_attr.0);
    }
    if let Some(class) = el.value().attr("class").and_then(|c| c.split_whitespace().next()) {
        return format!("{tag_hint}.{class}");
    }
    if let Some(itemprop) = el.value().attr("itemprop") {
        return format!("[itemprop={itemprop}]");
    }
    tag_hint.to_string()
}

fn is_unique(document: &Html, css: &str) -> bool {
    match selector(css) {
        Some(sel) => document.select(&sel).count() == 1,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_time_datetime_selector() {
        let html = r#"<html><body>
        <time class="when" datetime="2026-06-01T10:00:00+02:00">1. Juni, 10 Uhr</time>
        </body></html>"#;
        let mut known = HashMap::new();
        known.insert("start_datetime".to_string(), "2026-06-01".to_string());
        let result = suggest(html, &known);
        let fs = result.get("start_datetime").expect("expected a suggestion");
        assert_eq!(fs.attr, SelectorAttr::Datetime);
        assert_eq!(fs.css, vec!["time.when".to_string()]);
    }

    #[test]
    fn suggests_unique_selector_for_repeated_class() {
        let html = r#"<html><body>
        <div class="card"><h2 class="title">Sommerfest</h2></div>
        <div class="card"><h2 class="title">Herbstmarkt</h2></div>
        </body></html>"#;
        let mut known = HashMap::new();
        known.insert("title".to_string(), "Sommerfest".to_string());
        let result = suggest(html, &known);
        let fs = result.get("title").expect("expected a suggestion");
        assert_eq!(fs.attr, SelectorAttr::Text);
        // h2.title alone is ambiguous (matches both cards); refinement
        // must walk up to disambiguate.
        assert_ne!(fs.css[0], "h2.title");
    }

    #[test]
    fn suggests_src_attribute_for_image() {
        let html = r#"<img class="cover" src="/img/a.jpg">"#;
        let mut known = HashMap::new();
        known.insert("image_url".to_string(), "/img/a.jpg".to_string());
        let result = suggest(html, &known);
        let fs = result.get("image_url").expect("expected a suggestion");
        assert_eq!(fs.attr, SelectorAttr::Src);
    }

    #[test]
    fn unmatched_value_yields_no_suggestion() {
        let html = "<html><body><p>Nothing relevant</p></body></html>";
        let mut known = HashMap::new();
        known.insert("title".to_string(), "Does Not Appear".to_string());
        let result = suggest(html, &known);
        assert!(result.get("title").is_none());
    }
}
