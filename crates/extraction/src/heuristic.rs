//! Heuristic German-language extractor. Operates on visible text after
//! stripping non-content elements and consent/banner noise, then applies
//! date/address/price/location regexes tuned for German-language
//! family-event listings.
//!
//! Grounded in `crates/parser/src/html.rs`'s scraper-based DOM walk; the
//! multilingual keyword-list pattern there (login/captcha/forum keyword
//! lists) generalizes here to German date/address/price/location-label
//! lists. Patterns use `regex` + `once_cell::Lazy`, the same pairing this
//! codebase's `discovery` crate already uses.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use eventscout_core::{ExtractedEvent, ExtractionSource};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::dom::selector;

const STRIP_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "aside", "noscript", "iframe", "svg", "form",
];
const STRIP_CLASS_HINTS: &[&str] = &["cookie", "consent", "banner", "popup", "modal", "gdpr"];

/// Returns the page's visible text with noise elements removed.
pub fn visible_text(document: &Html) -> String {
    let root = document.root_element();
    let mut out = String::new();
    collect_visible_text(root, &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_visible_text(el: ElementRef, out: &mut String) {
    let name = el.value().name();
    if STRIP_TAGS.contains(&name) {
        return;
    }
    let class_id = format!(
        "{} {}",
        el.value().attr("class").unwrap_or(""),
        el.value().attr("id").unwrap_or("")
    )
    .to_ascii_lowercase();
    if STRIP_CLASS_HINTS.iter().any(|h| class_id.contains(h)) {
        return;
    }

    for child in el.children() {
        if let Some(child_el) = scraper::ElementRef::wrap(child) {
            collect_visible_text(child_el, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        }
    }
}

fn first_text(document: &Html, sel: &str) -> Option<String> {
    let s = selector(sel)?;
    document.select(&s).next().map(|el| {
        el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
    }).filter(|s| !s.is_empty())
}

fn meta_content(document: &Html, attr_selector: &str) -> Option<String> {
    let s = selector(attr_selector)?;
    document
        .select(&s)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Title: `h1` -> `og:title` -> `<title>` (site suffix stripped).
pub fn extract_title(document: &Html) -> Option<(String, &'static str, &'static str)> {
    if let Some(h1) = first_text(document, "h1") {
        return Some((h1, "css:h1", "heuristic"));
    }
    if let Some(og) = meta_content(document, r#"meta[property="og:title"]"#) {
        return Some((strip_site_suffix(&og), "meta[property=og:title]", "heuristic"));
    }
    if let Some(title) = first_text(document, "title") {
        return Some((strip_site_suffix(&title), "css:title", "heuristic"));
    }
    None
}

static SITE_SUFFIX_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[|–—-]\s*").unwrap());

fn strip_site_suffix(title: &str) -> String {
    SITE_SUFFIX_SPLIT
        .splitn(title, 2)
        .next()
        .unwrap_or(title)
        .trim()
        .to_string()
}

// --- Datetime -----------------------------------------------------------

const MONTHS_LONG: &[(&str, u32)] = &[
    ("januar", 1), ("februar", 2), ("maerz", 3), ("m\u{e4}rz", 3), ("april", 4),
    ("mai", 5), ("juni", 6), ("juli", 7), ("august", 8), ("september", 9),
    ("oktober", 10), ("november", 11), ("dezember", 12),
];
const MONTHS_ABBR: &[(&str, u32)] = &[
    ("jan", 1), ("feb", 2), ("mrz", 3), ("mar", 3), ("apr", 4), ("mai", 5),
    ("jun", 6), ("jul", 7), ("aug", 8), ("sep", 9), ("okt", 10), ("nov", 11), ("dez", 12),
];

static DATE_LONG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\.\s*([A-Za-zäöü]+)\.?\s*(\d{4})\b").unwrap()
});
static DATE_ISO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());
static DATE_SHORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(\d{2}|\d{4})\b").unwrap());

static TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2})[:.](\d{2})\s*(?:bis|–|—|-)\s*(\d{1,2})[:.](\d{2})").unwrap()
});
static TIME_UHR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d{1,2})(?:[:.](\d{2}))?\s*uhr").unwrap());
static TIME_HHMM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2})[:.](\d{2})\b").unwrap());

const TIME_SEARCH_WINDOW: usize = 120;

#[derive(Debug, Clone)]
pub struct ExtractedDateTime {
    pub start: chrono::DateTime<Utc>,
    pub end: Option<chrono::DateTime<Utc>>,
}

fn month_index(name: &str, table: &[(&str, u32)]) -> Option<u32> {
    let norm = name.to_lowercase().replace('\u{e4}', "ae").replace('\u{f6}', "oe").replace('\u{fc}', "ue");
    table.iter().find(|(m, _)| {
        let mn = m.replace('\u{e4}', "ae");
        norm == mn || norm.starts_with(&mn)
    }).map(|(_, n)| *n)
}

fn valid_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(2020..=2030).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Finds the first recognizable date in the text and, restricting the
/// search to the 120 characters following it (a date's opening-hours
/// blurb sits much further down the page than its own start time), an
/// optional time or time range.
pub fn extract_datetime(text: &str) -> Option<ExtractedDateTime> {
    let (date, match_end) = find_date(text)?;

    let window_end = (match_end + TIME_SEARCH_WINDOW).min(text.len());
    let window = safe_slice(text, match_end, window_end);

    let (start_time, end_time) = find_time(window);

    let start_naive = date.and_time(start_time.unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap()));
    let mut start = Utc.from_utc_datetime(&start_naive);
    let mut end = end_time.map(|t| Utc.from_utc_datetime(&date.and_time(t)));

    if let Some(e) = end {
        if e <= start {
            end = Some(e + chrono::Duration::days(1));
        }
    }
    if start_time.is_none() {
        // Midnight fallback stays a pure date; leave `end` untouched.
        start = Utc.from_utc_datetime(&start_naive);
    }

    Some(ExtractedDateTime { start, end })
}

fn safe_slice(text: &str, start: usize, end: usize) -> &str {
    let s = start.min(text.len());
    let e = end.min(text.len());
    // snap to char boundaries
    let mut s2 = s;
    while s2 < text.len() && !text.is_char_boundary(s2) {
        s2 += 1;
    }
    let mut e2 = e;
    while e2 < text.len() && !text.is_char_boundary(e2) {
        e2 += 1;
    }
    &text[s2..e2]
}

fn find_date(text: &str) -> Option<(NaiveDate, usize)> {
    if let Some(m) = DATE_ISO.find(text) {
        let caps = DATE_ISO.captures(m.as_str())?;
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if let Some(d) = valid_date(year, month, day) {
            return Some((d, m.end()));
        }
    }
    if let Some(caps) = DATE_LONG.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month_name = &caps[2];
        let year: i32 = caps[3].parse().ok()?;
        let month = month_index(month_name, MONTHS_LONG).or_else(|| month_index(month_name, MONTHS_ABBR))?;
        if let Some(d) = valid_date(year, month, day) {
            let whole = caps.get(0).unwrap();
            return Some((d, whole.end()));
        }
    }
    if let Some(caps) = DATE_SHORT.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year_raw = &caps[3];
        let year: i32 = if year_raw.len() == 2 {
            2000 + year_raw.parse::<i32>().ok()?
        } else {
            year_raw.parse().ok()?
        };
        if let Some(d) = valid_date(year, month, day) {
            let whole = caps.get(0).unwrap();
            return Some((d, whole.end()));
        }
    }
    None
}

fn find_time(window: &str) -> (Option<NaiveTime>, Option<NaiveTime>) {
    if let Some(caps) = TIME_RANGE.captures(window) {
        let sh: u32 = caps[1].parse().unwrap_or(0);
        let sm: u32 = caps[2].parse().unwrap_or(0);
        let eh: u32 = caps[3].parse().unwrap_or(0);
        let em: u32 = caps[4].parse().unwrap_or(0);
        if (6..=23).contains(&sh) {
            let start = NaiveTime::from_hms_opt(sh, sm, 0);
            let end = NaiveTime::from_hms_opt(eh, em, 0);
            return (start, end);
        }
    }
    if let Some(caps) = TIME_UHR.captures(window) {
        let h: u32 = caps[1].parse().unwrap_or(0);
        let m: u32 = caps.get(2).and_then(|g| g.as_str().parse().ok()).unwrap_or(0);
        if (6..=23).contains(&h) {
            return (NaiveTime::from_hms_opt(h, m, 0), None);
        }
    }
    if let Some(caps) = TIME_HHMM.captures(window) {
        let h: u32 = caps[1].parse().unwrap_or(0);
        let m: u32 = caps[2].parse().unwrap_or(0);
        if (6..=23).contains(&h) && m < 60 {
            return (NaiveTime::from_hms_opt(h, m, 0), None);
        }
    }
    (None, None)
}

// --- Address --------------------------------------------------------------

static STREET_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)([A-ZÄÖÜ][\wäöüßÄÖÜ.\-]*\s*(?:Straße|Str\.|Platz|Weg|Allee|Ring|Gasse|Damm|Ufer|Steig|Pfad|Promenade|Brücke|Chaussee|Markt|Hof))\s*(\d+\w?)\s*,?\s*(\d{5})\s+([A-ZÄÖÜ][\wäöüß\- ]*)",
    )
    .unwrap()
});
static PLZ_CITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{5})\s+([A-ZÄÖÜ][\wäöüß\-]*)").unwrap());

pub fn extract_address(text: &str) -> Option<String> {
    if let Some(caps) = STREET_ADDRESS.captures(text) {
        let street = caps[1].trim();
        let house_no = &caps[2];
        let plz = &caps[3];
        let city = caps[4].trim();
        return Some(format!("{street} {house_no}, {plz} {city}"));
    }
    if let Some(caps) = PLZ_CITY.captures(text) {
        return Some(format!("{} {}", &caps[1], caps[2].trim()));
    }
    None
}

// --- Location name ----------------------------------------------------------

const LOCATION_LABELS: &[&str] = &[
    "Ort:", "Veranstaltungsort:", "Location:", "Spielort:", "Adresse:",
    "Anfahrt:", "Treffpunkt:", "Venue:", "Wo:",
];

pub fn extract_location_name(document: &Html, plain_text: &str) -> Option<String> {
    for label in LOCATION_LABELS {
        if let Some(idx) = plain_text.find(label) {
            let after = &plain_text[idx + label.len()..];
            let value: String = after.trim_start().chars().take(120).collect();
            let value = value.split(|c: char| c == '.').next().unwrap_or(&value);
            let cut = value.split_whitespace().take(12).collect::<Vec<_>>().join(" ");
            if !cut.is_empty() {
                return Some(cut);
            }
        }
    }

    // dt/th/label/strong/b/span label followed by sibling text, and dl->dd.
    if let Some(sel) = selector("dt, th, label, strong, b, span") {
        for el in document.select(&sel) {
            let label_text = el.text().collect::<String>();
            let norm = label_text.trim();
            if LOCATION_LABELS.iter().any(|l| norm.eq_ignore_ascii_case(l.trim_end_matches(':'))) {
                if let Some(sibling) = next_sibling_text(el) {
                    if !sibling.trim().is_empty() {
                        return Some(sibling.trim().to_string());
                    }
                }
            }
        }
    }

    if let Some(sel) = selector("dl") {
        for dl in document.select(&sel) {
            if let (Some(dt_sel), Some(dd_sel)) = (selector("dt"), selector("dd")) {
                let dts: Vec<_> = dl.select(&dt_sel).collect();
                let dds: Vec<_> = dl.select(&dd_sel).collect();
                for (dt, dd) in dts.iter().zip(dds.iter()) {
                    let label = dt.text().collect::<String>();
                    if LOCATION_LABELS.iter().any(|l| label.trim().eq_ignore_ascii_case(l.trim_end_matches(':'))) {
                        let value = dd.text().collect::<String>();
                        if !value.trim().is_empty() {
                            return Some(value.trim().to_string());
                        }
                    }
                }
            }
        }
    }

    if let Some(sel) = selector("[aria-label]") {
        for el in document.select(&sel) {
            if let Some(label) = el.value().attr("aria-label") {
                if LOCATION_LABELS.iter().any(|l| label.eq_ignore_ascii_case(l.trim_end_matches(':'))) {
                    let value = el.text().collect::<String>();
                    if !value.trim().is_empty() {
                        return Some(value.trim().to_string());
                    }
                }
            }
        }
    }

    None
}

fn next_sibling_text(el: ElementRef) -> Option<String> {
    let mut node = el.next_sibling();
    while let Some(n) = node {
        if let Some(text) = n.value().as_text() {
            if !text.trim().is_empty() {
                return Some(text.to_string());
            }
        } else if let Some(child_el) = ElementRef::wrap(n) {
            let text = child_el.text().collect::<String>();
            if !text.trim().is_empty() {
                return Some(text);
            }
        }
        node = n.next_sibling();
    }
    None
}

// --- Price ------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum HeuristicPrice {
    Free,
    Donation,
    Amount(rust_decimal::Decimal, String),
}

static FREE_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)eintritt\s+frei|kostenlos|kostenfrei|freier\s+eintritt").unwrap());
static DONATION_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)spende(nbasis)?|pay\s+what\s+you\s+(want|can)").unwrap());
static LABELED_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(eintritt|preis|kosten|tickets?|karten?)\s*[:.]?\s*(ab\s+)?(\d+[.,]\d{2}|\d+)\s*(eur|euro|€)").unwrap()
});
static SIMPLE_PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+[.,]\d{2}|\d+)\s*(eur|euro|€)").unwrap());

pub fn extract_price(text: &str) -> Option<HeuristicPrice> {
    if FREE_MARKERS.is_match(text) {
        return Some(HeuristicPrice::Free);
    }
    if DONATION_MARKERS.is_match(text) {
        return Some(HeuristicPrice::Donation);
    }
    if let Some(caps) = LABELED_PRICE.captures(text) {
        return parse_amount(&caps[3]).map(|d| {
            if d.is_zero() {
                HeuristicPrice::Free
            } else {
                HeuristicPrice::Amount(d, "EUR".to_string())
            }
        });
    }
    if let Some(caps) = SIMPLE_PRICE.captures(text) {
        return parse_amount(&caps[1]).map(|d| {
            if d.is_zero() {
                HeuristicPrice::Free
            } else {
                HeuristicPrice::Amount(d, "EUR".to_string())
            }
        });
    }
    None
}

fn parse_amount(raw: &str) -> Option<rust_decimal::Decimal> {
    let normalized = raw.replace(',', ".");
    normalized.parse().ok()
}

// --- Image / Description ----------------------------------------------------

pub fn extract_image(document: &Html) -> Option<String> {
    meta_content(document, r#"meta[property="og:image"]"#)
}

pub fn extract_description(document: &Html) -> Option<String> {
    if let Some(d) = meta_content(document, r#"meta[property="og:description"]"#) {
        return Some(d);
    }
    if let Some(d) = meta_content(document, r#"meta[name="description"]"#) {
        return Some(d);
    }
    longest_paragraph(document)
}

fn longest_paragraph(document: &Html) -> Option<String> {
    let scope_sel = selector("main, article, body")?;
    let p_sel: Selector = selector("p")?;
    let mut best: Option<String> = None;

    for scope in document.select(&scope_sel) {
        for p in scope.select(&p_sel) {
            let text = p.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ");
            if best.as_ref().map(|b| text.len() > b.len()).unwrap_or(!text.is_empty()) {
                best = Some(text);
            }
        }
        if best.is_some() {
            break; // first matching scope wins, in DOM precedence order
        }
    }
    best
}

/// Runs the full heuristic stage over an HTML document, producing an
/// `ExtractedEvent` tagged `ExtractionSource::Heuristic`.
pub fn extract(html: &str, base_url: &url::Url) -> ExtractedEvent {
    let document = Html::parse_document(html);
    let plain_text = visible_text(&document);

    let mut ev = ExtractedEvent::default();

    if let Some((title, evidence, _)) = extract_title(&document) {
        ev.set("title", serde_json::json!(title), ExtractionSource::Heuristic, evidence);
    }

    if let Some(dt) = extract_datetime(&plain_text) {
        ev.set("start_datetime", serde_json::json!(dt.start.to_rfc3339()), ExtractionSource::Heuristic, "text:date+time window");
        if let Some(end) = dt.end {
            ev.set("end_datetime", serde_json::json!(end.to_rfc3339()), ExtractionSource::Heuristic, "text:time range");
        }
    }

    if let Some(addr) = extract_address(&plain_text) {
        ev.set("location_address", serde_json::json!(addr), ExtractionSource::Heuristic, "regex:street/plz/city");
    }

    if let Some(loc) = extract_location_name(&document, &plain_text) {
        ev.set("location_name", serde_json::json!(loc), ExtractionSource::Heuristic, "label match");
    }

    match extract_price(&plain_text) {
        Some(HeuristicPrice::Free) => {
            ev.set("price", serde_json::json!(0), ExtractionSource::Heuristic, "free marker");
        }
        Some(HeuristicPrice::Donation) => {
            ev.set("price_type", serde_json::json!("donation"), ExtractionSource::Heuristic, "donation marker");
        }
        Some(HeuristicPrice::Amount(amount, currency)) => {
            ev.set("price", serde_json::json!(amount.to_string()), ExtractionSource::Heuristic, "labeled/simple price regex");
            ev.set("currency", serde_json::json!(currency), ExtractionSource::Heuristic, "labeled/simple price regex");
        }
        None => {}
    }

    if let Some(img) = extract_image(&document) {
        if let Some(resolved) = crate::dom::resolve_url(base_url, &img) {
            ev.set("image_url", serde_json::json!(resolved), ExtractionSource::Heuristic, "og:image");
        }
    }

    if let Some(desc) = extract_description(&document) {
        ev.set("description", serde_json::json!(desc), ExtractionSource::Heuristic, "og:description|meta|longest <p>");
    }

    ev
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_date_time_location_address() {
        let html = r#"<html><body>
        <h1>Das Mädchen aus der Streichholzfabrik</h1>
        <p>14. Februar 2026, 19 Uhr</p>
        <p>Ort: Badisches Staatstheater, Kleines Haus</p>
        <p>Hermann-Levi-Platz 1, 76137 Karlsruhe</p>
        </body></html>"#;
        let document = Html::parse_document(html);
        let text = visible_text(&document);

        let (title, _, _) = extract_title(&document).unwrap();
        assert!(title.contains("Streichholzfabrik"));

        let dt = extract_datetime(&text).unwrap();
        assert_eq!(dt.start.format("%Y-%m-%dT%H:%M").to_string(), "2026-02-14T19:00");

        let loc = extract_location_name(&document, &text).unwrap();
        assert!(loc.contains("Badisches Staatstheater"));

        let addr = extract_address(&text).unwrap();
        assert!(addr.contains("76137"));
        assert!(addr.contains("Karlsruhe"));
    }

    #[test]
    fn time_window_excludes_opening_hours() {
        let padding = "x".repeat(300);
        let text = format!("14. Februar 2026, 19 Uhr {padding} Oeffnungszeiten 10:00-18:30 Uhr");
        let dt = extract_datetime(&text).unwrap();
        assert_eq!(dt.start.format("%H:%M").to_string(), "19:00");
        assert!(dt.end.is_none());
    }

    #[test]
    fn iso_date_is_recognized() {
        let dt = extract_datetime("Das Event findet am 2026-04-02 statt, Beginn 18:30").unwrap();
        assert_eq!(dt.start.format("%Y-%m-%d %H:%M").to_string(), "2026-04-02 18:30");
    }

    #[test]
    fn rejects_out_of_range_year() {
        assert!(extract_datetime("Termin am 14. Februar 1999").is_none());
    }

    #[test]
    fn free_marker_detected() {
        assert_eq!(extract_price("Eintritt frei fuer alle Kinder"), Some(HeuristicPrice::Free));
    }

    #[test]
    fn donation_marker_detected() {
        assert_eq!(extract_price("Eintritt auf Spendenbasis"), Some(HeuristicPrice::Donation));
    }

    #[test]
    fn labeled_price_detected() {
        let result = extract_price("Eintritt: ab 5,00 EUR pro Person").unwrap();
        match result {
            HeuristicPrice::Amount(amount, currency) => {
                assert_eq!(amount, "5.00".parse().unwrap());
                assert_eq!(currency, "EUR");
            }
            _ => panic!("expected amount"),
        }
    }

    #[test]
    fn zero_eur_normalizes_to_free() {
        assert_eq!(extract_price("Eintritt: 0 EUR"), Some(HeuristicPrice::Free));
    }
}
