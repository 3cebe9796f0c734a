//! Normalizer: turns a `ParsedEvent` into a fully canonicalized, flat
//! `NormalizedEvent` — the last stage before an event is flattened into a
//! `CanonicalCandidate`.
//!
//! Grounded in `crates/parser/src/entities.rs`'s regex-list-plus-`Lazy`
//! pattern (there for onion/bitcoin/PGP entities, here for German
//! date/price/age/contact markers) and `crates/extraction/src/heuristic.rs`'s
//! time-window search, reused for the "midnight date, time lives in the
//! description" case.

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use eventscout_core::{
    AvailabilityStatus, ContactInfo, NormalizedEvent, ParsedEvent, PriceBreakdown, PriceType,
};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

const NORMALIZER_TZ: Tz = chrono_tz::Europe::Berlin;
const SHORT_DESCRIPTION_MAX: usize = 500;

/// Produces the flat, canonicalized event from a `ParsedEvent`.
pub fn normalize(parsed: &ParsedEvent) -> NormalizedEvent {
    let title = collapse_whitespace(&strip_html(&parsed.title));
    let title = truncate_chars(&title, eventscout_core::ParsedEvent::MAX_TITLE);

    let description_plain = parsed.description.as_deref().map(|d| strip_html(d));
    let (description_short, description_long) = split_description(description_plain.as_deref());

    let (start_datetime, end_datetime) = normalize_datetimes(parsed, description_plain.as_deref());

    let (venue_name, location_address) =
        split_venue_address(parsed.location_name.as_deref(), parsed.location_address.as_deref());

    let scan_text = format!(
        "{} {}",
        description_plain.as_deref().unwrap_or(""),
        parsed.location_address.as_deref().unwrap_or("")
    );

    let (price_type, price, currency, price_breakdown) = normalize_price(parsed, &scan_text);
    let availability = detect_availability(&scan_text);
    let (age_min, age_max) = extract_age(&scan_text);
    let indoor_outdoor = detect_indoor_outdoor(&scan_text);
    let language = detect_language(&scan_text);
    let recurrence_rule = detect_recurrence(parsed, &scan_text);
    let contact = extract_contact(&scan_text);
    let images = normalize_images(parsed.image_url.as_deref());

    NormalizedEvent {
        title,
        description_short,
        description_long,
        start_datetime,
        end_datetime,
        venue_name,
        location_address,
        lat: parsed.lat,
        lng: parsed.lng,
        price_type,
        price,
        currency,
        price_breakdown,
        availability,
        age_min,
        age_max,
        indoor_outdoor,
        language,
        recurrence_rule,
        contact,
        images,
        organizer_name: parsed.organizer_name.clone(),
        source_url: parsed.source_url.clone(),
    }
}

// --- Title / description ----------------------------------------------------

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());

fn strip_html(input: &str) -> String {
    let no_tags = TAG_RE.replace_all(input, " ");
    decode_entities(&no_tags)
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

fn split_description(stripped: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(stripped) = stripped else { return (None, None) };
    let collapsed = collapse_whitespace(stripped);
    if collapsed.is_empty() {
        return (None, None);
    }
    let long = truncate_chars(&collapsed, eventscout_core::ParsedEvent::MAX_DESCRIPTION);
    let short = short_description(&long, SHORT_DESCRIPTION_MAX);
    (Some(short), Some(long))
}

fn short_description(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max).collect();
    if let Some(idx) = truncated.rfind('.') {
        return truncated[..=idx].trim().to_string();
    }
    if let Some(idx) = truncated.rfind(char::is_whitespace) {
        return truncated[..idx].trim().to_string();
    }
    truncated
}

// --- Datetime ----------------------------------------------------------------

enum TimeHint {
    Range(NaiveTime, NaiveTime),
    Start(NaiveTime),
    End(NaiveTime),
}

static TIME_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2})[:.](\d{2})\s*(?:bis|–|—|-)\s*(\d{1,2})[:.](\d{2})").unwrap());
static UM_GEGEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:um|gegen)\s+(\d{1,2})(?:[:.](\d{2}))?\s*uhr").unwrap());
static AB_UHR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bab\s+(\d{1,2})(?:[:.](\d{2}))?\s*uhr").unwrap());
static BIS_UHR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bbis\s+(\d{1,2})(?:[:.](\d{2}))?\s*uhr").unwrap());
static PLAIN_UHR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:[:.](\d{2}))?\s*uhr\b").unwrap());
static VAGUE_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(vormittags|nachmittags|abends|morgens)\b").unwrap());

/// Any legal clock time, no hour floor — used for values that may
/// legitimately fall after midnight (an end time on a range).
fn any_time(hour: u32, minute: u32) -> Option<NaiveTime> {
    if minute >= 60 {
        return None;
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// A plausible *start* time: `6 ≤ hour ≤ 23`, the same floor
/// `heuristic::find_time` uses to keep opening-hours blurbs from being
/// mistaken for an event's start time.
fn start_time(hour: u32, minute: u32) -> Option<NaiveTime> {
    if !(6..=23).contains(&hour) {
        return None;
    }
    any_time(hour, minute)
}

fn time_from_description(text: &str) -> Option<TimeHint> {
    if let Some(caps) = TIME_RANGE_RE.captures(text) {
        let sh: u32 = caps[1].parse().ok()?;
        let sm: u32 = caps[2].parse().ok()?;
        let eh: u32 = caps[3].parse().ok()?;
        let em: u32 = caps[4].parse().ok()?;
        if let (Some(s), Some(e)) = (start_time(sh, sm), any_time(eh, em)) {
            return Some(TimeHint::Range(s, e));
        }
    }
    if let Some(caps) = UM_GEGEN_RE.captures(text) {
        let h: u32 = caps[1].parse().ok()?;
        let m: u32 = caps.get(2).and_then(|g| g.as_str().parse().ok()).unwrap_or(0);
        if let Some(t) = start_time(h, m) {
            return Some(TimeHint::Start(t));
        }
    }
    if let Some(caps) = AB_UHR_RE.captures(text) {
        let h: u32 = caps[1].parse().ok()?;
        let m: u32 = caps.get(2).and_then(|g| g.as_str().parse().ok()).unwrap_or(0);
        if let Some(t) = start_time(h, m) {
            return Some(TimeHint::Start(t));
        }
    }
    if let Some(caps) = BIS_UHR_RE.captures(text) {
        let h: u32 = caps[1].parse().ok()?;
        let m: u32 = caps.get(2).and_then(|g| g.as_str().parse().ok()).unwrap_or(0);
        if let Some(t) = any_time(h, m) {
            return Some(TimeHint::End(t));
        }
    }
    if let Some(caps) = PLAIN_UHR_RE.captures(text) {
        let h: u32 = caps[1].parse().ok()?;
        let m: u32 = caps.get(2).and_then(|g| g.as_str().parse().ok()).unwrap_or(0);
        if let Some(t) = start_time(h, m) {
            return Some(TimeHint::Start(t));
        }
    }
    if let Some(caps) = VAGUE_TIME_RE.captures(text) {
        let hour = match &caps[1].to_lowercase()[..] {
            "morgens" => 9,
            "vormittags" => 10,
            "nachmittags" => 15,
            "abends" => 19,
            _ => return None,
        };
        if let Some(t) = start_time(hour, 0) {
            return Some(TimeHint::Start(t));
        }
    }
    None
}

/// Localizes naive/UTC datetimes to `Europe/Berlin`; if a date exists with
/// a midnight time, pulls a time out of the description instead. Rolls
/// `end` to the next day if it would otherwise land before `start`.
fn normalize_datetimes(
    parsed: &ParsedEvent,
    description: Option<&str>,
) -> (Option<DateTime<Tz>>, Option<DateTime<Tz>>) {
    let mut start = parsed.start_datetime.map(|d| d.with_timezone(&NORMALIZER_TZ));
    let mut end = parsed.end_datetime.map(|d| d.with_timezone(&NORMALIZER_TZ));

    if let Some(s) = start {
        if s.time() == NaiveTime::from_hms_opt(0, 0, 0).unwrap() {
            if let Some(desc) = description {
                match time_from_description(desc) {
                    Some(TimeHint::Range(st, et)) => {
                        start = at_time(s, st);
                        if end.is_none() {
                            end = start.and_then(|s2| at_time(s2, et));
                        }
                    }
                    Some(TimeHint::Start(st)) => {
                        start = at_time(s, st);
                    }
                    Some(TimeHint::End(et)) => {
                        if end.is_none() {
                            end = at_time(s, et);
                        }
                    }
                    None => {}
                }
            }
        }
    }

    if let (Some(s), Some(e)) = (start, end) {
        if e <= s {
            end = Some(e + chrono::Duration::days(1));
        }
    }

    (start, end)
}

fn at_time(base: DateTime<Tz>, time: NaiveTime) -> Option<DateTime<Tz>> {
    NORMALIZER_TZ
        .with_ymd_and_hms(base.year(), base.month(), base.day(), time.hour(), time.minute(), 0)
        .single()
}

// --- Address / venue split ---------------------------------------------------

static STREET_WITH_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(straße|str\.|platz|weg|allee|ring|gasse|damm|ufer|steig|pfad|promenade|brücke|chaussee|markt|hof)\s*\d+").unwrap()
});
static PLZ_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{5}\b").unwrap());

fn looks_like_street_address(s: &str) -> bool {
    STREET_WITH_NUMBER.is_match(s) || PLZ_PATTERN.is_match(s)
}

/// Decides whether the extracted `location_name`/`location_address` pair
/// is already split, a composite `"Venue, Straße 1, PLZ Stadt"` string to
/// split on the first comma, or a venue name wrongly stored as an address.
fn split_venue_address(name: Option<&str>, address: Option<&str>) -> (Option<String>, Option<String>) {
    let mut venue = name.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let mut address = address.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    if let Some(addr) = address.clone() {
        if venue.is_none() {
            if !looks_like_street_address(&addr) {
                venue = Some(addr);
                address = None;
            } else if let Some((first, rest)) = addr.split_once(',') {
                if looks_like_street_address(rest.trim()) {
                    venue = Some(first.trim().to_string());
                    address = Some(rest.trim().to_string());
                }
            }
        }
    }

    if let Some(addr) = address.as_deref() {
        address = Some(truncate_chars(addr, eventscout_core::ParsedEvent::MAX_ADDRESS));
    }
    (venue, address)
}

// --- Price ---------------------------------------------------------------

static FREE_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)eintritt\s+frei|kostenlos|kostenfrei|freier\s+eintritt").unwrap());
static DONATION_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)spende(nbasis)?|pay\s+what\s+you\s+(want|can)").unwrap());
static ADULT_PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)erwachsene\w*\s*[:\-]?\s*(\d+[.,]\d{2}|\d+)\s*(?:eur|euro|€)").unwrap());
static CHILD_PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)kinder\w*\s*[:\-]?\s*(\d+[.,]\d{2}|\d+)\s*(?:eur|euro|€)").unwrap());
static FAMILY_PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)familien\w*\s*[:\-]?\s*(\d+[.,]\d{2}|\d+)\s*(?:eur|euro|€)").unwrap());

fn parse_amount(raw: &str) -> Option<Decimal> {
    raw.replace(',', ".").parse().ok()
}

fn normalize_price(
    parsed: &ParsedEvent,
    text: &str,
) -> (PriceType, Option<Decimal>, Option<String>, Option<PriceBreakdown>) {
    let adult = ADULT_PRICE_RE.captures(text).and_then(|c| parse_amount(&c[1]));
    let child = CHILD_PRICE_RE.captures(text).and_then(|c| parse_amount(&c[1]));
    let family = FAMILY_PRICE_RE.captures(text).and_then(|c| parse_amount(&c[1]));
    let breakdown = if adult.is_some() || child.is_some() || family.is_some() {
        Some(PriceBreakdown { adult, child, family })
    } else {
        None
    };

    if FREE_MARKERS.is_match(text) || parsed.price.map(|p| p.is_zero()).unwrap_or(false) {
        return (PriceType::Free, None, None, breakdown);
    }
    if DONATION_MARKERS.is_match(text) {
        return (PriceType::Donation, parsed.price, parsed.currency.clone(), breakdown);
    }
    if adult.is_some() && child.is_some() && adult != child {
        return (PriceType::Range, parsed.price.or(adult), parsed.currency.clone().or(Some("EUR".to_string())), breakdown);
    }
    if let Some(price) = parsed.price {
        return (PriceType::Paid, Some(price), parsed.currency.clone(), breakdown);
    }
    if let Some(a) = adult {
        return (PriceType::Paid, Some(a), Some("EUR".to_string()), breakdown);
    }
    (PriceType::Unknown, None, None, breakdown)
}

// --- Availability ----------------------------------------------------------

static CANCELLED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)abgesagt|storniert|f[äa]llt\s+aus|ausgefallen").unwrap());
static POSTPONED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)verschoben").unwrap());
static SOLD_OUT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)ausverkauft").unwrap());
static WAITLIST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)warteliste").unwrap());
static REGISTRATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)anmeldung\s+erforderlich|anmeldepflichtig").unwrap());

fn detect_availability(text: &str) -> AvailabilityStatus {
    if CANCELLED_RE.is_match(text) {
        AvailabilityStatus::Cancelled
    } else if POSTPONED_RE.is_match(text) {
        AvailabilityStatus::Postponed
    } else if SOLD_OUT_RE.is_match(text) {
        AvailabilityStatus::SoldOut
    } else if WAITLIST_RE.is_match(text) {
        AvailabilityStatus::Waitlist
    } else if REGISTRATION_RE.is_match(text) {
        AvailabilityStatus::RegistrationRequired
    } else {
        AvailabilityStatus::Available
    }
}

// --- Age -------------------------------------------------------------------

static AGE_RANGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d{1,2})\s*-\s*(\d{1,2})\s*jahre").unwrap());
static AGE_AB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)ab\s+(\d{1,2})\s*jahren?").unwrap());
static AGE_BIS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)bis\s+(\d{1,2})\s*jahren?").unwrap());
static AGE_PLUS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2})\s*\+").unwrap());

fn extract_age(text: &str) -> (Option<u32>, Option<u32>) {
    if let Some(caps) = AGE_RANGE_RE.captures(text) {
        let min: u32 = caps[1].parse().unwrap_or(0);
        let max: u32 = caps[2].parse().unwrap_or(0);
        return (Some(min), Some(max));
    }
    if let Some(caps) = AGE_AB_RE.captures(text) {
        return (caps[1].parse().ok(), None);
    }
    if let Some(caps) = AGE_BIS_RE.captures(text) {
        return (None, caps[1].parse().ok());
    }
    if let Some(caps) = AGE_PLUS_RE.captures(text) {
        return (caps[1].parse().ok(), None);
    }
    (None, None)
}

// --- Indoor / outdoor -------------------------------------------------------

const INDOOR_KEYWORDS: &[&str] = &["indoor", "drinnen", "halle", "museum", "theater", "kino"];
const OUTDOOR_KEYWORDS: &[&str] = &["outdoor", "draußen", "draussen", "garten", "park", "wald", "spielplatz"];

fn detect_indoor_outdoor(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let indoor = INDOOR_KEYWORDS.iter().any(|k| lower.contains(k));
    let outdoor = OUTDOOR_KEYWORDS.iter().any(|k| lower.contains(k));
    match (indoor, outdoor) {
        (true, false) => Some("indoor".to_string()),
        (false, true) => Some("outdoor".to_string()),
        _ => None,
    }
}

// --- Language ----------------------------------------------------------------

fn detect_language(text: &str) -> String {
    let lower = text.to_lowercase();
    if lower.contains("english") || lower.contains("in englisch") {
        "en".to_string()
    } else {
        "de".to_string()
    }
}

// --- Recurrence --------------------------------------------------------------

static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)jeden\s+(montag|dienstag|mittwoch|donnerstag|freitag|samstag|sonntag)").unwrap()
});
static DAILY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btäglich\b").unwrap());
static WEEKLY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bwöchentlich\b").unwrap());
static MONTHLY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bmonatlich\b").unwrap());

fn weekday_code(name: &str) -> Option<&'static str> {
    match name.to_lowercase().as_str() {
        "montag" => Some("MO"),
        "dienstag" => Some("TU"),
        "mittwoch" => Some("WE"),
        "donnerstag" => Some("TH"),
        "freitag" => Some("FR"),
        "samstag" => Some("SA"),
        "sonntag" => Some("SU"),
        _ => None,
    }
}

fn detect_recurrence(parsed: &ParsedEvent, text: &str) -> Option<String> {
    if let Some(existing) = parsed.raw_data.get("rrule").and_then(|v| v.as_str()) {
        if !existing.trim().is_empty() {
            return Some(existing.to_string());
        }
    }
    if let Some(caps) = WEEKDAY_RE.captures(text) {
        let code = weekday_code(&caps[1])?;
        return Some(format!("FREQ=WEEKLY;BYDAY={code}"));
    }
    if DAILY_RE.is_match(text) {
        return Some("FREQ=DAILY".to_string());
    }
    if WEEKLY_RE.is_match(text) {
        return Some("FREQ=WEEKLY".to_string());
    }
    if MONTHLY_RE.is_match(text) {
        return Some("FREQ=MONTHLY".to_string());
    }
    None
}

// --- Contact -----------------------------------------------------------------

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}").unwrap());
static PHONE_INTL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+49[\d\s/\-]{6,}\d").unwrap());
static PHONE_PAREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(0\d{2,5}\)\s*\d[\d\s/\-]{2,}\d").unwrap());
static PHONE_LOCAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b0\d{2,5}[\s/\-]\d{3,}\b").unwrap());

fn find_unique(re: &Regex, text: &str) -> Vec<String> {
    let mut out: Vec<String> = re.find_iter(text).map(|m| m.as_str().trim().to_string()).collect();
    out.sort();
    out.dedup();
    out
}

fn extract_contact(text: &str) -> ContactInfo {
    let emails = find_unique(&EMAIL_RE, text);
    let mut phones = find_unique(&PHONE_INTL_RE, text);
    phones.extend(find_unique(&PHONE_PAREN_RE, text));
    phones.extend(find_unique(&PHONE_LOCAL_RE, text));
    phones.sort();
    phones.dedup();
    ContactInfo { emails, phones }
}

// --- Images -------------------------------------------------------------------

fn normalize_images(image_url: Option<&str>) -> Vec<String> {
    image_url
        .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
        .map(|u| vec![u.to_string()])
        .unwrap_or_default()
        .into_iter()
        .take(10)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_event() -> ParsedEvent {
        ParsedEvent {
            external_id: "e1".to_string(),
            fingerprint: "f".repeat(32),
            title: "  <b>Kinderkonzert</b>  ".to_string(),
            description: Some("Karten: Erwachsene 8,00 EUR, Kinder 4,00 EUR. Beginn um 19 Uhr.".to_string()),
            start_datetime: Some(NORMALIZER_TZ.with_ymd_and_hms(2026, 2, 14, 0, 0, 0).unwrap().with_timezone(&chrono::Utc)),
            end_datetime: None,
            location_name: None,
            location_address: Some("Badisches Staatstheater, Hermann-Levi-Platz 1, 76137 Karlsruhe".to_string()),
            lat: None,
            lng: None,
            price: None,
            currency: None,
            organizer_name: None,
            image_url: Some("https://ex.invalid/img.jpg".to_string()),
            source_url: Some("https://ex.invalid/e1".to_string()),
            raw_data: HashMap::new(),
            deep_fetched: false,
        }
    }

    #[test]
    fn strips_html_from_title() {
        let ev = base_event();
        let normalized = normalize(&ev);
        assert_eq!(normalized.title, "Kinderkonzert");
    }

    #[test]
    fn pulls_time_out_of_description_for_midnight_date() {
        let ev = base_event();
        let normalized = normalize(&ev);
        let start = normalized.start_datetime.unwrap();
        assert_eq!((start.hour(), start.minute()), (19, 0));
    }

    #[test]
    fn splits_composite_venue_and_address() {
        let ev = base_event();
        let normalized = normalize(&ev);
        assert_eq!(normalized.venue_name.as_deref(), Some("Badisches Staatstheater"));
        assert!(normalized.location_address.unwrap().contains("76137"));
    }

    #[test]
    fn detects_price_range_from_adult_child_breakdown() {
        let ev = base_event();
        let normalized = normalize(&ev);
        assert_eq!(normalized.price_type, PriceType::Range);
        let breakdown = normalized.price_breakdown.unwrap();
        assert_eq!(breakdown.adult, Some("8.00".parse().unwrap()));
        assert_eq!(breakdown.child, Some("4.00".parse().unwrap()));
    }

    #[test]
    fn free_marker_overrides_numeric_price() {
        let mut ev = base_event();
        ev.description = Some("Eintritt frei fuer alle".to_string());
        ev.price = Some("5".parse().unwrap());
        let normalized = normalize(&ev);
        assert_eq!(normalized.price_type, PriceType::Free);
    }

    #[test]
    fn detects_cancelled_availability() {
        let mut ev = base_event();
        ev.description = Some("Die Veranstaltung wurde abgesagt.".to_string());
        let normalized = normalize(&ev);
        assert_eq!(normalized.availability, AvailabilityStatus::Cancelled);
    }

    #[test]
    fn extracts_age_range() {
        let mut ev = base_event();
        ev.description = Some("Geeignet fuer Kinder 6-10 Jahre.".to_string());
        let normalized = normalize(&ev);
        assert_eq!(normalized.age_min, Some(6));
        assert_eq!(normalized.age_max, Some(10));
    }

    #[test]
    fn caps_images_and_rejects_relative_urls() {
        let mut ev = base_event();
        ev.image_url = Some("/relative/img.jpg".to_string());
        let normalized = normalize(&ev);
        assert!(normalized.images.is_empty());
    }

    #[test]
    fn end_before_start_rolls_to_next_day() {
        let mut ev = base_event();
        ev.description = Some("Beginn 23:00 bis 01:00 Uhr.".to_string());
        let normalized = normalize(&ev);
        let start = normalized.start_datetime.unwrap();
        let end = normalized.end_datetime.unwrap();
        assert!(end > start);
    }
}
