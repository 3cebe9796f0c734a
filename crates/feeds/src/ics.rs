//! iCalendar feed parsing. Parsed with the `icalendar` crate, `VEVENT`
//! components read field-by-field. Recurrence (`RRULE`) is preserved
//! verbatim into `raw_data` for the normalizer to pick up via the `rrule`
//! crate.

use std::collections::HashMap;

use chrono::{NaiveDate, TimeZone, Utc};
use eventscout_core::fingerprint::fingerprint;
use eventscout_core::ParsedEvent;
use icalendar::{Calendar, CalendarDateTime, Component, DatePerhapsTime, EventLike};

pub fn parse(body: &str, source_url: &str) -> Result<Vec<ParsedEvent>, String> {
    let calendar: Calendar = body.parse().map_err(|e: String| e)?;

    let mut out = Vec::new();
    for component in calendar.components {
        let Some(vevent) = component.as_event() else {
            continue;
        };

        let title = vevent.get_summary().unwrap_or("").trim().to_string();
        if title.is_empty() {
            continue;
        }

        let start_datetime = vevent.get_start().and_then(to_utc);
        let end_datetime = vevent.get_end().and_then(to_utc);

        let location_address = vevent.get_location().map(str::to_string);
        let link = vevent.property_value("URL").map(str::to_string);

        let uid = vevent.get_uid().unwrap_or("").to_string();
        let external_id = if !uid.is_empty() {
            uid
        } else {
            let seed = format!(
                "{}|{}",
                title,
                start_datetime.map(|d| d.to_rfc3339()).unwrap_or_default()
            );
            format!("{:x}", md5::compute(seed.as_bytes()))
        };

        let date_str = start_datetime.map(|d| d.format("%Y-%m-%d").to_string());
        let fp = fingerprint(&title, date_str.as_deref(), location_address.as_deref());

        let description = vevent.get_description().map(|s| s.trim().to_string());

        let mut raw_data: HashMap<String, serde_json::Value> = HashMap::new();
        if let Some(rrule) = vevent.property_value("RRULE") {
            raw_data.insert("rrule".to_string(), serde_json::json!(rrule));
        }

        let mut event = ParsedEvent {
            external_id,
            fingerprint: fp,
            title,
            description,
            start_datetime,
            end_datetime,
            location_name: None,
            location_address,
            lat: None,
            lng: None,
            price: None,
            currency: None,
            organizer_name: None,
            image_url: None,
            source_url: link.or_else(|| Some(source_url.to_string())),
            raw_data,
            deep_fetched: false,
        };
        event.enforce_field_bounds();
        out.push(event);
    }

    Ok(out)
}

/// Coerces a date-only DTSTART/DTEND value to midnight.
fn to_utc(dt: DatePerhapsTime) -> Option<chrono::DateTime<Utc>> {
    match dt {
        DatePerhapsTime::DateTime(cdt) => match cdt {
            CalendarDateTime::Utc(d) => Some(d),
            CalendarDateTime::Floating(naive) => Some(Utc.from_utc_datetime(&naive)),
            CalendarDateTime::WithTimezone { date_time, .. } => Some(Utc.from_utc_datetime(&date_time)),
        },
        DatePerhapsTime::Date(naive_date) => naive_date_to_midnight(naive_date),
    }
}

fn naive_date_to_midnight(date: NaiveDate) -> Option<chrono::DateTime<Utc>> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICS_SAMPLE: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Vorlesestunde\r\n\
DTSTART:20260301T100000Z\r\n\
DTEND:20260301T110000Z\r\n\
LOCATION:Stadtbibliothek\\, Hauptstr. 1\\, 76133 Karlsruhe\r\n\
UID:u1\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn parses_vevent_into_parsed_event() {
        let events = parse(ICS_SAMPLE, "https://ex/cal.ics").unwrap();
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.title, "Vorlesestunde");
        assert_eq!(e.external_id, "u1");
        assert!(e.location_address.as_ref().unwrap().contains("76133 Karlsruhe"));
        assert_eq!(
            e.start_datetime.unwrap().format("%Y-%m-%dT%H:%M").to_string(),
            "2026-03-01T10:00"
        );
        assert_eq!(
            e.end_datetime.unwrap().format("%Y-%m-%dT%H:%M").to_string(),
            "2026-03-01T11:00"
        );
    }

    #[test]
    fn missing_uid_falls_back_to_md5() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nSUMMARY:Test\r\nDTSTART:20260301T100000Z\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let events = parse(ics, "https://ex/cal.ics").unwrap();
        assert_eq!(events[0].external_id.len(), 32);
    }
}
