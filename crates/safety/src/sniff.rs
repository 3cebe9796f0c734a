//! Content-Type Sniffer. Given a `Content-Type` header and
//! the first ≤8 KB of body, determines whether a fetched resource is an RSS/
//! Atom feed, an iCalendar feed, an HTML page, or unknown.

use eventscout_core::ContentKind;

/// Body prefix examined by the sniffer.
pub const SNIFF_WINDOW: usize = 8 * 1024;

pub fn sniff(content_type_header: Option<&str>, body: &[u8]) -> ContentKind {
    let window = &body[..body.len().min(SNIFF_WINDOW)];
    let body_str = String::from_utf8_lossy(window);
    let body_trim = body_str.trim_start();
    let body_lower = body_trim.to_ascii_lowercase();

    if let Some(ct) = content_type_header {
        let ct_lower = ct.to_ascii_lowercase();
        if ct_lower.contains("text/calendar") || ct_lower.contains("application/ics") {
            return ContentKind::Ics;
        }
        if ct_lower.contains("application/rss+xml") || ct_lower.contains("application/atom+xml") {
            return ContentKind::Rss;
        }
        if ct_lower.contains("text/xml") || ct_lower.contains("application/xml") {
            if body_lower.starts_with("<rss")
                || body_lower.starts_with("<feed")
                || body_lower.starts_with("<?xml")
            {
                return ContentKind::Rss;
            }
        }
        if ct_lower.contains("text/html")
            && (body_lower.starts_with("<!doctype") || body_lower.starts_with("<html"))
        {
            return ContentKind::Html;
        }
    }

    sniff_body(&body_lower)
}

fn sniff_body(body_lower: &str) -> ContentKind {
    if body_lower.contains("begin:vcalendar") {
        return ContentKind::Ics;
    }
    if body_lower.starts_with("<!doctype") || body_lower.starts_with("<html") {
        return ContentKind::Html;
    }
    if body_lower.starts_with("<?xml") || body_lower.starts_with("<rss") || body_lower.starts_with("<feed") {
        return ContentKind::Rss;
    }
    ContentKind::Unknown
}

/// Describes a mismatch between the source's configured type and the
/// detected type, for the error-taxonomy's descriptive-message requirement.
pub fn mismatch_message(configured: ContentKind, detected: ContentKind) -> Option<String> {
    if configured == detected {
        return None;
    }
    Some(format!(
        "source configured as {configured:?} but content sniffed as {detected:?}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_rss_mime_wins() {
        let kind = sniff(Some("application/rss+xml; charset=utf-8"), b"<rss>...");
        assert_eq!(kind, ContentKind::Rss);
    }

    #[test]
    fn header_ics_mime_wins() {
        let kind = sniff(Some("text/calendar"), b"BEGIN:VCALENDAR\n");
        assert_eq!(kind, ContentKind::Ics);
    }

    #[test]
    fn xml_header_needs_body_confirmation() {
        let kind = sniff(Some("text/xml"), b"<?xml version=\"1.0\"?><rss>");
        assert_eq!(kind, ContentKind::Rss);

        let kind = sniff(Some("text/xml"), b"<sitemapindex>");
        assert_eq!(kind, ContentKind::Unknown);
    }

    #[test]
    fn sniffs_body_when_no_useful_header() {
        assert_eq!(sniff(None, b"BEGIN:VCALENDAR\nVERSION:2.0"), ContentKind::Ics);
        assert_eq!(sniff(None, b"<!doctype html><html>"), ContentKind::Html);
        assert_eq!(sniff(None, b"<?xml version=\"1.0\"?><feed>"), ContentKind::Rss);
        assert_eq!(sniff(None, b"garbage"), ContentKind::Unknown);
    }

    #[test]
    fn mismatch_reports_descriptive_message() {
        let msg = mismatch_message(ContentKind::Rss, ContentKind::Html).unwrap();
        assert!(msg.contains("Rss"));
        assert!(msg.contains("Html"));
        assert!(mismatch_message(ContentKind::Rss, ContentKind::Rss).is_none());
    }
}
