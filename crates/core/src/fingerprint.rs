//! Stable event fingerprinting.
//!
//! `fingerprint = sha256(title_normalized | YYYY-MM-DD | addr50)[:32]`
//!
//! Shared by the feed parser (which first produces it), the deduplicator
//! (which keys on it), and the deep-fetcher / normalizer (which must not
//! change it after enrichment).

use sha2::{Digest, Sha256};

/// Lowercases, collapses internal whitespace, and strips characters that are
/// not alphanumeric/space so cosmetic differences in title punctuation don't
/// produce different fingerprints.
pub fn normalize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut last_was_space = false;
    for ch in title.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_was_space = false;
        } else if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        }
        // other punctuation dropped entirely
    }
    out.trim().to_string()
}

/// First 50 normalized characters of an address, used as the low-weight
/// disambiguator in the fingerprint
pub fn normalize_address_prefix(address: Option<&str>, max_len: usize) -> String {
    match address {
        None => String::new(),
        Some(addr) => {
            let normalized = normalize_title(addr);
            normalized.chars().take(max_len).collect()
        }
    }
}

/// Computes the 32-char stable fingerprint from a normalized title, an
/// optional `YYYY-MM-DD` date string, and an optional address/geohash
/// disambiguator.
pub fn fingerprint(title: &str, date: Option<&str>, addr_or_geohash: Option<&str>) -> String {
    let norm_title = normalize_title(title);
    let date_part = date.unwrap_or("");
    let addr_part = normalize_address_prefix(addr_or_geohash, 50);

    let input = format!("{norm_title}|{date_part}|{addr_part}");
    let digest = Sha256::digest(input.as_bytes());
    let hex = hex::encode(digest);
    hex[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_produce_same_fingerprint() {
        let a = fingerprint("Kinderkonzert", Some("2026-02-14"), None);
        let b = fingerprint("Kinderkonzert", Some("2026-02-14"), None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn different_date_changes_fingerprint() {
        let a = fingerprint("Kinderkonzert", Some("2026-02-14"), None);
        let b = fingerprint("Kinderkonzert", Some("2026-02-15"), None);
        assert_ne!(a, b);
    }

    #[test]
    fn matches_hand_computed_digest() {
        let fp = fingerprint("Kinderkonzert", Some("2026-02-14"), None);
        let expected = {
            let input = "kinderkonzert|2026-02-14|";
            let digest = sha2::Sha256::digest(input.as_bytes());
            hex::encode(digest)[..32].to_string()
        };
        assert_eq!(fp, expected);
    }

    #[test]
    fn title_normalization_ignores_punctuation_and_case() {
        assert_eq!(normalize_title("Kinder-Konzert!"), "kinderkonzert");
        assert_eq!(normalize_title("  Multiple   Spaces  "), "multiple spaces");
    }
}
