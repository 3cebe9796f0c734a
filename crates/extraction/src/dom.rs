//! Small shared DOM helpers. Grounded in `crates/parser/src/html.rs`'s
//! `selector()` caching helper — every extraction stage in this crate
//! compiles selectors on demand through this same helper rather than
//! building its own scraper boilerplate.

use scraper::Selector;

pub fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

pub fn text_of(el: &scraper::ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn resolve_url(base: &url::Url, candidate: &str) -> Option<String> {
    if candidate.trim().is_empty() {
        return None;
    }
    base.join(candidate).ok().map(|u| u.to_string())
}
