pub mod fetcher;
pub mod polite;
pub mod robots;
pub mod throttle;

pub use polite::{scrape_source, ScrapeStats};
pub use throttle::HostThrottle;
