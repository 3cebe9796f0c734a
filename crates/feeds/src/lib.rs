pub mod ics;
pub mod rss_atom;
pub mod sitemap;

pub use ics::parse as parse_ics;
pub use rss_atom::parse as parse_rss_atom;
