pub mod fetch;
pub mod sniff;
pub mod ssrf;

pub use fetch::{safe_get, FetchOptions, SafeResponse, DEFAULT_MAX_BODY_BYTES};
pub use sniff::sniff;
pub use ssrf::{guard, guard_url, BlockReason};
