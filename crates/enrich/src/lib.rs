pub mod dedupe;
pub mod deep_fetch;
pub mod normalizer;

pub use dedupe::{dedupe, DedupeStats};
pub use deep_fetch::{enrich_batch, DeepFetchStats};
pub use normalizer::normalize;
