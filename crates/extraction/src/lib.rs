pub mod convert;
pub mod custom;
pub mod dom;
pub mod heuristic;
pub mod pipeline;
pub mod structured;
pub mod suggest;

pub use convert::to_parsed_event;
pub use pipeline::{default_stages, run, ExtractionStage, ALL_FIELDS};
