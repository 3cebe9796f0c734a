pub mod consumer;
pub mod fallback;
pub mod ingest;
pub mod pipeline;

pub use consumer::{spawn_consumers, WorkerContext};
pub use fallback::spawn_inline_crawl;
pub use ingest::{IngestAction, IngestClient, RunStatus, RunStatusUpdate};
pub use pipeline::{run_crawl_job, run_status_update, CrawlRunResult, IngestCounters, JobOutcome};
