use async_trait::async_trait;
use eventscout_core::Job;

use crate::error::QueueError;

/// Storage-agnostic contract the Redis and in-memory implementations both
/// satisfy. `JobQueue` (in `store.rs`) is a thin dispatcher over whichever
/// one was constructed.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    async fn push(&self, queue: &str, job: Job, score: i64) -> Result<(), QueueError>;
    async fn pop(&self, queue: &str) -> Result<Option<Job>, QueueError>;
    async fn requeue(&self, queue: &str, job: Job, score: i64) -> Result<(), QueueError>;
    async fn dead_letter(&self, queue: &str, job: Job) -> Result<(), QueueError>;
    async fn store_job(&self, job: &Job) -> Result<(), QueueError>;
    async fn get_job(&self, job_id: &str) -> Result<Option<Job>, QueueError>;
    async fn store_result(&self, job_id: &str, result: serde_json::Value) -> Result<(), QueueError>;
    async fn get_result(&self, job_id: &str) -> Result<Option<serde_json::Value>, QueueError>;
    async fn queue_length(&self, queue: &str) -> Result<usize, QueueError>;
    async fn dlq_count(&self, queue: &str) -> Result<usize, QueueError>;
}
