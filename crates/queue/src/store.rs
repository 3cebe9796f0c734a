//! The public job-queue API: `enqueue`/`dequeue`/`complete`/`fail` plus
//! status/result/length lookups, dispatching to whichever `QueueBackend`
//! was constructed. Queue routing (`type -> queue`) and the known queue
//! names are fixed by the system this store serves: `crawl`, `classify`,
//! `score`, `geocode`.

use std::collections::HashMap;
use std::sync::Arc;

use eventscout_core::{Job, JobStatus, QueueConfig};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::QueueBackend;
use crate::error::QueueError;
use crate::memory::MemoryBackend;
use crate::redis_backend::RedisBackend;
use crate::scoring::{backoff_seconds, delivery_score};

pub const QUEUE_NAMES: &[&str] = &["crawl", "classify", "score", "geocode"];

/// Maps a job type string to its queue. An unrecognized type routes to
/// `None`; the worker treats that as an immediate non-retry failure
/// rather than guessing a queue for it.
pub fn route(job_type: &str) -> Option<&'static str> {
    match job_type {
        "crawl" => Some("crawl"),
        "classify" => Some("classify"),
        "score" => Some("score"),
        "geocode" => Some("geocode"),
        _ => None,
    }
}

#[derive(Clone)]
pub struct JobQueue {
    backend: Arc<dyn QueueBackend>,
    default_max_attempts: u32,
}

impl JobQueue {
    /// Connects to Redis when `config.redis_url` is set and reachable;
    /// otherwise falls back to the in-memory backend. This fallback is
    /// resolved once, here, at construction — never implicitly re-tried
    /// mid-run, so callers always know which backend they hold.
    pub async fn connect(config: &QueueConfig) -> Self {
        let backend: Arc<dyn QueueBackend> = match &config.redis_url {
            Some(url) => {
                match RedisBackend::connect(url, "eventscout", config.job_ttl_hours, config.result_ttl_hours).await {
                    Ok(redis) => {
                        info!("job queue connected to redis");
                        Arc::new(redis)
                    }
                    Err(err) => {
                        warn!(error = %err, "redis unreachable, falling back to in-memory job queue");
                        Arc::new(MemoryBackend::new())
                    }
                }
            }
            None => Arc::new(MemoryBackend::new()),
        };
        Self { backend, default_max_attempts: config.default_max_attempts }
    }

    pub fn memory() -> Self {
        Self { backend: Arc::new(MemoryBackend::new()), default_max_attempts: 5 }
    }

    /// Stores the job and inserts it into `queue` with the delivery score
    /// described in §4.13.
    pub async fn enqueue(
        &self,
        job_type: impl Into<String>,
        payload: HashMap<String, serde_json::Value>,
        queue: &str,
        priority: i64,
        delay_seconds: i64,
    ) -> Result<Job, QueueError> {
        let job_type = job_type.into();
        let id = Uuid::new_v4().to_string();
        let job = Job::new(id, job_type, queue.to_string(), payload, priority, self.default_max_attempts);
        let score = delivery_score(priority, delay_seconds);
        self.backend.push(queue, job.clone(), score).await?;
        Ok(job)
    }

    /// Pops the minimum-score job from `queue`, transitioning it to
    /// `running` and persisting the transition before returning it.
    pub async fn dequeue(&self, queue: &str) -> Result<Option<Job>, QueueError> {
        let Some(mut job) = self.backend.pop(queue).await? else {
            return Ok(None);
        };
        job.status = JobStatus::Running;
        job.started_at = Some(chrono::Utc::now());
        job.attempts += 1;
        self.backend.store_job(&job).await?;
        Ok(job)
    }

    pub async fn complete(&self, mut job: Job, result: serde_json::Value) -> Result<(), QueueError> {
        job.status = JobStatus::Success;
        job.finished_at = Some(chrono::Utc::now());
        job.result = Some(result.clone());
        self.backend.store_job(&job).await?;
        self.backend.store_result(&job.id, result).await?;
        Ok(())
    }

    /// On `retry=true` with attempts remaining, requeues with exponential
    /// backoff; otherwise transitions to `failed` and, for a retryable job
    /// that exhausted its attempts, also records it to the DLQ.
    pub async fn fail(&self, mut job: Job, error: impl Into<String>, retry: bool) -> Result<(), QueueError> {
        job.error = Some(error.into());
        if retry && job.attempts < job.max_attempts {
            let delay = backoff_seconds(job.attempts);
            let score = delivery_score(job.priority, delay);
            job.status = JobStatus::Queued;
            let queue = job.queue.clone();
            self.backend.requeue(&queue, job, score).await?;
        } else {
            job.status = JobStatus::Failed;
            job.finished_at = Some(chrono::Utc::now());
            let queue = job.queue.clone();
            self.backend.store_job(&job).await?;
            if retry {
                self.backend.dead_letter(&queue, job).await?;
            }
        }
        Ok(())
    }

    pub async fn get_status(&self, job_id: &str) -> Result<Option<Job>, QueueError> {
        self.backend.get_job(job_id).await
    }

    pub async fn get_result(&self, job_id: &str) -> Result<Option<serde_json::Value>, QueueError> {
        self.backend.get_result(job_id).await
    }

    pub async fn get_queue_length(&self, queue: &str) -> Result<usize, QueueError> {
        self.backend.queue_length(queue).await
    }

    pub async fn get_dlq_count(&self, queue: &str) -> Result<usize, QueueError> {
        self.backend.dlq_count(queue).await
    }

    /// Depths for every declared queue, used by `GET /metrics`.
    pub async fn depths(&self) -> Result<HashMap<String, usize>, QueueError> {
        let mut out = HashMap::new();
        for name in QUEUE_NAMES {
            out.insert(name.to_string(), self.backend.queue_length(name).await?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_then_dequeue_transitions_to_running() {
        let queue = JobQueue::memory();
        queue.enqueue("crawl", HashMap::new(), "crawl", 0, 0).await.unwrap();
        let job = queue.dequeue("crawl").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.attempts, 1);
        assert!(job.started_at.is_some());
    }

    #[tokio::test]
    async fn fail_with_retry_requeues_until_attempts_exhausted() {
        let queue = JobQueue::memory();
        let job = queue.enqueue("crawl", HashMap::new(), "crawl", 0, 0).await.unwrap();
        let mut job = queue.dequeue("crawl").await.unwrap().unwrap();
        job.max_attempts = 2;
        queue.fail(job.clone(), "boom", true).await.unwrap();

        let requeued = queue.get_status(&job.id).await.unwrap().unwrap();
        assert_eq!(requeued.status, JobStatus::Queued);

        let mut job2 = queue.dequeue("crawl").await.unwrap().unwrap();
        job2.max_attempts = 2;
        queue.fail(job2, "boom again", true).await.unwrap();
        let final_job = queue.get_status(&job.id).await.unwrap().unwrap();
        assert_eq!(final_job.status, JobStatus::Failed);
        assert_eq!(queue.get_dlq_count("crawl").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn complete_persists_result() {
        let queue = JobQueue::memory();
        queue.enqueue("crawl", HashMap::new(), "crawl", 0, 0).await.unwrap();
        let job = queue.dequeue("crawl").await.unwrap().unwrap();
        queue.complete(job.clone(), serde_json::json!({"created": 3})).await.unwrap();
        let result = queue.get_result(&job.id).await.unwrap().unwrap();
        assert_eq!(result["created"], 3);
    }

    #[test]
    fn route_maps_known_types_only() {
        assert_eq!(route("crawl"), Some("crawl"));
        assert_eq!(route("geocode"), Some("geocode"));
        assert_eq!(route("unknown_type"), None);
    }
}
