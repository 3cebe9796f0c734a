//! In-process fallback queue, used when `REDIS_URL` is unset or the Redis
//! dial fails at startup. Grounded in `crates/frontier`'s `NetworkQueue`
//! (a `priority_queue::PriorityQueue` paired with a side job-data map, one
//! instance per logical lane) — generalized here from "one lane per
//! overlay network" to "one lane per job queue name", and from a
//! max-first `f64` priority to a min-first `i64` delivery score via
//! `std::cmp::Reverse`.

use std::cmp::Reverse;
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use eventscout_core::Job;
use priority_queue::PriorityQueue;

use crate::backend::QueueBackend;
use crate::error::QueueError;

struct Lane {
    queue: PriorityQueue<String, Reverse<i64>>,
    dlq: Vec<String>,
}

impl Lane {
    fn new() -> Self {
        Self { queue: PriorityQueue::new(), dlq: Vec::new() }
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    lanes: DashMap<String, Mutex<Lane>>,
    jobs: DashMap<String, Job>,
    results: DashMap<String, serde_json::Value>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane(&self, queue: &str) -> dashmap::mapref::one::RefMut<'_, String, Mutex<Lane>> {
        self.lanes.entry(queue.to_string()).or_insert_with(|| Mutex::new(Lane::new()))
    }
}

#[async_trait]
impl QueueBackend for MemoryBackend {
    async fn push(&self, queue: &str, job: Job, score: i64) -> Result<(), QueueError> {
        let id = job.id.clone();
        self.jobs.insert(id.clone(), job);
        let lane = self.lane(queue);
        lane.lock().unwrap().queue.push(id, Reverse(score));
        Ok(())
    }

    async fn pop(&self, queue: &str) -> Result<Option<Job>, QueueError> {
        let id = {
            let lane = self.lane(queue);
            lane.lock().unwrap().queue.pop().map(|(id, _)| id)
        };
        match id {
            Some(id) => Ok(self.jobs.get(&id).map(|j| j.clone())),
            None => Ok(None),
        }
    }

    async fn requeue(&self, queue: &str, job: Job, score: i64) -> Result<(), QueueError> {
        self.push(queue, job, score).await
    }

    async fn dead_letter(&self, queue: &str, job: Job) -> Result<(), QueueError> {
        let id = job.id.clone();
        self.jobs.insert(id.clone(), job);
        let lane = self.lane(queue);
        lane.lock().unwrap().dlq.push(id);
        Ok(())
    }

    async fn store_job(&self, job: &Job) -> Result<(), QueueError> {
        self.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<Job>, QueueError> {
        Ok(self.jobs.get(job_id).map(|j| j.clone()))
    }

    async fn store_result(&self, job_id: &str, result: serde_json::Value) -> Result<(), QueueError> {
        self.results.insert(job_id.to_string(), result);
        Ok(())
    }

    async fn get_result(&self, job_id: &str) -> Result<Option<serde_json::Value>, QueueError> {
        Ok(self.results.get(job_id).map(|r| r.clone()))
    }

    async fn queue_length(&self, queue: &str) -> Result<usize, QueueError> {
        Ok(self.lane(queue).lock().unwrap().queue.len())
    }

    async fn dlq_count(&self, queue: &str) -> Result<usize, QueueError> {
        Ok(self.lane(queue).lock().unwrap().dlq.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventscout_core::JobStatus;
    use std::collections::HashMap;

    fn job(id: &str) -> Job {
        Job::new(id.to_string(), "crawl", "crawl", HashMap::new(), 0, 5)
    }

    #[tokio::test]
    async fn pop_returns_lowest_score_first() {
        let backend = MemoryBackend::new();
        backend.push("crawl", job("a"), 100).await.unwrap();
        backend.push("crawl", job("b"), 10).await.unwrap();
        let popped = backend.pop("crawl").await.unwrap().unwrap();
        assert_eq!(popped.id, "b");
    }

    #[tokio::test]
    async fn empty_queue_pops_none() {
        let backend = MemoryBackend::new();
        assert!(backend.pop("crawl").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dead_letter_is_tracked_separately_from_the_lane() {
        let backend = MemoryBackend::new();
        let mut j = job("c");
        j.status = JobStatus::Failed;
        backend.dead_letter("crawl", j).await.unwrap();
        assert_eq!(backend.dlq_count("crawl").await.unwrap(), 1);
        assert_eq!(backend.queue_length("crawl").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stored_result_round_trips() {
        let backend = MemoryBackend::new();
        backend.store_result("j1", serde_json::json!({"ok": true})).await.unwrap();
        let result = backend.get_result("j1").await.unwrap().unwrap();
        assert_eq!(result["ok"], true);
    }
}
