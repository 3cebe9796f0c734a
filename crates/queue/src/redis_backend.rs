//! Redis-backed queue: one sorted set per queue name scored by
//! `scoring::delivery_score`, a `job:<id>` string holding the serialized
//! `Job`, a `result:<id>` string with a 1h TTL, and a `dlq:<queue>` set.
//! Grounded in `riptide-workers/src/queue.rs`'s `JobQueue` (zadd/zrem
//! scoring, `SET ... EX` for result TTL), adapted from a `MultiplexedConnection`
//! to the auto-reconnecting `ConnectionManager`.

use async_trait::async_trait;
use eventscout_core::Job;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::backend::QueueBackend;
use crate::error::QueueError;

pub struct RedisBackend {
    conn: ConnectionManager,
    namespace: String,
    job_ttl_seconds: i64,
    result_ttl_seconds: i64,
}

impl RedisBackend {
    pub async fn connect(redis_url: &str, namespace: impl Into<String>, job_ttl_hours: i64, result_ttl_hours: i64) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        let conn = client.get_connection_manager().await.map_err(QueueError::Redis)?;
        Ok(Self {
            conn,
            namespace: namespace.into(),
            job_ttl_seconds: job_ttl_hours * 3600,
            result_ttl_seconds: result_ttl_hours * 3600,
        })
    }

    fn queue_key(&self, queue: &str) -> String {
        format!("{}:queue:{}", self.namespace, queue)
    }

    fn dlq_key(&self, queue: &str) -> String {
        format!("{}:dlq:{}", self.namespace, queue)
    }

    fn job_key(&self, job_id: &str) -> String {
        format!("{}:job:{}", self.namespace, job_id)
    }

    fn result_key(&self, job_id: &str) -> String {
        format!("{}:result:{}", self.namespace, job_id)
    }
}

#[async_trait]
impl QueueBackend for RedisBackend {
    async fn push(&self, queue: &str, job: Job, score: i64) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        self.store_job(&job).await?;
        conn.zadd::<_, _, _, ()>(self.queue_key(queue), job.id.clone(), score).await.map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn pop(&self, queue: &str) -> Result<Option<Job>, QueueError> {
        let mut conn = self.conn.clone();
        let popped: Vec<(String, f64)> = conn.zpopmin(self.queue_key(queue), 1).await.map_err(QueueError::Redis)?;
        match popped.into_iter().next() {
            Some((job_id, _)) => self.get_job(&job_id).await,
            None => Ok(None),
        }
    }

    async fn requeue(&self, queue: &str, job: Job, score: i64) -> Result<(), QueueError> {
        self.push(queue, job, score).await
    }

    async fn dead_letter(&self, queue: &str, job: Job) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        self.store_job(&job).await?;
        conn.sadd::<_, _, ()>(self.dlq_key(queue), job.id.clone()).await.map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn store_job(&self, job: &Job) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(job)?;
        conn.set_ex::<_, _, ()>(self.job_key(&job.id), json, self.job_ttl_seconds.max(1) as u64)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<Job>, QueueError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.job_key(job_id)).await.map_err(QueueError::Redis)?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn store_result(&self, job_id: &str, result: serde_json::Value) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(&result)?;
        conn.set_ex::<_, _, ()>(self.result_key(job_id), json, self.result_ttl_seconds.max(1) as u64)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn get_result(&self, job_id: &str) -> Result<Option<serde_json::Value>, QueueError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.result_key(job_id)).await.map_err(QueueError::Redis)?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn queue_length(&self, queue: &str) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        conn.zcard(self.queue_key(queue)).await.map_err(QueueError::Redis)
    }

    async fn dlq_count(&self, queue: &str) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        conn.scard(self.dlq_key(queue)).await.map_err(QueueError::Redis)
    }
}
