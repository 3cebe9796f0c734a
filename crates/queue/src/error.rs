use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("unknown queue: {0}")]
    UnknownQueue(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
