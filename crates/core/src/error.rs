use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventscoutError {
    #[error("network error: {0}")]
    Network(String),

    #[error("timeout after {0}s")]
    Timeout(u64),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("blocked by safety policy: {0}")]
    Blocked(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl EventscoutError {
    /// Short machine code for the HTTP layer (§7: validation errors carry a stable code).
    pub fn code(&self) -> &'static str {
        match self {
            EventscoutError::Network(_) => "network_error",
            EventscoutError::Timeout(_) => "timeout",
            EventscoutError::InvalidUrl(_) => "invalid_url",
            EventscoutError::Blocked(_) => "url_blocked",
            EventscoutError::Parse(_) => "parse_error",
            EventscoutError::Extraction(_) => "extraction_error",
            EventscoutError::Queue(_) => "queue_error",
            EventscoutError::Config(_) => "config_error",
            EventscoutError::BodyTooLarge { .. } => "body_too_large",
            EventscoutError::Other(_) => "internal_error",
        }
    }
}
