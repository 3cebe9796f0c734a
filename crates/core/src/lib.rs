pub mod budget;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod types;

pub use budget::{BudgetCounter, BudgetSnapshot, BudgetStatus};
pub use config::{
    AiConfig, ApiConfig, AppConfig, DeepFetchConfig, GeneralConfig, IngestConfig, QueueConfig,
    ScraperDefaults,
};
pub use error::EventscoutError;
pub use types::*;
