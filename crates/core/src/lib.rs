//! Pigeon Core Library
//!
//! Foundational utilities shared by every Pigeon crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Layered configuration (`.pigeon/config.yaml`, environment, CLI flags)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, EmbeddingSettings, MailSettings, ProviderConfig, RetrievalSettings};
pub use error::{AppError, AppResult};
