//! vecgate Core Library
//!
//! This crate provides the foundational utilities shared by the vecgate
//! engine and binary:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Layered configuration (defaults, YAML, environment, CLI)
//! - Bounded retry with exponential backoff

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use retry::RetryPolicy;
