//! Dispatch Common Library
//!
//! Shared code for the dispatch services including:
//! - Database models and repository patterns
//! - Typed processing outcomes
//! - Object storage access
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod outcome;
pub mod storage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::{DispatchStore, Repository};
pub use outcome::{FileOutcome, FileType};
pub use storage::BlobFetcher;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
