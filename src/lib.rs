//! Popcrawl: a hierarchical pop-report crawler
//!
//! This crate walks the five-level Category → Year → Set → Card → GradeRow
//! hierarchy of a pop-report site, persisting records by natural key and
//! routing TOTALS sentinel rows into a separate rollup store.

pub mod audit;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod fetch;
pub mod model;
pub mod storage;
pub mod urls;

use thiserror::Error;

/// Main error type for popcrawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("Extraction error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Loss of the persistence backend itself; the only error that aborts
    /// a run instead of being recovered at a node or batch boundary
    #[error("Fatal pipeline error: {0}")]
    Fatal(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid level name: {0}")]
    InvalidLevel(String),
}

/// Result type alias for popcrawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Orchestrator, RunSummary};
pub use model::{Level, TotalsScope};
