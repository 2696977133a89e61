//! Configuration module for popcrawl
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every section has defaults, so a missing or empty file yields a
//! usable configuration that the CLI can override flag by flag.
//!
//! # Example
//!
//! ```no_run
//! use popcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Global fetch bound: {}", config.crawler.max_concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CacheConfig, CacheTtls, Config, CrawlerConfig, SeedConfig, SiteConfig, StorageConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, hash_str, load_config, load_config_with_hash};

// Re-export validation
pub use validation::validate;
