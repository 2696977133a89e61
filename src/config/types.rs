use crate::model::Level;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for popcrawl
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub seeds: SeedConfig,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Site root, e.g. "https://my.taggrading.com"
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Path of the pop-report index below the site root
    #[serde(rename = "index-path", default = "default_index_path")]
    pub index_path: String,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Crawler concurrency and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrawlerConfig {
    /// Global bound on simultaneous in-flight HTTP requests
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Bound on simultaneous in-flight requests to one host
    #[serde(
        rename = "per-host-concurrency",
        default = "default_per_host_concurrency"
    )]
    pub per_host_concurrency: u32,

    /// Bound on nodes of one level being processed at once
    #[serde(rename = "level-concurrency", default = "default_level_concurrency")]
    pub level_concurrency: u32,

    /// Minimum delay between requests to the same host (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Retries for transient fetch failures (total attempts = retries + 1)
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff (milliseconds)
    #[serde(rename = "retry-base-ms", default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Per-request HTTP timeout (seconds)
    #[serde(rename = "http-timeout-secs", default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Optional wall-clock limit for the whole run (seconds)
    #[serde(rename = "run-timeout-secs", default)]
    pub run_timeout_secs: Option<u64>,
}

/// Cache participation and per-level TTL configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory for the on-disk store; None keeps the cache in memory
    #[serde(default)]
    pub directory: Option<String>,

    #[serde(rename = "ttl-secs", default)]
    pub ttl_secs: CacheTtls,
}

/// Time-to-live per hierarchy level, in seconds
///
/// Index-side pages change rarely and cache long; card detail pages churn
/// and cache short.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheTtls {
    #[serde(default = "default_ttl_category")]
    pub category: u64,
    #[serde(default = "default_ttl_year")]
    pub year: u64,
    #[serde(default = "default_ttl_set")]
    pub set: u64,
    #[serde(default = "default_ttl_card")]
    pub card: u64,
    #[serde(rename = "grade-row", default = "default_ttl_grade_row")]
    pub grade_row: u64,
}

impl CacheTtls {
    pub fn for_level(&self, level: Level) -> Duration {
        let secs = match level {
            Level::Category => self.category,
            Level::Year => self.year,
            Level::Set => self.set,
            Level::Card => self.card,
            Level::GradeRow => self.grade_row,
        };
        Duration::from_secs(secs)
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Records buffered per level before a flush is forced
    ///
    /// Larger batches amortize transaction overhead but cost more memory
    /// and more rework when a batch retries.
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Bound on simultaneous flush transactions
    #[serde(rename = "max-concurrent-flushes", default = "default_max_flushes")]
    pub max_concurrent_flushes: u32,

    /// Retries for transient database errors per batch
    #[serde(rename = "flush-retries", default = "default_flush_retries")]
    pub flush_retries: u32,
}

/// Seed selection
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SeedConfig {
    /// Sports to crawl; empty means discover all from the index page
    #[serde(default)]
    pub sports: Vec<String>,
}

fn default_base_url() -> String {
    "https://my.taggrading.com".to_string()
}

fn default_index_path() -> String {
    "/pop-report".to_string()
}

fn default_user_agent() -> String {
    format!("popcrawl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_concurrency() -> u32 {
    10
}

fn default_per_host_concurrency() -> u32 {
    4
}

fn default_level_concurrency() -> u32 {
    4
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    500
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_ttl_category() -> u64 {
    24 * 3600
}

fn default_ttl_year() -> u64 {
    12 * 3600
}

fn default_ttl_set() -> u64 {
    6 * 3600
}

fn default_ttl_card() -> u64 {
    2 * 3600
}

fn default_ttl_grade_row() -> u64 {
    3600
}

fn default_database_path() -> String {
    "./popcrawl.db".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_max_flushes() -> u32 {
    5
}

fn default_flush_retries() -> u32 {
    3
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            index_path: default_index_path(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            per_host_concurrency: default_per_host_concurrency(),
            level_concurrency: default_level_concurrency(),
            request_delay_ms: default_request_delay_ms(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            http_timeout_secs: default_http_timeout_secs(),
            run_timeout_secs: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            ttl_secs: CacheTtls::default(),
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            category: default_ttl_category(),
            year: default_ttl_year(),
            set: default_ttl_set(),
            card: default_ttl_card(),
            grade_row: default_ttl_grade_row(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            batch_size: default_batch_size(),
            max_concurrent_flushes: default_max_flushes(),
            flush_retries: default_flush_retries(),
        }
    }
}
