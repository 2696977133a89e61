//! HTTP fetch layer: pooled client, rate limiting, retry policy
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the pooled HTTP client with the configured user agent
//! - Global and per-host concurrency bounds
//! - Per-host minimum inter-request delay
//! - Transient/permanent error classification and retry with backoff

mod client;
mod retry;

pub use client::{build_http_client, FetchError, Fetcher};
pub use retry::RetryPolicy;
