use crate::config::types::Config;
use crate::ConfigError;
use url::Url;

/// Validates a parsed configuration
///
/// Checks that concurrency bounds and batch sizes are positive, TTLs are
/// non-zero, and the site base URL is an absolute http(s) URL.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.crawler.max_concurrency == 0 {
        return Err(ConfigError::Validation(
            "crawler.max-concurrency must be at least 1".to_string(),
        ));
    }

    if config.crawler.per_host_concurrency == 0 {
        return Err(ConfigError::Validation(
            "crawler.per-host-concurrency must be at least 1".to_string(),
        ));
    }

    if config.crawler.level_concurrency == 0 {
        return Err(ConfigError::Validation(
            "crawler.level-concurrency must be at least 1".to_string(),
        ));
    }

    if config.crawler.http_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "crawler.http-timeout-secs must be at least 1".to_string(),
        ));
    }

    if config.storage.batch_size == 0 {
        return Err(ConfigError::Validation(
            "storage.batch-size must be at least 1".to_string(),
        ));
    }

    if config.storage.max_concurrent_flushes == 0 {
        return Err(ConfigError::Validation(
            "storage.max-concurrent-flushes must be at least 1".to_string(),
        ));
    }

    let ttls = &config.cache.ttl_secs;
    for (name, secs) in [
        ("category", ttls.category),
        ("year", ttls.year),
        ("set", ttls.set),
        ("card", ttls.card),
        ("grade-row", ttls.grade_row),
    ] {
        if secs == 0 {
            return Err(ConfigError::Validation(format!(
                "cache.ttl-secs.{} must be at least 1 second",
                name
            )));
        }
    }

    let base = Url::parse(&config.site.base_url).map_err(|e| {
        ConfigError::Validation(format!("site.base-url is not a valid URL: {}", e))
    })?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "site.base-url must be http or https, got {}",
            base.scheme()
        )));
    }
    if base.host_str().is_none() {
        return Err(ConfigError::Validation(
            "site.base-url must have a host".to_string(),
        ));
    }

    if !config.site.index_path.starts_with('/') {
        return Err(ConfigError::Validation(
            "site.index-path must start with '/'".to_string(),
        ));
    }

    Ok(())
}
