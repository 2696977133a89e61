//! Rate-limited HTTP fetcher
//!
//! All page fetches go through one `Fetcher` per pipeline run. It enforces:
//! - a global bound on in-flight requests (semaphore)
//! - a per-host bound on in-flight requests (semaphore per host)
//! - a minimum inter-request delay paid per host lane, not globally
//! - transient/permanent error classification with retry and backoff
//!
//! Every attempt, success or failure, emits one timing event to the audit
//! sink. There is no global mutable state; limiter state lives inside the
//! `Fetcher` value and is shared via `Arc`.

use crate::audit::{AuditContext, AuditSink};
use crate::config::{CrawlerConfig, SiteConfig};
use crate::fetch::retry::RetryPolicy;
use crate::model::{Ancestry, Level};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Errors produced by the fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    /// Failure worth retrying: timeouts, connection resets, HTTP 429/5xx
    #[error("transient fetch failure for {url}: {reason}")]
    Transient {
        url: String,
        reason: String,
        status: Option<u16>,
    },

    /// Failure that will not improve on retry: 404 and other 4xx,
    /// malformed responses, unparseable URLs
    #[error("permanent fetch failure for {url}: {reason}")]
    Permanent {
        url: String,
        reason: String,
        status: Option<u16>,
    },

    /// Transient failures persisted through every allowed retry; treated
    /// as permanent by callers
    #[error("retries exhausted for {url} after {attempts} attempts: {reason}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        reason: String,
    },
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transient { status, .. } | Self::Permanent { status, .. } => *status,
            Self::RetriesExhausted { .. } => None,
        }
    }

    /// Short classification label for audit events
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient { .. } => "transient",
            Self::Permanent { .. } => "permanent",
            Self::RetriesExhausted { .. } => "retries-exhausted",
        }
    }
}

/// Builds the pooled HTTP client used for every request in a run
pub fn build_http_client(site: &SiteConfig, crawler: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(site.user_agent.clone())
        .timeout(Duration::from_secs(crawler.http_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rate-limited fetcher shared by all crawl tasks in a run
pub struct Fetcher {
    client: Client,
    global: Arc<Semaphore>,
    per_host_limit: usize,
    host_semaphores: Mutex<HashMap<String, Arc<Semaphore>>>,
    next_slot: Mutex<HashMap<String, Instant>>,
    delay: Duration,
    retry: RetryPolicy,
    audit: Arc<dyn AuditSink>,
    attempts: AtomicU64,
    fetched: AtomicU64,
    retries: AtomicU64,
}

impl Fetcher {
    /// Creates a fetcher from the run configuration
    pub fn new(
        site: &SiteConfig,
        crawler: &CrawlerConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(site, crawler)?;
        Ok(Self::with_client(client, crawler, audit))
    }

    /// Creates a fetcher around an existing client (used by tests)
    pub fn with_client(
        client: Client,
        crawler: &CrawlerConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            client,
            global: Arc::new(Semaphore::new(crawler.max_concurrency as usize)),
            per_host_limit: crawler.per_host_concurrency as usize,
            host_semaphores: Mutex::new(HashMap::new()),
            next_slot: Mutex::new(HashMap::new()),
            delay: Duration::from_millis(crawler.request_delay_ms),
            retry: RetryPolicy::new(
                crawler.max_retries,
                Duration::from_millis(crawler.retry_base_ms),
            ),
            audit,
            attempts: AtomicU64::new(0),
            fetched: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        }
    }

    /// Fetches a URL, retrying transient failures with backoff
    ///
    /// Returns the page body on success. Exhausted retries surface as
    /// `FetchError::RetriesExhausted`; permanent failures return on the
    /// first attempt.
    pub async fn fetch(
        &self,
        url: &str,
        level: Level,
        ancestry: &Ancestry,
    ) -> Result<String, FetchError> {
        let ctx = AuditContext::new(level, url).with_ancestry(ancestry);
        let mut attempt: u32 = 0;

        loop {
            let started = Instant::now();
            let result = self.attempt(url).await;
            self.attempts.fetch_add(1, Ordering::Relaxed);

            let status = match &result {
                Ok(_) => "ok".to_string(),
                Err(err) => match err.status() {
                    Some(code) => format!("{}:{}", err.kind(), code),
                    None => err.kind().to_string(),
                },
            };
            self.audit
                .operation("fetch", &ctx, started.elapsed(), &status);

            match result {
                Ok(body) => {
                    self.fetched.fetch_add(1, Ordering::Relaxed);
                    return Ok(body);
                }
                Err(err) if err.is_transient() => {
                    if attempt >= self.retry.max_retries() {
                        return Err(FetchError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: attempt + 1,
                            reason: err.to_string(),
                        });
                    }
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One HTTP attempt: acquire permits, pay the host delay, send, classify
    async fn attempt(&self, url: &str) -> Result<String, FetchError> {
        let host = host_of(url).ok_or_else(|| FetchError::Permanent {
            url: url.to_string(),
            reason: "URL has no host".to_string(),
            status: None,
        })?;

        // Per-host bound first so a slow host cannot hold global slots
        // while its lane is saturated.
        let host_semaphore = self.host_semaphore(&host);
        let _host_permit = host_semaphore
            .acquire()
            .await
            .expect("host semaphore closed");

        let slot = self.reserve_slot(&host);
        tokio::time::sleep_until(slot).await;

        let _global_permit = self.global.acquire().await.expect("global semaphore closed");

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return Err(classify_reqwest_error(url, &e)),
        };

        let status = response.status();
        if let Some(err) = classify_status(url, status) {
            return Err(err);
        }

        match response.text().await {
            Ok(body) => Ok(body),
            Err(e) => Err(FetchError::Permanent {
                url: url.to_string(),
                reason: format!("failed to read body: {}", e),
                status: Some(status.as_u16()),
            }),
        }
    }

    /// Reserves the next send slot for a host lane
    ///
    /// Each reservation pushes the lane's next slot forward by the
    /// configured delay, so concurrent callers on the same host space out
    /// while different hosts proceed independently.
    fn reserve_slot(&self, host: &str) -> Instant {
        let now = Instant::now();
        let mut slots = self.next_slot.lock().unwrap();
        let slot = slots.get(host).copied().unwrap_or(now).max(now);
        slots.insert(host.to_string(), slot + self.delay);
        slot
    }

    fn host_semaphore(&self, host: &str) -> Arc<Semaphore> {
        let mut semaphores = self.host_semaphores.lock().unwrap();
        semaphores
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host_limit)))
            .clone()
    }

    /// Total HTTP attempts made, including retries
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Successful fetches
    pub fn fetched(&self) -> u64 {
        self.fetched.load(Ordering::Relaxed)
    }

    /// Retries performed after transient failures
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

/// Maps a non-success status code to a fetch error, or None for success
fn classify_status(url: &str, status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }

    let code = status.as_u16();
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Some(FetchError::Transient {
            url: url.to_string(),
            reason: format!("HTTP {}", code),
            status: Some(code),
        })
    } else {
        Some(FetchError::Permanent {
            url: url.to_string(),
            reason: format!("HTTP {}", code),
            status: Some(code),
        })
    }
}

fn classify_reqwest_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Transient {
            url: url.to_string(),
            reason: "request timeout".to_string(),
            status: None,
        }
    } else if error.is_connect() {
        FetchError::Transient {
            url: url.to_string(),
            reason: "connection failed".to_string(),
            status: None,
        }
    } else {
        FetchError::Permanent {
            url: url.to_string(),
            reason: error.to_string(),
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::RecordingSink;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_crawler_config() -> CrawlerConfig {
        CrawlerConfig {
            request_delay_ms: 0,
            retry_base_ms: 1,
            max_retries: 3,
            ..Default::default()
        }
    }

    fn test_fetcher(config: &CrawlerConfig) -> (Fetcher, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let client = Client::builder().build().unwrap();
        (
            Fetcher::with_client(client, config, sink.clone()),
            sink,
        )
    }

    #[test]
    fn test_status_classification() {
        let transient = classify_status("u", StatusCode::TOO_MANY_REQUESTS).unwrap();
        assert!(transient.is_transient());
        let transient = classify_status("u", StatusCode::BAD_GATEWAY).unwrap();
        assert!(transient.is_transient());
        let transient = classify_status("u", StatusCode::SERVICE_UNAVAILABLE).unwrap();
        assert!(transient.is_transient());

        let permanent = classify_status("u", StatusCode::NOT_FOUND).unwrap();
        assert!(!permanent.is_transient());
        let permanent = classify_status("u", StatusCode::FORBIDDEN).unwrap();
        assert!(!permanent.is_transient());

        assert!(classify_status("u", StatusCode::OK).is_none());
    }

    #[test]
    fn test_reserve_slot_spaces_out_one_host() {
        let mut config = test_crawler_config();
        config.request_delay_ms = 100;
        let (fetcher, _) = test_fetcher(&config);

        let first = fetcher.reserve_slot("a.example.com");
        let second = fetcher.reserve_slot("a.example.com");
        assert!(second - first >= Duration::from_millis(100));

        // A different host is not delayed by the first lane
        let other = fetcher.reserve_slot("b.example.com");
        assert!(other <= second);
    }

    #[tokio::test]
    async fn test_fetch_success_emits_one_event() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let (fetcher, sink) = test_fetcher(&test_crawler_config());
        let url = format!("{}/page", server.uri());
        let body = fetcher
            .fetch(&url, Level::Category, &Ancestry::default())
            .await
            .unwrap();

        assert_eq!(body, "<html></html>");
        assert_eq!(sink.count_operations("fetch"), 1);
        assert_eq!(fetcher.fetched(), 1);
        assert_eq!(fetcher.retries(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_attempted_max_retries_plus_one() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (fetcher, sink) = test_fetcher(&test_crawler_config());
        let url = format!("{}/flaky", server.uri());
        let err = fetcher
            .fetch(&url, Level::Set, &Ancestry::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::RetriesExhausted { attempts: 4, .. }));
        assert_eq!(fetcher.attempts(), 4);
        assert_eq!(fetcher.retries(), 3);
        assert_eq!(sink.count_operations("fetch"), 4);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (fetcher, sink) = test_fetcher(&test_crawler_config());
        let url = format!("{}/gone", server.uri());
        let err = fetcher
            .fetch(&url, Level::Card, &Ancestry::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Permanent { status: Some(404), .. }));
        assert_eq!(fetcher.attempts(), 1);
        assert_eq!(sink.count_operations("fetch"), 1);
    }

    #[tokio::test]
    async fn test_unparseable_url_is_permanent() {
        let (fetcher, _) = test_fetcher(&test_crawler_config());
        let err = fetcher
            .fetch("not a url", Level::Year, &Ancestry::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Permanent { .. }));
    }
}
