//! Crawl orchestration: nodes, traversal, run statistics
//!
//! This module ties the pipeline together: it builds the fetcher, cache,
//! extractor, and batch writer for a run, wires cancellation, and walks
//! the hierarchy level by level.

mod node;
mod orchestrator;
mod stats;

pub use node::{CrawlNode, NodeState};
pub use orchestrator::{Orchestrator, RunOptions};
pub use stats::{LevelSummary, RunStats, RunSummary};

use crate::audit::{AuditSink, TracingSink};
use crate::cache::CacheManager;
use crate::config::Config;
use crate::extract::{PageExtractor, TableExtractor};
use crate::fetch::Fetcher;
use crate::storage::{BatchWriter, RunStatus, SqliteStorage, Storage};
use crate::Result;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Runs a complete crawl
///
/// Constructs every component for this run (no state outlives it except
/// the database and the cache directory), records the run in storage, and
/// walks the hierarchy. Ctrl-C and the optional run timeout cancel
/// cooperatively: in-flight nodes finish, partial batches flush, and a
/// partial summary is returned with `aborted` set.
pub async fn run_crawl(config: Config, config_hash: &str, options: RunOptions) -> Result<RunSummary> {
    let config = Arc::new(config);
    let audit: Arc<dyn AuditSink> = Arc::new(TracingSink);

    let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::new(Path::new(
        &config.storage.database_path,
    ))?);
    let fetcher = Arc::new(Fetcher::new(&config.site, &config.crawler, audit.clone())?);
    let cache = Arc::new(CacheManager::from_config(&config.cache)?);
    let extractor: Arc<dyn PageExtractor> = Arc::new(TableExtractor::new());
    let writer = Arc::new(BatchWriter::new(
        storage.clone(),
        audit.clone(),
        &config.storage,
        options.dry_run,
    ));

    let orchestrator = Orchestrator::new(
        config.clone(),
        fetcher,
        cache,
        extractor,
        writer,
        storage.clone(),
        audit,
        options,
    );

    let run_id = storage.create_run(config_hash)?;

    let flag = orchestrator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("cancellation requested; letting in-flight nodes finish");
            flag.store(true, Ordering::Relaxed);
        }
    });

    if let Some(secs) = config.crawler.run_timeout_secs {
        let flag = orchestrator.cancel_flag();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::warn!(secs, "run timeout reached; letting in-flight nodes finish");
            flag.store(true, Ordering::Relaxed);
        });
    }

    match orchestrator.run().await {
        Ok(summary) => {
            let status = if summary.aborted {
                RunStatus::Aborted
            } else {
                RunStatus::Completed
            };
            storage.complete_run(run_id, status)?;
            Ok(summary)
        }
        Err(err) => {
            // Best effort: the backend may be the thing that just died.
            let _ = storage.complete_run(run_id, RunStatus::Failed);
            Err(err)
        }
    }
}
