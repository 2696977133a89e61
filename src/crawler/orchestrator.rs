//! Hierarchical crawl orchestration
//!
//! The orchestrator is the only component with cross-level knowledge. It
//! walks the five levels top-down in stages: every node of level L is
//! fetched (through the cache), extracted, handed to the batch writer, and
//! fanned out into level L+1 nodes derived from its records. Fan-out is
//! bounded per level by a semaphore, independent of the fetcher's own
//! transport bounds; the two compose along any path.
//!
//! Failure isolation: a node that cannot be fetched or extracted is
//! recorded and its subtree is not expanded; siblings and ancestors are
//! unaffected. Only loss of the persistence or cache backend aborts a run.

use crate::audit::{AuditContext, AuditSink};
use crate::cache::{CacheManager, GetOrFetchError};
use crate::config::Config;
use crate::crawler::node::{CrawlNode, NodeState};
use crate::crawler::stats::{LevelSummary, RunStats, RunSummary};
use crate::extract::PageExtractor;
use crate::fetch::Fetcher;
use crate::model::{Ancestry, CategoryRecord, Level, RecordData};
use crate::storage::{BatchWriter, Storage};
use crate::urls::{build_set_page_url, index_url, sport_url};
use crate::{CrawlError, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Per-invocation run modes
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Resume from this level using already-persisted parent rows
    pub start_from: Option<Level>,

    /// Run traversal and extraction but skip persistence writes
    pub dry_run: bool,
}

/// Walks the Category → GradeRow hierarchy level by level
pub struct Orchestrator {
    config: Arc<Config>,
    fetcher: Arc<Fetcher>,
    cache: Arc<CacheManager>,
    extractor: Arc<dyn PageExtractor>,
    writer: Arc<BatchWriter>,
    storage: Arc<dyn Storage>,
    audit: Arc<dyn AuditSink>,
    stats: Arc<RunStats>,
    cancelled: Arc<AtomicBool>,
    start_from: Level,
    dry_run: bool,
    started: Instant,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<Fetcher>,
        cache: Arc<CacheManager>,
        extractor: Arc<dyn PageExtractor>,
        writer: Arc<BatchWriter>,
        storage: Arc<dyn Storage>,
        audit: Arc<dyn AuditSink>,
        options: RunOptions,
    ) -> Self {
        Self {
            config,
            fetcher,
            cache,
            extractor,
            writer,
            storage,
            audit,
            stats: Arc::new(RunStats::new()),
            cancelled: Arc::new(AtomicBool::new(false)),
            start_from: options.start_from.unwrap_or(Level::Category),
            dry_run: options.dry_run,
            started: Instant::now(),
        }
    }

    /// Shared flag that requests cooperative cancellation
    ///
    /// Setting it lets in-flight nodes finish, stops new nodes from being
    /// scheduled, and flushes partial batches before the summary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Runs the traversal to completion or cancellation
    ///
    /// Always yields a summary unless a fatal backend error aborts the
    /// run.
    pub async fn run(&self) -> Result<RunSummary> {
        self.traverse().await?;
        Ok(self.summary())
    }

    async fn traverse(&self) -> Result<()> {
        let mut parent_records = match self.start_from {
            Level::Category => {
                let records = if self.config.seeds.sports.is_empty() {
                    let index = CrawlNode::new(
                        Level::Category,
                        index_url(&self.config.site.base_url, &self.config.site.index_path),
                        Ancestry::default(),
                    );
                    self.process_level(Level::Category, vec![index]).await?
                } else {
                    self.seed_category_records().await?
                };
                self.writer.flush_level(Level::Category).await?;
                self.checkpoint(Level::Category);
                records
            }
            level => self.load_parent_records(level)?,
        };

        let mut level = match self.start_from {
            Level::Category => Level::Year,
            level => level,
        };

        loop {
            if parent_records.is_empty() || self.is_cancelled() {
                break;
            }

            let nodes = self.derive_child_nodes(level, &parent_records);
            parent_records = self.process_level(level, nodes).await?;
            self.writer.flush_level(level).await?;
            self.checkpoint(level);

            match level.child() {
                Some(next) => level = next,
                None => break,
            }
        }

        // Drain anything still buffered, including after cancellation.
        self.writer.flush_all().await?;
        Ok(())
    }

    /// Synthesizes category records from the configured sport seeds
    /// instead of discovering them off the index page
    async fn seed_category_records(&self) -> Result<Vec<RecordData>> {
        let mut records = Vec::new();
        for sport in &self.config.seeds.sports {
            let url = match sport_url(
                &self.config.site.base_url,
                &self.config.site.index_path,
                sport,
            ) {
                Some(url) => url,
                None => {
                    tracing::warn!(sport, "cannot build sport URL from configured seed");
                    continue;
                }
            };
            records.push(RecordData::Category(CategoryRecord {
                sport: sport.clone(),
                sport_url: url,
                discovered_at: Utc::now(),
            }));
        }

        self.stats
            .record_discovered(Level::Category, records.len() as u64);
        self.writer.queue(Level::Category, records.clone()).await?;
        Ok(records)
    }

    /// Loads persisted parent rows to seed a `--start-from` run
    fn load_parent_records(&self, start: Level) -> Result<Vec<RecordData>> {
        let records: Vec<RecordData> = match start {
            Level::Category => Vec::new(),
            Level::Year => self
                .storage
                .load_categories()?
                .into_iter()
                .map(RecordData::Category)
                .collect(),
            Level::Set => self
                .storage
                .load_years()?
                .into_iter()
                .map(RecordData::Year)
                .collect(),
            Level::Card => self
                .storage
                .load_sets()?
                .into_iter()
                .map(RecordData::Set)
                .collect(),
            Level::GradeRow => self
                .storage
                .load_cards()?
                .into_iter()
                .map(RecordData::Card)
                .collect(),
        };

        if records.is_empty() {
            tracing::warn!(
                level = start.as_str(),
                "no persisted parent rows found; nothing to resume from"
            );
        } else {
            tracing::info!(
                level = start.as_str(),
                parents = records.len(),
                "resuming from persisted parents"
            );
        }
        Ok(records)
    }

    /// Turns parent-level records into child nodes, deduplicated by the
    /// parent record's natural key
    fn derive_child_nodes(&self, level: Level, parents: &[RecordData]) -> Vec<CrawlNode> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();

        for record in parents {
            if !seen.insert(record.natural_key()) {
                continue;
            }

            let url = match record.child_url() {
                Some(url) if !url.is_empty() => Some(url.to_string()),
                _ => self.fallback_url(record),
            };
            let url = match url {
                Some(url) => url,
                None => {
                    tracing::debug!(
                        key = %record.natural_key(),
                        "record yields no child URL; subtree not expanded"
                    );
                    continue;
                }
            };

            nodes.push(CrawlNode::new(level, url, record.child_ancestry()));
        }

        nodes
    }

    /// Rebuilds a child URL from record fields when no href was harvested
    fn fallback_url(&self, record: &RecordData) -> Option<String> {
        match record {
            RecordData::Set(set) => build_set_page_url(
                &self.config.site.base_url,
                &self.config.site.index_path,
                &set.sport,
                &set.year,
                &set.set_title,
            ),
            _ => None,
        }
    }

    /// Processes all nodes of one level under the per-level fan-out bound
    ///
    /// Returns the records extracted across the level, for fan-out into
    /// the next. Failed nodes contribute nothing; only fatal errors
    /// propagate.
    async fn process_level(&self, level: Level, nodes: Vec<CrawlNode>) -> Result<Vec<RecordData>> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        tracing::info!(level = level.as_str(), nodes = nodes.len(), "processing level");

        let semaphore = Arc::new(Semaphore::new(
            self.config.crawler.level_concurrency as usize,
        ));
        let mut tasks: JoinSet<Result<Vec<RecordData>>> = JoinSet::new();

        for node in nodes {
            // Cooperative cancellation point: in-flight nodes finish,
            // no new ones start.
            if self.is_cancelled() {
                break;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| CrawlError::Fatal("level semaphore closed".to_string()))?;

            let fetcher = self.fetcher.clone();
            let cache = self.cache.clone();
            let extractor = self.extractor.clone();
            let writer = self.writer.clone();
            let audit = self.audit.clone();
            let stats = self.stats.clone();

            tasks.spawn(async move {
                let result =
                    process_node(node, fetcher, cache, extractor, writer, audit, stats).await;
                drop(permit);
                result
            });
        }

        let mut records = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let outcome =
                joined.map_err(|e| CrawlError::Fatal(format!("crawl task panicked: {}", e)))?;
            records.extend(outcome?);
        }
        Ok(records)
    }

    fn checkpoint(&self, level: Level) {
        let ctx = AuditContext {
            level: Some(level),
            ..Default::default()
        };
        self.audit.checkpoint("level-complete", &ctx);
    }

    /// Assembles the end-of-run summary from the shared counters
    fn summary(&self) -> RunSummary {
        let per_level = Level::ALL
            .iter()
            .map(|&level| LevelSummary {
                level,
                discovered: self.stats.discovered(level),
                persisted: self.writer.persisted(level),
                failed: self.stats.failed(level),
            })
            .collect();

        RunSummary {
            per_level,
            totals_written: self.writer.totals_written(),
            failed_batches: self.writer.failed_batches(),
            fetched: self.fetcher.fetched(),
            retries: self.fetcher.retries(),
            cache_hit_rate: self.cache.hit_rate(),
            duration: self.started.elapsed(),
            aborted: self.is_cancelled(),
            dry_run: self.dry_run,
        }
    }
}

/// Processes one node: fetch through the cache, extract, queue records
/// and totals
///
/// Fetch and extraction failures are recovered here: the node is marked
/// failed with one audit event carrying its full ancestry, and an empty
/// record set is returned so the subtree is simply not expanded.
async fn process_node(
    node: CrawlNode,
    fetcher: Arc<Fetcher>,
    cache: Arc<CacheManager>,
    extractor: Arc<dyn PageExtractor>,
    writer: Arc<BatchWriter>,
    audit: Arc<dyn AuditSink>,
    stats: Arc<RunStats>,
) -> Result<Vec<RecordData>> {
    let ctx = AuditContext::new(node.level, &node.url).with_ancestry(&node.ancestry);
    let mut state = NodeState::Pending;
    advance(&mut state, NodeState::Fetching, &node);

    let fetched = cache
        .get_or_fetch(&node.url, node.level, || {
            let fetcher = fetcher.clone();
            let url = node.url.clone();
            let level = node.level;
            let ancestry = node.ancestry.clone();
            async move { fetcher.fetch(&url, level, &ancestry).await }
        })
        .await;

    let html = match fetched {
        Ok((html, from_cache)) => {
            if from_cache {
                tracing::debug!(url = %node.url, "served from cache");
            }
            html
        }
        Err(GetOrFetchError::Fetch(err)) => {
            advance(&mut state, NodeState::Failed, &node);
            stats.record_failed(node.level);
            audit.error("node-failed", &ctx, err.kind(), &err.to_string());
            return Ok(Vec::new());
        }
        // An unusable cache store is fatal, like the persistence backend.
        Err(GetOrFetchError::Store(err)) => return Err(CrawlError::Cache(err)),
    };

    let extraction = match extractor.extract(node.level, &html, &node.url, &node.ancestry) {
        Ok(extraction) => {
            advance(&mut state, NodeState::Extracted, &node);
            extraction
        }
        Err(err) => {
            advance(&mut state, NodeState::Failed, &node);
            stats.record_failed(node.level);
            audit.error("node-failed", &ctx, "extract", &err.to_string());
            return Ok(Vec::new());
        }
    };

    stats.record_discovered(node.level, extraction.records.len() as u64);

    if let Some(totals) = extraction.totals {
        writer.queue_totals(totals).await?;
    }
    writer.queue(node.level, extraction.records.clone()).await?;
    advance(&mut state, NodeState::PersistQueued, &node);

    Ok(extraction.records)
}

fn advance(state: &mut NodeState, next: NodeState, node: &CrawlNode) {
    debug_assert!(state.can_advance_to(next));
    tracing::trace!(
        url = %node.url,
        from = state.as_str(),
        to = next.as_str(),
        "node transition"
    );
    *state = next;
}
