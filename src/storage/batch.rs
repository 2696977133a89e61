//! Batched persistence with retry and failure isolation
//!
//! Extracted records buffer per level and flush as single-transaction
//! upserts when the batch size threshold is reached, or when a level's
//! traversal completes. Transient database errors retry the whole batch;
//! a non-retryable error fails only that batch; a fatal backend error is
//! the one storage condition that aborts the run.

use crate::audit::{AuditContext, AuditSink};
use crate::config::StorageConfig;
use crate::fetch::RetryPolicy;
use crate::model::{Level, RecordData, TotalsAggregate};
use crate::storage::{Storage, StorageResult, UpsertCounts};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Buffers records per level and flushes them as idempotent upsert batches
pub struct BatchWriter {
    storage: Arc<dyn Storage>,
    audit: Arc<dyn AuditSink>,
    batch_size: usize,
    dry_run: bool,
    retry: RetryPolicy,
    /// Bounds simultaneous flush transactions
    flush_permits: Semaphore,
    buffers: [Mutex<Vec<RecordData>>; 5],
    totals: Mutex<Vec<TotalsAggregate>>,
    persisted: [AtomicU64; 5],
    inserted: AtomicU64,
    updated: AtomicU64,
    skipped: [AtomicU64; 5],
    totals_written: AtomicU64,
    failed_batches: AtomicU64,
}

impl BatchWriter {
    pub fn new(
        storage: Arc<dyn Storage>,
        audit: Arc<dyn AuditSink>,
        config: &StorageConfig,
        dry_run: bool,
    ) -> Self {
        Self {
            storage,
            audit,
            batch_size: config.batch_size,
            dry_run,
            retry: RetryPolicy::new(config.flush_retries, Duration::from_millis(100)),
            flush_permits: Semaphore::new(config.max_concurrent_flushes as usize),
            buffers: Default::default(),
            totals: Mutex::new(Vec::new()),
            persisted: Default::default(),
            inserted: AtomicU64::new(0),
            updated: AtomicU64::new(0),
            skipped: Default::default(),
            totals_written: AtomicU64::new(0),
            failed_batches: AtomicU64::new(0),
        }
    }

    /// Queues extracted records, flushing when the buffer reaches the
    /// batch size threshold
    ///
    /// Only a fatal backend error surfaces; everything else is recovered
    /// at the batch boundary.
    pub async fn queue(&self, level: Level, mut records: Vec<RecordData>) -> StorageResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        if self.dry_run {
            self.skipped[level.index()].fetch_add(records.len() as u64, Ordering::Relaxed);
            return Ok(());
        }

        let batch = {
            let mut buffer = self.buffers[level.index()].lock().unwrap();
            buffer.append(&mut records);
            if buffer.len() >= self.batch_size {
                std::mem::take(&mut *buffer)
            } else {
                Vec::new()
            }
        };

        if batch.is_empty() {
            return Ok(());
        }
        self.flush_batch(level, batch).await
    }

    /// Queues a totals rollup for the separate rollup store
    pub async fn queue_totals(&self, aggregate: TotalsAggregate) -> StorageResult<()> {
        if self.dry_run {
            return Ok(());
        }

        let batch = {
            let mut buffer = self.totals.lock().unwrap();
            buffer.push(aggregate);
            if buffer.len() >= self.batch_size {
                std::mem::take(&mut *buffer)
            } else {
                Vec::new()
            }
        };

        if batch.is_empty() {
            return Ok(());
        }
        self.flush_totals_batch(batch).await
    }

    /// Drains whatever is buffered for a level, plus any pending totals
    ///
    /// Called when the level's traversal completes.
    pub async fn flush_level(&self, level: Level) -> StorageResult<()> {
        let batch = std::mem::take(&mut *self.buffers[level.index()].lock().unwrap());
        if !batch.is_empty() {
            self.flush_batch(level, batch).await?;
        }

        let totals = std::mem::take(&mut *self.totals.lock().unwrap());
        if !totals.is_empty() {
            self.flush_totals_batch(totals).await?;
        }
        Ok(())
    }

    /// Drains every buffer, used on cancellation so committed work is not
    /// left stranded in memory
    pub async fn flush_all(&self) -> StorageResult<()> {
        for level in Level::ALL {
            self.flush_level(level).await?;
        }
        Ok(())
    }

    /// Flushes one record batch with retry on transient database errors
    async fn flush_batch(&self, level: Level, batch: Vec<RecordData>) -> StorageResult<()> {
        let _permit = self
            .flush_permits
            .acquire()
            .await
            .expect("flush semaphore closed");

        let ctx = AuditContext {
            level: Some(level),
            ..Default::default()
        };
        let size = batch.len();
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            match self.run_upsert(level, &batch) {
                Ok(counts) => {
                    self.persisted[level.index()].fetch_add(counts.total(), Ordering::Relaxed);
                    self.inserted.fetch_add(counts.inserted, Ordering::Relaxed);
                    self.updated.fetch_add(counts.updated, Ordering::Relaxed);
                    self.audit.operation(
                        "persist-batch",
                        &ctx,
                        started.elapsed(),
                        &format!("ok:{}", size),
                    );
                    return Ok(());
                }
                Err(err) if err.is_transient() && attempt < self.retry.max_retries() => {
                    tracing::debug!(
                        level = level.as_str(),
                        attempt,
                        error = %err,
                        "transient flush failure, retrying batch"
                    );
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                    attempt += 1;
                }
                Err(err) => {
                    self.failed_batches.fetch_add(1, Ordering::Relaxed);
                    self.audit.error("persist-batch", &ctx, err.kind(), &err.to_string());
                    if err.is_fatal() {
                        return Err(err);
                    }
                    // The offending batch is lost; the run continues.
                    return Ok(());
                }
            }
        }
    }

    async fn flush_totals_batch(&self, batch: Vec<TotalsAggregate>) -> StorageResult<()> {
        let _permit = self
            .flush_permits
            .acquire()
            .await
            .expect("flush semaphore closed");

        let ctx = AuditContext::default();
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            match self.storage.upsert_totals(&batch) {
                Ok(written) => {
                    self.totals_written.fetch_add(written as u64, Ordering::Relaxed);
                    self.audit.operation(
                        "persist-totals",
                        &ctx,
                        started.elapsed(),
                        &format!("ok:{}", written),
                    );
                    return Ok(());
                }
                Err(err) if err.is_transient() && attempt < self.retry.max_retries() => {
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                    attempt += 1;
                }
                Err(err) => {
                    self.failed_batches.fetch_add(1, Ordering::Relaxed);
                    self.audit.error("persist-totals", &ctx, err.kind(), &err.to_string());
                    if err.is_fatal() {
                        return Err(err);
                    }
                    return Ok(());
                }
            }
        }
    }

    fn run_upsert(&self, level: Level, batch: &[RecordData]) -> StorageResult<UpsertCounts> {
        match level {
            Level::Category => {
                let records: Vec<_> = batch
                    .iter()
                    .filter_map(|r| match r {
                        RecordData::Category(c) => Some(c.clone()),
                        _ => None,
                    })
                    .collect();
                self.storage.upsert_categories(&records)
            }
            Level::Year => {
                let records: Vec<_> = batch
                    .iter()
                    .filter_map(|r| match r {
                        RecordData::Year(y) => Some(y.clone()),
                        _ => None,
                    })
                    .collect();
                self.storage.upsert_years(&records)
            }
            Level::Set => {
                let records: Vec<_> = batch
                    .iter()
                    .filter_map(|r| match r {
                        RecordData::Set(s) => Some(s.clone()),
                        _ => None,
                    })
                    .collect();
                self.storage.upsert_sets(&records)
            }
            Level::Card => {
                let records: Vec<_> = batch
                    .iter()
                    .filter_map(|r| match r {
                        RecordData::Card(c) => Some(c.clone()),
                        _ => None,
                    })
                    .collect();
                self.storage.upsert_cards(&records)
            }
            Level::GradeRow => {
                let records: Vec<_> = batch
                    .iter()
                    .filter_map(|r| match r {
                        RecordData::GradeRow(g) => Some(g.clone()),
                        _ => None,
                    })
                    .collect();
                self.storage.upsert_grade_rows(&records)
            }
        }
    }

    /// Records persisted (inserted or updated) at a level
    pub fn persisted(&self, level: Level) -> u64 {
        self.persisted[level.index()].load(Ordering::Relaxed)
    }

    /// Records skipped by a dry run at a level
    pub fn skipped(&self, level: Level) -> u64 {
        self.skipped[level.index()].load(Ordering::Relaxed)
    }

    pub fn inserted(&self) -> u64 {
        self.inserted.load(Ordering::Relaxed)
    }

    pub fn updated(&self) -> u64 {
        self.updated.load(Ordering::Relaxed)
    }

    pub fn totals_written(&self) -> u64 {
        self.totals_written.load(Ordering::Relaxed)
    }

    pub fn failed_batches(&self) -> u64 {
        self.failed_batches.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::RecordingSink;
    use crate::model::{CategoryRecord, MetricValue, Metrics, TotalsScope, YearRecord};
    use crate::storage::{RunStatus, SqliteStorage, StorageError};
    use chrono::Utc;

    fn writer(batch_size: usize, dry_run: bool) -> (BatchWriter, Arc<SqliteStorage>) {
        let storage = Arc::new(SqliteStorage::new_in_memory().unwrap());
        let config = StorageConfig {
            batch_size,
            ..Default::default()
        };
        let writer = BatchWriter::new(
            storage.clone(),
            Arc::new(RecordingSink::new()),
            &config,
            dry_run,
        );
        (writer, storage)
    }

    fn year_record(year: &str) -> RecordData {
        RecordData::Year(YearRecord {
            sport: "Baseball".to_string(),
            year: year.to_string(),
            year_url: format!("https://example.com/Baseball/{}", year),
            discovered_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_flush_at_threshold() {
        let (writer, storage) = writer(2, false);

        writer.queue(Level::Year, vec![year_record("1989")]).await.unwrap();
        assert_eq!(storage.count_records(Level::Year).unwrap(), 0);

        writer.queue(Level::Year, vec![year_record("1990")]).await.unwrap();
        assert_eq!(storage.count_records(Level::Year).unwrap(), 2);
        assert_eq!(writer.persisted(Level::Year), 2);
    }

    #[tokio::test]
    async fn test_flush_level_drains_remainder() {
        let (writer, storage) = writer(100, false);

        writer
            .queue(Level::Year, vec![year_record("1989"), year_record("1990")])
            .await
            .unwrap();
        assert_eq!(storage.count_records(Level::Year).unwrap(), 0);

        writer.flush_level(Level::Year).await.unwrap();
        assert_eq!(storage.count_records(Level::Year).unwrap(), 2);
        assert_eq!(writer.inserted(), 2);
        assert_eq!(writer.updated(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_skips_writes() {
        let (writer, storage) = writer(1, true);

        writer.queue(Level::Year, vec![year_record("1989")]).await.unwrap();
        writer.flush_all().await.unwrap();

        assert_eq!(storage.count_records(Level::Year).unwrap(), 0);
        assert_eq!(writer.skipped(Level::Year), 1);
        assert_eq!(writer.persisted(Level::Year), 0);
    }

    #[tokio::test]
    async fn test_totals_flush_on_level_completion() {
        let (writer, storage) = writer(100, false);
        let mut metrics = Metrics::new();
        metrics.insert("total_graded".to_string(), MetricValue::Int(42));

        writer
            .queue_totals(TotalsAggregate {
                scope: TotalsScope::Set,
                sport: Some("Baseball".to_string()),
                year: Some("1989".to_string()),
                set_title: None,
                card_name: None,
                metrics,
                computed_at: Utc::now(),
            })
            .await
            .unwrap();
        assert_eq!(storage.count_totals().unwrap(), 0);

        writer.flush_level(Level::Set).await.unwrap();
        assert_eq!(storage.count_totals().unwrap(), 1);
        assert_eq!(writer.totals_written(), 1);
    }

    /// Storage stub whose upserts always hit a constraint violation
    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn create_run(&self, _: &str) -> StorageResult<i64> {
            Ok(1)
        }
        fn complete_run(&self, _: i64, _: RunStatus) -> StorageResult<()> {
            Ok(())
        }
        fn upsert_categories(&self, _: &[CategoryRecord]) -> StorageResult<UpsertCounts> {
            Err(constraint_error())
        }
        fn upsert_years(&self, _: &[YearRecord]) -> StorageResult<UpsertCounts> {
            Err(constraint_error())
        }
        fn upsert_sets(&self, _: &[crate::model::SetRecord]) -> StorageResult<UpsertCounts> {
            Err(constraint_error())
        }
        fn upsert_cards(&self, _: &[crate::model::CardRecord]) -> StorageResult<UpsertCounts> {
            Err(constraint_error())
        }
        fn upsert_grade_rows(
            &self,
            _: &[crate::model::GradeRowRecord],
        ) -> StorageResult<UpsertCounts> {
            Err(constraint_error())
        }
        fn upsert_totals(&self, _: &[TotalsAggregate]) -> StorageResult<usize> {
            Err(constraint_error())
        }
        fn count_records(&self, _: Level) -> StorageResult<u64> {
            Ok(0)
        }
        fn count_totals(&self) -> StorageResult<u64> {
            Ok(0)
        }
        fn load_categories(&self) -> StorageResult<Vec<CategoryRecord>> {
            Ok(Vec::new())
        }
        fn load_years(&self) -> StorageResult<Vec<YearRecord>> {
            Ok(Vec::new())
        }
        fn load_sets(&self) -> StorageResult<Vec<crate::model::SetRecord>> {
            Ok(Vec::new())
        }
        fn load_cards(&self) -> StorageResult<Vec<crate::model::CardRecord>> {
            Ok(Vec::new())
        }
    }

    fn constraint_error() -> StorageError {
        StorageError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("UNIQUE constraint failed".to_string()),
        ))
    }

    #[tokio::test]
    async fn test_non_retryable_batch_error_is_contained() {
        let sink = Arc::new(RecordingSink::new());
        let writer = BatchWriter::new(
            Arc::new(BrokenStorage),
            sink.clone(),
            &StorageConfig {
                batch_size: 1,
                ..Default::default()
            },
            false,
        );

        // The failing batch must not surface as an error.
        writer.queue(Level::Year, vec![year_record("1989")]).await.unwrap();

        assert_eq!(writer.failed_batches(), 1);
        assert_eq!(writer.persisted(Level::Year), 0);
        assert_eq!(sink.count_errors("persist-batch"), 1);
    }
}
