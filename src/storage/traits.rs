//! Storage trait and error types
//!
//! The bulk persistence layer is the only component that issues database
//! writes. Everything above it talks to this trait, so tests and the batch
//! writer never care which backend is underneath.

use crate::model::{
    CardRecord, CategoryRecord, GradeRowRecord, Level, SetRecord, TotalsAggregate, YearRecord,
};
use crate::storage::RunStatus;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend itself is unusable (unopenable file, corrupt database).
    /// The only storage error that aborts a run.
    #[error("Storage backend unusable: {0}")]
    Backend(String),
}

impl StorageError {
    /// True for contention errors a batch retry can clear
    pub fn is_transient(&self) -> bool {
        use rusqlite::ffi::ErrorCode;
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// True when the backend itself is gone, not just one batch
    pub fn is_fatal(&self) -> bool {
        use rusqlite::ffi::ErrorCode;
        match self {
            Self::Backend(_) => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::DiskFull
                    | ErrorCode::SystemIoFailure
            ),
            _ => false,
        }
    }

    /// Short classification label for audit events
    pub fn kind(&self) -> &'static str {
        if self.is_fatal() {
            "fatal"
        } else if self.is_transient() {
            "transient"
        } else {
            "non-retryable"
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of one upsert batch
///
/// Rows land in exactly one bucket: inserted when the natural key was new,
/// updated when it already existed and the non-key columns were refreshed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertCounts {
    pub inserted: u64,
    pub updated: u64,
}

impl UpsertCounts {
    pub fn total(&self) -> u64 {
        self.inserted + self.updated
    }

    pub fn merge(&mut self, other: UpsertCounts) {
        self.inserted += other.inserted;
        self.updated += other.updated;
    }
}

/// Trait for storage backend implementations
///
/// Each upsert call is one transaction: either every row in the batch lands
/// or none does. Implementations must be safe to share across tasks.
pub trait Storage: Send + Sync {
    // ===== Run bookkeeping =====

    /// Creates a new crawl run, returning its ID
    fn create_run(&self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run finished with the given status
    fn complete_run(&self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Bulk upserts, one transaction per call =====

    fn upsert_categories(&self, records: &[CategoryRecord]) -> StorageResult<UpsertCounts>;

    fn upsert_years(&self, records: &[YearRecord]) -> StorageResult<UpsertCounts>;

    fn upsert_sets(&self, records: &[SetRecord]) -> StorageResult<UpsertCounts>;

    fn upsert_cards(&self, records: &[CardRecord]) -> StorageResult<UpsertCounts>;

    fn upsert_grade_rows(&self, records: &[GradeRowRecord]) -> StorageResult<UpsertCounts>;

    /// Upserts totals rollups keyed by scope, returning rows written
    fn upsert_totals(&self, aggregates: &[TotalsAggregate]) -> StorageResult<usize>;

    // ===== Reads for resumption and reporting =====

    /// Row count of the level's table
    fn count_records(&self, level: Level) -> StorageResult<u64>;

    /// Row count of the totals rollup table
    fn count_totals(&self) -> StorageResult<u64>;

    /// All persisted categories, used to seed a `--start-from year` run
    fn load_categories(&self) -> StorageResult<Vec<CategoryRecord>>;

    /// All persisted years, used to seed a `--start-from set` run
    fn load_years(&self) -> StorageResult<Vec<YearRecord>>;

    /// All persisted sets, used to seed a `--start-from card` run
    fn load_sets(&self) -> StorageResult<Vec<SetRecord>>;

    /// All persisted cards, used to seed a `--start-from grade-row` run
    fn load_cards(&self) -> StorageResult<Vec<CardRecord>>;
}
