//! Bulk idempotent persistence layer
//!
//! One natural-key-unique table per hierarchy level plus the totals rollup
//! store. Writes go through the `BatchWriter`, which buffers records per
//! level and flushes them as single-transaction upserts.

mod batch;
pub mod schema;
mod sqlite;
mod traits;

pub use batch::BatchWriter;
pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult, UpsertCounts};

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Cancelled by signal or timeout; partial results were committed
    Aborted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "aborted" => Some(Self::Aborted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
