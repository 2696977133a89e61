//! Page extraction: typed records out of fetched HTML
//!
//! The orchestrator consumes extraction through the `PageExtractor` trait
//! and never looks at HTML itself. The shipped implementation walks the
//! pop-report tables; a page yields the records of its level plus at most
//! one TOTALS rollup. Extraction is pure and defensive: malformed rows are
//! skipped and missing optional fields become None rather than errors.

mod tables;

pub use tables::TableExtractor;

use crate::model::{Ancestry, Level, RecordData, TotalsAggregate};
use thiserror::Error;

/// Errors for pages the extractor cannot work with at all
///
/// Anything less than this (odd rows, missing cells) degrades to skipped
/// rows or None fields instead of an error.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no data table found on {level} page")]
    NoDataTable { level: Level },

    #[error("missing ancestry context for {level} extraction")]
    MissingContext { level: Level },
}

/// Result of extracting one page
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Ordinary records of the page's level
    pub records: Vec<RecordData>,

    /// Rollup from a TOTALS sentinel row, if the page had one
    pub totals: Option<TotalsAggregate>,
}

/// Turns a fetched page into a typed record set
///
/// Implementations must be pure (no I/O) and must never panic on
/// malformed input.
pub trait PageExtractor: Send + Sync {
    fn extract(
        &self,
        level: Level,
        html: &str,
        page_url: &str,
        ancestry: &Ancestry,
    ) -> Result<Extraction, ExtractError>;
}
