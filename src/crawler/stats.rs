//! Run counters and the end-of-run summary
//!
//! `RunStats` is mutated concurrently by node tasks; the `RunSummary` is
//! assembled once at run end and is always produced, even when branches
//! failed or the run was cancelled.

use crate::model::Level;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Process-scoped counters shared by all node tasks in a run
#[derive(Default)]
pub struct RunStats {
    discovered: [AtomicU64; 5],
    failed: [AtomicU64; 5],
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_discovered(&self, level: Level, count: u64) {
        self.discovered[level.index()].fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_failed(&self, level: Level) {
        self.failed[level.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn discovered(&self, level: Level) -> u64 {
        self.discovered[level.index()].load(Ordering::Relaxed)
    }

    pub fn failed(&self, level: Level) -> u64 {
        self.failed[level.index()].load(Ordering::Relaxed)
    }
}

/// Per-level slice of the run summary
#[derive(Debug, Clone, Copy)]
pub struct LevelSummary {
    pub level: Level,
    pub discovered: u64,
    pub persisted: u64,
    pub failed: u64,
}

/// End-of-run report
///
/// Produced for every non-fatal outcome, including partial completion
/// after cancellation.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub per_level: Vec<LevelSummary>,
    pub totals_written: u64,
    pub failed_batches: u64,
    pub fetched: u64,
    pub retries: u64,
    pub cache_hit_rate: f64,
    pub duration: Duration,
    pub aborted: bool,
    pub dry_run: bool,
}

impl RunSummary {
    /// Node failures across all levels
    pub fn total_failed(&self) -> u64 {
        self.per_level.iter().map(|l| l.failed).sum()
    }

    pub fn total_persisted(&self) -> u64 {
        self.per_level.iter().map(|l| l.persisted).sum()
    }

    /// Prints the summary in the CLI's plain format
    pub fn print(&self) {
        println!("=== Crawl Summary ===\n");

        if self.dry_run {
            println!("Dry run: no persistence writes were made\n");
        }

        println!(
            "{:<12} {:>12} {:>12} {:>8}",
            "Level", "Discovered", "Persisted", "Failed"
        );
        for level in &self.per_level {
            println!(
                "{:<12} {:>12} {:>12} {:>8}",
                level.level.as_str(),
                level.discovered,
                level.persisted,
                level.failed
            );
        }

        println!();
        println!("Totals rollups written: {}", self.totals_written);
        if self.failed_batches > 0 {
            println!("Failed persistence batches: {}", self.failed_batches);
        }
        println!("Pages fetched: {}", self.fetched);
        if self.retries > 0 {
            println!("Fetch retries: {}", self.retries);
        }
        println!("Cache hit rate: {:.1}%", self.cache_hit_rate * 100.0);
        println!("Duration: {:.1}s", self.duration.as_secs_f64());

        if self.aborted {
            println!("\nRun was cancelled; results above are partial.");
        }
        if self.total_failed() > 0 {
            println!(
                "\n{} node(s) failed; re-run with --start-from to retry the gaps.",
                self.total_failed()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate_per_level() {
        let stats = RunStats::new();
        stats.record_discovered(Level::Set, 3);
        stats.record_discovered(Level::Set, 2);
        stats.record_failed(Level::Card);

        assert_eq!(stats.discovered(Level::Set), 5);
        assert_eq!(stats.discovered(Level::Card), 0);
        assert_eq!(stats.failed(Level::Card), 1);
        assert_eq!(stats.failed(Level::Set), 0);
    }

    #[test]
    fn test_summary_totals() {
        let summary = RunSummary {
            per_level: vec![
                LevelSummary {
                    level: Level::Category,
                    discovered: 1,
                    persisted: 1,
                    failed: 0,
                },
                LevelSummary {
                    level: Level::Year,
                    discovered: 4,
                    persisted: 3,
                    failed: 1,
                },
            ],
            totals_written: 2,
            failed_batches: 0,
            fetched: 5,
            retries: 0,
            cache_hit_rate: 0.0,
            duration: Duration::from_secs(1),
            aborted: false,
            dry_run: false,
        };

        assert_eq!(summary.total_failed(), 1);
        assert_eq!(summary.total_persisted(), 4);
    }
}
