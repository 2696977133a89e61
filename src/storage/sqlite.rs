//! SQLite storage implementation
//!
//! Each upsert batch runs as one transaction. Conflict resolution targets
//! the level's natural key: insert when the key is new, refresh every
//! non-key column when it already exists. Inserted-vs-updated counts come
//! from an existence probe inside the same transaction.

use crate::model::{
    CardRecord, CategoryRecord, GradeRowRecord, Level, Metrics, SetRecord, TotalsAggregate,
    YearRecord,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult, UpsertCounts};
use crate::storage::RunStatus;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// SQLite storage backend
///
/// The connection is mutex-guarded so one handle can be shared across
/// tasks; SQLite serializes writers underneath anyway.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens or creates a database at the given path
    ///
    /// An unopenable file is a fatal `Backend` error: without the
    /// persistence backend there is no run.
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| StorageError::Backend(format!("cannot open {}: {}", path.display(), e)))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database, used by tests
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn metrics_json(metrics: &Metrics) -> StorageResult<Option<String>> {
    if metrics.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(metrics)
        .map(Some)
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

fn urls_json(urls: &[String]) -> StorageResult<String> {
    serde_json::to_string(urls).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn parse_urls(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

fn parse_metrics(json: Option<String>) -> Metrics {
    json.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn parse_timestamp(text: &str) -> DateTime<Utc> {
    text.parse().unwrap_or_else(|_| Utc::now())
}

impl Storage for SqliteStorage {
    // ===== Run bookkeeping =====

    fn create_run(&self, config_hash: &str) -> StorageResult<i64> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn complete_run(&self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        Ok(())
    }

    // ===== Bulk upserts =====

    fn upsert_categories(&self, records: &[CategoryRecord]) -> StorageResult<UpsertCounts> {
        if records.is_empty() {
            return Ok(UpsertCounts::default());
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut counts = UpsertCounts::default();
        {
            let mut probe = tx.prepare("SELECT 1 FROM categories WHERE sport = ?1")?;
            let mut upsert = tx.prepare(
                "INSERT INTO categories (sport, sport_url, discovered_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(sport) DO UPDATE SET
                     sport_url = excluded.sport_url,
                     discovered_at = excluded.discovered_at",
            )?;
            for record in records {
                let existed = probe.exists(params![record.sport])?;
                upsert.execute(params![
                    record.sport,
                    record.sport_url,
                    record.discovered_at.to_rfc3339(),
                ])?;
                if existed {
                    counts.updated += 1;
                } else {
                    counts.inserted += 1;
                }
            }
        }
        tx.commit()?;
        Ok(counts)
    }

    fn upsert_years(&self, records: &[YearRecord]) -> StorageResult<UpsertCounts> {
        if records.is_empty() {
            return Ok(UpsertCounts::default());
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut counts = UpsertCounts::default();
        {
            let mut probe =
                tx.prepare("SELECT 1 FROM years_index WHERE sport = ?1 AND year = ?2")?;
            let mut upsert = tx.prepare(
                "INSERT INTO years_index (sport, year, year_url, discovered_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(sport, year) DO UPDATE SET
                     year_url = excluded.year_url,
                     discovered_at = excluded.discovered_at",
            )?;
            for record in records {
                let existed = probe.exists(params![record.sport, record.year])?;
                upsert.execute(params![
                    record.sport,
                    record.year,
                    record.year_url,
                    record.discovered_at.to_rfc3339(),
                ])?;
                if existed {
                    counts.updated += 1;
                } else {
                    counts.inserted += 1;
                }
            }
        }
        tx.commit()?;
        Ok(counts)
    }

    fn upsert_sets(&self, records: &[SetRecord]) -> StorageResult<UpsertCounts> {
        if records.is_empty() {
            return Ok(UpsertCounts::default());
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut counts = UpsertCounts::default();
        {
            let mut probe = tx.prepare(
                "SELECT 1 FROM sets_per_year WHERE sport = ?1 AND year = ?2 AND set_title = ?3",
            )?;
            let mut upsert = tx.prepare(
                "INSERT INTO sets_per_year
                     (sport, year, year_url, set_title, set_urls, metrics, discovered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(sport, year, set_title) DO UPDATE SET
                     year_url = excluded.year_url,
                     set_urls = excluded.set_urls,
                     metrics = excluded.metrics,
                     discovered_at = excluded.discovered_at",
            )?;
            for record in records {
                let existed =
                    probe.exists(params![record.sport, record.year, record.set_title])?;
                upsert.execute(params![
                    record.sport,
                    record.year,
                    record.year_url,
                    record.set_title,
                    urls_json(&record.set_urls)?,
                    metrics_json(&record.metrics)?,
                    record.discovered_at.to_rfc3339(),
                ])?;
                if existed {
                    counts.updated += 1;
                } else {
                    counts.inserted += 1;
                }
            }
        }
        tx.commit()?;
        Ok(counts)
    }

    fn upsert_cards(&self, records: &[CardRecord]) -> StorageResult<UpsertCounts> {
        if records.is_empty() {
            return Ok(UpsertCounts::default());
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut counts = UpsertCounts::default();
        {
            let mut probe = tx.prepare(
                "SELECT 1 FROM cards_per_set
                 WHERE sport = ?1 AND year = ?2 AND set_title = ?3 AND card_name = ?4",
            )?;
            let mut upsert = tx.prepare(
                "INSERT INTO cards_per_set
                     (sport, year, set_title, set_url, card_name, card_urls, metrics, discovered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(sport, year, set_title, card_name) DO UPDATE SET
                     set_url = excluded.set_url,
                     card_urls = excluded.card_urls,
                     metrics = excluded.metrics,
                     discovered_at = excluded.discovered_at",
            )?;
            for record in records {
                let existed = probe.exists(params![
                    record.sport,
                    record.year,
                    record.set_title,
                    record.card_name
                ])?;
                upsert.execute(params![
                    record.sport,
                    record.year,
                    record.set_title,
                    record.set_url,
                    record.card_name,
                    urls_json(&record.card_urls)?,
                    metrics_json(&record.metrics)?,
                    record.discovered_at.to_rfc3339(),
                ])?;
                if existed {
                    counts.updated += 1;
                } else {
                    counts.inserted += 1;
                }
            }
        }
        tx.commit()?;
        Ok(counts)
    }

    fn upsert_grade_rows(&self, records: &[GradeRowRecord]) -> StorageResult<UpsertCounts> {
        if records.is_empty() {
            return Ok(UpsertCounts::default());
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut counts = UpsertCounts::default();
        {
            let mut probe = tx.prepare(
                "SELECT 1 FROM card_grade_rows
                 WHERE sport = ?1 AND year = ?2 AND set_title = ?3
                   AND card_name = ?4 AND cert_number = ?5",
            )?;
            let mut upsert = tx.prepare(
                "INSERT INTO card_grade_rows
                     (sport, year, set_title, card_name, card_url, cert_number,
                      rank, tag_grade, report_url, rank_by_grade, chronology,
                      chron_by_grade, completed_date_raw, completed_date_iso, discovered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                 ON CONFLICT(sport, year, set_title, card_name, cert_number) DO UPDATE SET
                     card_url = excluded.card_url,
                     rank = excluded.rank,
                     tag_grade = excluded.tag_grade,
                     report_url = excluded.report_url,
                     rank_by_grade = excluded.rank_by_grade,
                     chronology = excluded.chronology,
                     chron_by_grade = excluded.chron_by_grade,
                     completed_date_raw = excluded.completed_date_raw,
                     completed_date_iso = excluded.completed_date_iso,
                     discovered_at = excluded.discovered_at",
            )?;
            for record in records {
                let existed = probe.exists(params![
                    record.sport,
                    record.year,
                    record.set_title,
                    record.card_name,
                    record.cert_number
                ])?;
                upsert.execute(params![
                    record.sport,
                    record.year,
                    record.set_title,
                    record.card_name,
                    record.card_url,
                    record.cert_number,
                    record.rank,
                    record.tag_grade,
                    record.report_url,
                    record.rank_by_grade,
                    record.chronology,
                    record.chron_by_grade,
                    record.completed_date_raw,
                    record.completed_date_iso.map(|d| d.to_rfc3339()),
                    record.discovered_at.to_rfc3339(),
                ])?;
                if existed {
                    counts.updated += 1;
                } else {
                    counts.inserted += 1;
                }
            }
        }
        tx.commit()?;
        Ok(counts)
    }

    fn upsert_totals(&self, aggregates: &[TotalsAggregate]) -> StorageResult<usize> {
        if aggregates.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut upsert = tx.prepare(
                "INSERT INTO totals_rollups
                     (scope_key, scope, sport, year, set_title, card_name, metrics, computed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(scope_key) DO UPDATE SET
                     metrics = excluded.metrics,
                     computed_at = excluded.computed_at",
            )?;
            for aggregate in aggregates {
                let metrics = serde_json::to_string(&aggregate.metrics)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                upsert.execute(params![
                    aggregate.scope_key(),
                    aggregate.scope.as_str(),
                    aggregate.sport,
                    aggregate.year,
                    aggregate.set_title,
                    aggregate.card_name,
                    metrics,
                    aggregate.computed_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(aggregates.len())
    }

    // ===== Reads =====

    fn count_records(&self, level: Level) -> StorageResult<u64> {
        let table = match level {
            Level::Category => "categories",
            Level::Year => "years_index",
            Level::Set => "sets_per_year",
            Level::Card => "cards_per_set",
            Level::GradeRow => "card_grade_rows",
        };
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }

    fn count_totals(&self) -> StorageResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM totals_rollups", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn load_categories(&self) -> StorageResult<Vec<CategoryRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT sport, sport_url, discovered_at FROM categories ORDER BY sport")?;
        let records = stmt
            .query_map([], |row| {
                Ok(CategoryRecord {
                    sport: row.get(0)?,
                    sport_url: row.get(1)?,
                    discovered_at: parse_timestamp(&row.get::<_, String>(2)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn load_years(&self) -> StorageResult<Vec<YearRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT sport, year, year_url, discovered_at FROM years_index ORDER BY sport, year",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(YearRecord {
                    sport: row.get(0)?,
                    year: row.get(1)?,
                    year_url: row.get(2)?,
                    discovered_at: parse_timestamp(&row.get::<_, String>(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn load_sets(&self) -> StorageResult<Vec<SetRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT sport, year, year_url, set_title, set_urls, metrics, discovered_at
             FROM sets_per_year ORDER BY sport, year, set_title",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(SetRecord {
                    sport: row.get(0)?,
                    year: row.get(1)?,
                    year_url: row.get(2)?,
                    set_title: row.get(3)?,
                    set_urls: parse_urls(&row.get::<_, String>(4)?),
                    metrics: parse_metrics(row.get(5)?),
                    discovered_at: parse_timestamp(&row.get::<_, String>(6)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn load_cards(&self) -> StorageResult<Vec<CardRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT sport, year, set_title, set_url, card_name, card_urls, metrics, discovered_at
             FROM cards_per_set ORDER BY sport, year, set_title, card_name",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(CardRecord {
                    sport: row.get(0)?,
                    year: row.get(1)?,
                    set_title: row.get(2)?,
                    set_url: row.get(3)?,
                    card_name: row.get(4)?,
                    card_urls: parse_urls(&row.get::<_, String>(5)?),
                    metrics: parse_metrics(row.get(6)?),
                    discovered_at: parse_timestamp(&row.get::<_, String>(7)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
