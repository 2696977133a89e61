//! Database schema definitions
//!
//! One table per hierarchy level with a natural-key UNIQUE constraint,
//! plus the totals rollup store and run bookkeeping. URL arrays and
//! metrics maps are stored as JSON text.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Sport categories from the pop-report index
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sport TEXT NOT NULL UNIQUE,
    sport_url TEXT NOT NULL,
    discovered_at TEXT NOT NULL
);

-- Years discovered per sport
CREATE TABLE IF NOT EXISTS years_index (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sport TEXT NOT NULL,
    year TEXT NOT NULL,
    year_url TEXT NOT NULL,
    discovered_at TEXT NOT NULL,
    UNIQUE(sport, year)
);

CREATE INDEX IF NOT EXISTS idx_years_sport ON years_index(sport);

-- Sets discovered per (sport, year)
CREATE TABLE IF NOT EXISTS sets_per_year (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sport TEXT NOT NULL,
    year TEXT NOT NULL,
    year_url TEXT NOT NULL,
    set_title TEXT NOT NULL,
    set_urls TEXT NOT NULL,
    metrics TEXT,
    discovered_at TEXT NOT NULL,
    UNIQUE(sport, year, set_title)
);

CREATE INDEX IF NOT EXISTS idx_sets_sport_year ON sets_per_year(sport, year);

-- Cards discovered per (sport, year, set)
CREATE TABLE IF NOT EXISTS cards_per_set (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sport TEXT NOT NULL,
    year TEXT NOT NULL,
    set_title TEXT NOT NULL,
    set_url TEXT NOT NULL,
    card_name TEXT NOT NULL,
    card_urls TEXT NOT NULL,
    metrics TEXT,
    discovered_at TEXT NOT NULL,
    UNIQUE(sport, year, set_title, card_name)
);

CREATE INDEX IF NOT EXISTS idx_cards_sport_year_set ON cards_per_set(sport, year, set_title);

-- Individual grade rows per card; cert number completes the key
CREATE TABLE IF NOT EXISTS card_grade_rows (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sport TEXT NOT NULL,
    year TEXT NOT NULL,
    set_title TEXT NOT NULL,
    card_name TEXT NOT NULL,
    card_url TEXT NOT NULL,
    cert_number TEXT NOT NULL,
    rank TEXT,
    tag_grade TEXT,
    report_url TEXT,
    rank_by_grade TEXT,
    chronology TEXT,
    chron_by_grade TEXT,
    completed_date_raw TEXT,
    completed_date_iso TEXT,
    discovered_at TEXT NOT NULL,
    UNIQUE(sport, year, set_title, card_name, cert_number)
);

CREATE INDEX IF NOT EXISTS idx_grade_rows_card ON card_grade_rows(sport, year, set_title, card_name);

-- TOTALS rollups, never mixed with ordinary records.
-- scope_key is the composed conflict target: SQLite treats NULLs in a
-- UNIQUE constraint as distinct, so the nullable scope columns cannot
-- serve as the upsert key themselves.
CREATE TABLE IF NOT EXISTS totals_rollups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scope_key TEXT NOT NULL UNIQUE,
    scope TEXT NOT NULL,
    sport TEXT,
    year TEXT,
    set_title TEXT,
    card_name TEXT,
    metrics TEXT NOT NULL,
    computed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_totals_scope ON totals_rollups(scope);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
