/// Level definitions for the five-tier pop-report hierarchy
///
/// This module defines the crawl levels and the rollup scopes that
/// TOTALS rows map onto.
use std::fmt;

/// A tier in the Category → Year → Set → Card → GradeRow hierarchy
///
/// A crawl node at level L fetches one page and extracts records of
/// level L from it. GradeRow is the leaf level and produces no children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    /// Sport categories listed on the pop-report index page
    Category,

    /// Years listed on a sport page
    Year,

    /// Sets listed on a year page
    Set,

    /// Cards listed on a set page
    Card,

    /// Grade rows listed on a card detail page (leaf)
    GradeRow,
}

impl Level {
    /// All levels in traversal order
    pub const ALL: [Level; 5] = [
        Level::Category,
        Level::Year,
        Level::Set,
        Level::Card,
        Level::GradeRow,
    ];

    /// Position of this level in `ALL`, used to index per-level counters
    pub fn index(&self) -> usize {
        match self {
            Self::Category => 0,
            Self::Year => 1,
            Self::Set => 2,
            Self::Card => 3,
            Self::GradeRow => 4,
        }
    }

    /// Returns the next level down the hierarchy, or None at the leaf
    pub fn child(&self) -> Option<Level> {
        match self {
            Self::Category => Some(Self::Year),
            Self::Year => Some(Self::Set),
            Self::Set => Some(Self::Card),
            Self::Card => Some(Self::GradeRow),
            Self::GradeRow => None,
        }
    }

    /// Stable string form, used in config keys, CLI values and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Year => "year",
            Self::Set => "set",
            Self::Card => "card",
            Self::GradeRow => "grade-row",
        }
    }

    /// Parses a level from its string form
    ///
    /// Accepts the same values `as_str` produces. Returns None for
    /// anything else.
    pub fn parse(s: &str) -> Option<Level> {
        match s.trim().to_ascii_lowercase().as_str() {
            "category" => Some(Self::Category),
            "year" => Some(Self::Year),
            "set" => Some(Self::Set),
            "card" => Some(Self::Card),
            "grade-row" | "graderow" | "grade_row" => Some(Self::GradeRow),
            _ => None,
        }
    }

    /// The rollup scope a TOTALS row among records of this level maps to
    ///
    /// A TOTALS row aggregates its sibling rows, so the scope is named
    /// after the row level itself. Grade-row tables have no rollup scope;
    /// a TOTALS label there is dropped by the extractor.
    pub fn totals_scope(&self) -> Option<TotalsScope> {
        match self {
            Self::Category => Some(TotalsScope::Sport),
            Self::Year => Some(TotalsScope::Year),
            Self::Set => Some(TotalsScope::Set),
            Self::Card => Some(TotalsScope::Card),
            Self::GradeRow => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Granularity at which a totals rollup applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TotalsScope {
    Sport,
    Year,
    Set,
    Card,
}

impl TotalsScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sport => "sport",
            Self::Year => "year",
            Self::Set => "set",
            Self::Card => "card",
        }
    }

    pub fn parse(s: &str) -> Option<TotalsScope> {
        match s {
            "sport" => Some(Self::Sport),
            "year" => Some(Self::Year),
            "set" => Some(Self::Set),
            "card" => Some(Self::Card),
            _ => None,
        }
    }
}

impl fmt::Display for TotalsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
