//! Extracted record types, one per hierarchy level
//!
//! Field and key shapes mirror the persistence schema: every record carries
//! its natural key plus a denormalized copy of all ancestor keys, an
//! optional metrics map, and a discovery timestamp.

use crate::model::level::{Level, TotalsScope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single metric cell value
///
/// Pop-report tables mix integer counts with free-form cells, so metrics
/// keep the raw string when a cell does not parse as a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Text(String),
}

/// Opaque numeric map attached to set/card records and totals rollups
pub type Metrics = BTreeMap<String, MetricValue>;

/// Ancestor keys accumulated while descending the hierarchy
///
/// A node at level L has every field above L populated and the rest None.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ancestry {
    pub sport: Option<String>,
    pub year: Option<String>,
    pub set_title: Option<String>,
    pub card_name: Option<String>,
}

impl Ancestry {
    pub fn for_sport(sport: &str) -> Self {
        Self {
            sport: Some(sport.to_string()),
            ..Default::default()
        }
    }

    /// Human-readable path for logs, e.g. "Baseball/1989/Upper Deck"
    pub fn path(&self) -> String {
        [&self.sport, &self.year, &self.set_title, &self.card_name]
            .iter()
            .filter_map(|part| part.as_deref())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Sport category discovered on the pop-report index page
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRecord {
    pub sport: String,
    pub sport_url: String,
    pub discovered_at: DateTime<Utc>,
}

/// Year discovered on a sport page
#[derive(Debug, Clone, PartialEq)]
pub struct YearRecord {
    pub sport: String,
    pub year: String,
    pub year_url: String,
    pub discovered_at: DateTime<Utc>,
}

/// Set discovered on a year page
#[derive(Debug, Clone, PartialEq)]
pub struct SetRecord {
    pub sport: String,
    pub year: String,
    pub year_url: String,
    pub set_title: String,
    /// All URLs harvested from the title cell; the first is the set page
    pub set_urls: Vec<String>,
    pub metrics: Metrics,
    pub discovered_at: DateTime<Utc>,
}

/// Card discovered on a set page
#[derive(Debug, Clone, PartialEq)]
pub struct CardRecord {
    pub sport: String,
    pub year: String,
    pub set_title: String,
    pub set_url: String,
    pub card_name: String,
    pub card_urls: Vec<String>,
    pub metrics: Metrics,
    pub discovered_at: DateTime<Utc>,
}

/// One graded-copy row on a card detail page
///
/// The cert number joins the ancestor keys to form the uniqueness
/// constraint: two rows for the same card with different cert numbers are
/// distinct records.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRowRecord {
    pub sport: String,
    pub year: String,
    pub set_title: String,
    pub card_name: String,
    pub card_url: String,
    pub cert_number: String,
    pub rank: Option<String>,
    pub tag_grade: Option<String>,
    pub report_url: Option<String>,
    pub rank_by_grade: Option<String>,
    pub chronology: Option<String>,
    pub chron_by_grade: Option<String>,
    pub completed_date_raw: Option<String>,
    pub completed_date_iso: Option<DateTime<Utc>>,
    pub discovered_at: DateTime<Utc>,
}

/// A record extracted from a page, tagged by level
#[derive(Debug, Clone, PartialEq)]
pub enum RecordData {
    Category(CategoryRecord),
    Year(YearRecord),
    Set(SetRecord),
    Card(CardRecord),
    GradeRow(GradeRowRecord),
}

impl RecordData {
    pub fn level(&self) -> Level {
        match self {
            Self::Category(_) => Level::Category,
            Self::Year(_) => Level::Year,
            Self::Set(_) => Level::Set,
            Self::Card(_) => Level::Card,
            Self::GradeRow(_) => Level::GradeRow,
        }
    }

    /// The natural-key tuple joined into a single dedup string
    pub fn natural_key(&self) -> String {
        match self {
            Self::Category(r) => r.sport.clone(),
            Self::Year(r) => format!("{}|{}", r.sport, r.year),
            Self::Set(r) => format!("{}|{}|{}", r.sport, r.year, r.set_title),
            Self::Card(r) => {
                format!("{}|{}|{}|{}", r.sport, r.year, r.set_title, r.card_name)
            }
            Self::GradeRow(r) => format!(
                "{}|{}|{}|{}|{}",
                r.sport, r.year, r.set_title, r.card_name, r.cert_number
            ),
        }
    }

    /// The URL of this record's child page, if one was harvested
    ///
    /// Grade rows are the leaf level and never yield a child.
    pub fn child_url(&self) -> Option<&str> {
        match self {
            Self::Category(r) => Some(r.sport_url.as_str()),
            Self::Year(r) => Some(r.year_url.as_str()),
            Self::Set(r) => r.set_urls.first().map(String::as_str),
            Self::Card(r) => r.card_urls.first().map(String::as_str),
            Self::GradeRow(_) => None,
        }
    }

    /// Ancestry for the child node spawned from this record
    pub fn child_ancestry(&self) -> Ancestry {
        match self {
            Self::Category(r) => Ancestry {
                sport: Some(r.sport.clone()),
                ..Default::default()
            },
            Self::Year(r) => Ancestry {
                sport: Some(r.sport.clone()),
                year: Some(r.year.clone()),
                ..Default::default()
            },
            Self::Set(r) => Ancestry {
                sport: Some(r.sport.clone()),
                year: Some(r.year.clone()),
                set_title: Some(r.set_title.clone()),
                card_name: None,
            },
            Self::Card(r) => Ancestry {
                sport: Some(r.sport.clone()),
                year: Some(r.year.clone()),
                set_title: Some(r.set_title.clone()),
                card_name: Some(r.card_name.clone()),
            },
            Self::GradeRow(r) => Ancestry {
                sport: Some(r.sport.clone()),
                year: Some(r.year.clone()),
                set_title: Some(r.set_title.clone()),
                card_name: Some(r.card_name.clone()),
            },
        }
    }
}

/// Rollup produced by a TOTALS sentinel row
///
/// Key fields at and below the scope are None: a set-scope rollup carries
/// sport and year but no set title, because the row aggregates across the
/// sets of that year.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalsAggregate {
    pub scope: TotalsScope,
    pub sport: Option<String>,
    pub year: Option<String>,
    pub set_title: Option<String>,
    pub card_name: Option<String>,
    pub metrics: Metrics,
    pub computed_at: DateTime<Utc>,
}

impl TotalsAggregate {
    /// Composite uniqueness key for the rollup store
    ///
    /// Absent fields collapse to empty segments so the key stays a usable
    /// conflict target (SQLite treats NULLs in a UNIQUE index as distinct).
    pub fn scope_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.scope,
            self.sport.as_deref().unwrap_or(""),
            self.year.as_deref().unwrap_or(""),
            self.set_title.as_deref().unwrap_or(""),
            self.card_name.as_deref().unwrap_or(""),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade_row() -> GradeRowRecord {
        GradeRowRecord {
            sport: "Baseball".to_string(),
            year: "1989".to_string(),
            set_title: "Upper Deck".to_string(),
            card_name: "Ken Griffey Jr.".to_string(),
            card_url: "https://example.com/card/1".to_string(),
            cert_number: "A1234567".to_string(),
            rank: Some("1".to_string()),
            tag_grade: Some("10".to_string()),
            report_url: None,
            rank_by_grade: None,
            chronology: None,
            chron_by_grade: None,
            completed_date_raw: None,
            completed_date_iso: None,
            discovered_at: Utc::now(),
        }
    }

    #[test]
    fn test_natural_key_includes_cert_number() {
        let mut a = grade_row();
        let mut b = grade_row();
        a.cert_number = "A1".to_string();
        b.cert_number = "A2".to_string();
        assert_ne!(
            RecordData::GradeRow(a).natural_key(),
            RecordData::GradeRow(b).natural_key()
        );
    }

    #[test]
    fn test_child_url_none_at_leaf() {
        assert_eq!(RecordData::GradeRow(grade_row()).child_url(), None);
    }

    #[test]
    fn test_child_ancestry_accumulates() {
        let set = SetRecord {
            sport: "Hockey".to_string(),
            year: "1990".to_string(),
            year_url: "https://example.com/Hockey/1990".to_string(),
            set_title: "Score".to_string(),
            set_urls: vec!["https://example.com/Hockey/1990/Score".to_string()],
            metrics: Metrics::new(),
            discovered_at: Utc::now(),
        };
        let ancestry = RecordData::Set(set).child_ancestry();
        assert_eq!(ancestry.sport.as_deref(), Some("Hockey"));
        assert_eq!(ancestry.year.as_deref(), Some("1990"));
        assert_eq!(ancestry.set_title.as_deref(), Some("Score"));
        assert_eq!(ancestry.card_name, None);
        assert_eq!(ancestry.path(), "Hockey/1990/Score");
    }

    #[test]
    fn test_scope_key_distinguishes_scopes() {
        let base = TotalsAggregate {
            scope: TotalsScope::Set,
            sport: Some("Baseball".to_string()),
            year: Some("1989".to_string()),
            set_title: None,
            card_name: None,
            metrics: Metrics::new(),
            computed_at: Utc::now(),
        };
        let mut other = base.clone();
        other.scope = TotalsScope::Year;
        other.year = None;
        assert_ne!(base.scope_key(), other.scope_key());
        assert_eq!(base.scope_key(), "set|Baseball|1989||");
    }

    #[test]
    fn test_metric_value_json_shape() {
        let mut metrics = Metrics::new();
        metrics.insert("total_items".to_string(), MetricValue::Int(592));
        metrics.insert("note".to_string(), MetricValue::Text("n/a".to_string()));
        let json = serde_json::to_string(&metrics).unwrap();
        assert_eq!(json, r#"{"note":"n/a","total_items":592}"#);
        let back: Metrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metrics);
    }
}
