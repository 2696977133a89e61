//! Table extractor for pop-report pages
//!
//! Every level of the hierarchy is presented as a table whose first cell
//! is the row label (sport, year, set title, player) and whose remaining
//! cells are numeric metrics. Card detail pages differ: their grade table
//! is header-mapped because column order varies.

use crate::extract::{ExtractError, Extraction, PageExtractor};
use crate::model::{
    Ancestry, CardRecord, CategoryRecord, GradeRowRecord, Level, MetricValue, Metrics, RecordData,
    SetRecord, TotalsAggregate, YearRecord,
};
use crate::urls::absolutize;
use chrono::{DateTime, NaiveDate, Utc};
use scraper::{ElementRef, Html, Selector};

/// Sentinel label marking a rollup row
///
/// Matched literally after trimming and case-folding. A reformatted or
/// localized label falls through as an ordinary record (fails closed).
const TOTALS_LABEL: &str = "TOTALS";

/// Metric column names in table order; further columns get positional names
const METRIC_NAMES: [&str; 3] = ["num_sets", "total_items", "total_graded"];

/// Extractor over the site's table markup
#[derive(Default)]
pub struct TableExtractor;

impl TableExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PageExtractor for TableExtractor {
    fn extract(
        &self,
        level: Level,
        html: &str,
        page_url: &str,
        ancestry: &Ancestry,
    ) -> Result<Extraction, ExtractError> {
        let document = Html::parse_document(html);
        match level {
            Level::Category => extract_categories(&document, page_url),
            Level::Year => extract_years(&document, page_url, ancestry),
            Level::Set => extract_sets(&document, page_url, ancestry),
            Level::Card => extract_cards(&document, page_url, ancestry),
            Level::GradeRow => extract_grade_rows(&document, page_url, ancestry),
        }
    }
}

struct Selectors {
    table: Selector,
    body_row: Selector,
    header_cell: Selector,
    data_cell: Selector,
    anchor: Selector,
}

impl Selectors {
    fn new() -> Option<Self> {
        Some(Self {
            table: Selector::parse("table").ok()?,
            body_row: Selector::parse("tbody tr").ok()?,
            header_cell: Selector::parse("thead th").ok()?,
            data_cell: Selector::parse("td").ok()?,
            anchor: Selector::parse("a[href]").ok()?,
        })
    }
}

fn extract_categories(document: &Html, page_url: &str) -> Result<Extraction, ExtractError> {
    let sels = match Selectors::new() {
        Some(sels) => sels,
        None => return Ok(Extraction::default()),
    };
    let rows = data_rows(document, &sels, Level::Category)?;

    let mut extraction = Extraction::default();
    for row in rows {
        let cells = cells_of(&row, &sels);
        let label = match row_label(&cells) {
            Some(label) => label,
            None => continue,
        };

        if is_totals(&label) {
            set_totals(
                &mut extraction,
                Level::Category,
                &Ancestry::default(),
                metrics_of(&cells),
            );
            continue;
        }

        let sport_url = first_link(&cells[0], page_url, &sels)
            .unwrap_or_else(|| format!("{}/{}", page_url.trim_end_matches('/'), label));

        extraction.records.push(RecordData::Category(CategoryRecord {
            sport: label,
            sport_url,
            discovered_at: Utc::now(),
        }));
    }

    Ok(extraction)
}

fn extract_years(
    document: &Html,
    page_url: &str,
    ancestry: &Ancestry,
) -> Result<Extraction, ExtractError> {
    let sport = required(ancestry.sport.as_ref(), Level::Year)?;
    let sels = match Selectors::new() {
        Some(sels) => sels,
        None => return Ok(Extraction::default()),
    };
    let rows = data_rows(document, &sels, Level::Year)?;

    let mut extraction = Extraction::default();
    for row in rows {
        let cells = cells_of(&row, &sels);
        let label = match row_label(&cells) {
            Some(label) => label,
            None => continue,
        };

        if is_totals(&label) {
            set_totals(&mut extraction, Level::Year, ancestry, metrics_of(&cells));
            continue;
        }

        // Year labels are four digits; anything else is site furniture
        if label.len() != 4 || !label.chars().all(|c| c.is_ascii_digit()) {
            tracing::debug!(label, "skipping non-year row");
            continue;
        }

        let year_url = match first_link_any(&cells, page_url, &sels) {
            Some(url) => url,
            None => {
                tracing::debug!(year = %label, "year row has no destination URL");
                continue;
            }
        };

        extraction.records.push(RecordData::Year(YearRecord {
            sport: sport.clone(),
            year: label,
            year_url,
            discovered_at: Utc::now(),
        }));
    }

    Ok(extraction)
}

fn extract_sets(
    document: &Html,
    page_url: &str,
    ancestry: &Ancestry,
) -> Result<Extraction, ExtractError> {
    let sport = required(ancestry.sport.as_ref(), Level::Set)?;
    let year = required(ancestry.year.as_ref(), Level::Set)?;
    let sels = match Selectors::new() {
        Some(sels) => sels,
        None => return Ok(Extraction::default()),
    };
    let rows = data_rows(document, &sels, Level::Set)?;

    let mut extraction = Extraction::default();
    for row in rows {
        let cells = cells_of(&row, &sels);
        let label = match row_label(&cells) {
            Some(label) => label,
            None => continue,
        };

        if is_totals(&label) {
            set_totals(&mut extraction, Level::Set, ancestry, metrics_of(&cells));
            continue;
        }

        extraction.records.push(RecordData::Set(SetRecord {
            sport: sport.clone(),
            year: year.clone(),
            year_url: page_url.to_string(),
            set_title: label,
            set_urls: cell_links(&cells[0], page_url, &sels),
            metrics: metrics_of(&cells),
            discovered_at: Utc::now(),
        }));
    }

    Ok(extraction)
}

fn extract_cards(
    document: &Html,
    page_url: &str,
    ancestry: &Ancestry,
) -> Result<Extraction, ExtractError> {
    let sport = required(ancestry.sport.as_ref(), Level::Card)?;
    let year = required(ancestry.year.as_ref(), Level::Card)?;
    let set_title = required(ancestry.set_title.as_ref(), Level::Card)?;
    let sels = match Selectors::new() {
        Some(sels) => sels,
        None => return Ok(Extraction::default()),
    };
    let rows = data_rows(document, &sels, Level::Card)?;

    let mut extraction = Extraction::default();
    for row in rows {
        let cells = cells_of(&row, &sels);
        let label = match row_label(&cells) {
            Some(label) => label,
            None => continue,
        };

        if is_totals(&label) {
            set_totals(&mut extraction, Level::Card, ancestry, metrics_of(&cells));
            continue;
        }

        extraction.records.push(RecordData::Card(CardRecord {
            sport: sport.clone(),
            year: year.clone(),
            set_title: set_title.clone(),
            set_url: page_url.to_string(),
            card_name: label,
            card_urls: cell_links(&cells[0], page_url, &sels),
            metrics: metrics_of(&cells),
            discovered_at: Utc::now(),
        }));
    }

    Ok(extraction)
}

/// Column positions of the grade table, mapped from header text
#[derive(Debug, Default)]
struct GradeColumns {
    rank: Option<usize>,
    tag_grade: Option<usize>,
    report_url: Option<usize>,
    rank_by_grade: Option<usize>,
    chronology: Option<usize>,
    chron_by_grade: Option<usize>,
    completed_date: Option<usize>,
    cert_number: Option<usize>,
}

impl GradeColumns {
    fn from_headers(headers: &[String]) -> Self {
        let mut columns = Self::default();
        for (index, header) in headers.iter().enumerate() {
            let header = header.to_lowercase();
            if header.contains("rank by grade") {
                columns.rank_by_grade = Some(index);
            } else if header.contains("rank") && !header.contains("grade") {
                columns.rank = Some(index);
            } else if header.contains("tag grade") {
                columns.tag_grade = Some(index);
            } else if header.contains("report") {
                columns.report_url = Some(index);
            } else if header.contains("chron by grade") {
                columns.chron_by_grade = Some(index);
            } else if header.contains("chronology") && !header.contains("grade") {
                columns.chronology = Some(index);
            } else if header.contains("completed") {
                columns.completed_date = Some(index);
            } else if header.contains("cert number") {
                columns.cert_number = Some(index);
            }
        }
        columns
    }

    fn mapped_count(&self) -> usize {
        [
            self.rank,
            self.tag_grade,
            self.report_url,
            self.rank_by_grade,
            self.chronology,
            self.chron_by_grade,
            self.completed_date,
            self.cert_number,
        ]
        .iter()
        .filter(|column| column.is_some())
        .count()
    }
}

fn extract_grade_rows(
    document: &Html,
    page_url: &str,
    ancestry: &Ancestry,
) -> Result<Extraction, ExtractError> {
    let sport = required(ancestry.sport.as_ref(), Level::GradeRow)?;
    let year = required(ancestry.year.as_ref(), Level::GradeRow)?;
    let set_title = required(ancestry.set_title.as_ref(), Level::GradeRow)?;
    let card_name = required(ancestry.card_name.as_ref(), Level::GradeRow)?;
    let sels = match Selectors::new() {
        Some(sels) => sels,
        None => return Ok(Extraction::default()),
    };

    let mut tables = document.select(&sels.table).peekable();
    if tables.peek().is_none() {
        return Err(ExtractError::NoDataTable {
            level: Level::GradeRow,
        });
    }

    // The grade table is recognized by its headers, not its position:
    // column order varies between card pages.
    let mut extraction = Extraction::default();
    for table in tables {
        let headers: Vec<String> = table
            .select(&sels.header_cell)
            .map(|cell| normalize_text(&cell.text().collect::<String>()))
            .collect();
        let columns = GradeColumns::from_headers(&headers);
        if columns.mapped_count() < 4 {
            continue;
        }

        for row in table.select(&sels.body_row) {
            let cells = cells_of(&row, &sels);
            if cells.is_empty() {
                continue;
            }
            if row_label(&cells).is_some_and(|label| is_totals(&label)) {
                continue;
            }

            let cert_number = match columns
                .cert_number
                .and_then(|index| cells.get(index))
                .map(|cell| cell_text(cell))
            {
                Some(cert) if !cert.is_empty() => cert,
                _ => continue,
            };

            let text_at = |index: Option<usize>| -> Option<String> {
                index
                    .and_then(|i| cells.get(i))
                    .map(|cell| cell_text(cell))
                    .filter(|text| !text.is_empty() && text != "-")
            };

            let report_url = columns
                .report_url
                .and_then(|i| cells.get(i))
                .and_then(|cell| first_link(cell, page_url, &sels));

            let (completed_date_raw, completed_date_iso) = columns
                .completed_date
                .and_then(|i| cells.get(i))
                .map(|cell| completed_date(cell))
                .unwrap_or((None, None));

            extraction.records.push(RecordData::GradeRow(GradeRowRecord {
                sport: sport.clone(),
                year: year.clone(),
                set_title: set_title.clone(),
                card_name: card_name.clone(),
                card_url: page_url.to_string(),
                cert_number,
                rank: text_at(columns.rank),
                tag_grade: text_at(columns.tag_grade),
                report_url,
                rank_by_grade: text_at(columns.rank_by_grade),
                chronology: text_at(columns.chronology),
                chron_by_grade: text_at(columns.chron_by_grade),
                completed_date_raw,
                completed_date_iso,
                discovered_at: Utc::now(),
            }));
        }
        break;
    }

    Ok(extraction)
}

// ===== Shared row helpers =====

fn data_rows<'a>(
    document: &'a Html,
    sels: &Selectors,
    level: Level,
) -> Result<Vec<ElementRef<'a>>, ExtractError> {
    if document.select(&sels.table).next().is_none() {
        return Err(ExtractError::NoDataTable { level });
    }
    Ok(document.select(&sels.body_row).collect())
}

fn cells_of<'a>(row: &ElementRef<'a>, sels: &Selectors) -> Vec<ElementRef<'a>> {
    row.select(&sels.data_cell).collect()
}

fn row_label(cells: &[ElementRef<'_>]) -> Option<String> {
    let label = cell_text(cells.first()?);
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    normalize_text(&cell.text().collect::<String>())
}

/// Trims and collapses internal whitespace
fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_totals(label: &str) -> bool {
    label.trim().to_uppercase() == TOTALS_LABEL
}

fn set_totals(extraction: &mut Extraction, level: Level, ancestry: &Ancestry, metrics: Metrics) {
    let scope = match level.totals_scope() {
        Some(scope) => scope,
        None => return,
    };
    // A page carries at most one rollup; keep the first
    if extraction.totals.is_some() {
        return;
    }
    extraction.totals = Some(TotalsAggregate {
        scope,
        sport: ancestry.sport.clone(),
        year: ancestry.year.clone(),
        set_title: ancestry.set_title.clone(),
        card_name: ancestry.card_name.clone(),
        metrics,
        computed_at: Utc::now(),
    });
}

fn cell_links(cell: &ElementRef<'_>, page_url: &str, sels: &Selectors) -> Vec<String> {
    cell.select(&sels.anchor)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| absolutize(page_url, href))
        .collect()
}

fn first_link(cell: &ElementRef<'_>, page_url: &str, sels: &Selectors) -> Option<String> {
    cell_links(cell, page_url, sels).into_iter().next()
}

fn first_link_any(cells: &[ElementRef<'_>], page_url: &str, sels: &Selectors) -> Option<String> {
    cells
        .iter()
        .find_map(|cell| first_link(cell, page_url, sels))
}

/// Parses metric cells (everything after the label cell)
///
/// Integer cells get known metric names in column order; non-numeric text
/// is kept verbatim; bare "-" placeholders are dropped.
fn metrics_of(cells: &[ElementRef<'_>]) -> Metrics {
    let mut metrics = Metrics::new();
    if cells.len() < 2 {
        return metrics;
    }

    for (index, cell) in cells[1..].iter().enumerate() {
        let text = cell_text(cell);
        if text.is_empty() || text == "-" {
            continue;
        }

        let name = METRIC_NAMES
            .get(index)
            .map(|name| name.to_string())
            .unwrap_or_else(|| format!("metric_{}", index));

        let cleaned = text.replace(',', "");
        match cleaned.parse::<i64>() {
            Ok(value) => metrics.insert(name, MetricValue::Int(value)),
            Err(_) => metrics.insert(name, MetricValue::Text(text)),
        };
    }

    metrics
}

/// Pulls the completed date from a cell, preferring its ISO value attribute
fn completed_date(cell: &ElementRef<'_>) -> (Option<String>, Option<DateTime<Utc>>) {
    if let Some(value) = cell.value().attr("value") {
        if value.contains('T') {
            if let Some(parsed) = parse_date(value) {
                return (Some(value.to_string()), Some(parsed));
            }
        }
    }

    let text = cell_text(cell);
    if text.is_empty() || text == "-" {
        return (None, None);
    }
    let parsed = parse_date(&text);
    (Some(text), parsed)
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&format!("{}Z", raw)) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d", "%m-%d-%Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            let midnight = date.and_hms_opt(0, 0, 0)?;
            return Some(DateTime::from_naive_utc_and_offset(midnight, Utc));
        }
    }
    None
}

fn required(value: Option<&String>, level: Level) -> Result<String, ExtractError> {
    value
        .cloned()
        .ok_or(ExtractError::MissingContext { level })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TotalsScope;

    const PAGE_URL: &str = "https://example.com/pop-report/Baseball/1989";

    fn ancestry(sport: &str, year: Option<&str>, set: Option<&str>, card: Option<&str>) -> Ancestry {
        Ancestry {
            sport: Some(sport.to_string()),
            year: year.map(|s| s.to_string()),
            set_title: set.map(|s| s.to_string()),
            card_name: card.map(|s| s.to_string()),
        }
    }

    fn extract(level: Level, html: &str, ancestry: &Ancestry) -> Extraction {
        TableExtractor::new()
            .extract(level, html, PAGE_URL, ancestry)
            .unwrap()
    }

    #[test]
    fn test_years_with_totals_row() {
        let html = r#"<html><body><table><tbody>
            <tr><td><a href="/pop-report/Baseball/1989">1989</a></td><td>12</td><td>450</td></tr>
            <tr><td><a href="/pop-report/Baseball/1990">1990</a></td><td>9</td><td>300</td></tr>
            <tr><td>TOTALS</td><td>21</td><td>750</td></tr>
        </tbody></table></body></html>"#;

        let extraction = extract(Level::Year, html, &ancestry("Baseball", None, None, None));

        assert_eq!(extraction.records.len(), 2);
        match &extraction.records[0] {
            RecordData::Year(year) => {
                assert_eq!(year.sport, "Baseball");
                assert_eq!(year.year, "1989");
                assert_eq!(
                    year.year_url,
                    "https://example.com/pop-report/Baseball/1989"
                );
            }
            other => panic!("unexpected record {:?}", other),
        }

        let totals = extraction.totals.expect("totals row present");
        assert_eq!(totals.scope, TotalsScope::Year);
        assert_eq!(totals.sport.as_deref(), Some("Baseball"));
        assert_eq!(totals.year, None);
        assert_eq!(
            totals.metrics.get("num_sets"),
            Some(&MetricValue::Int(21))
        );
    }

    #[test]
    fn test_totals_matching_is_case_and_whitespace_insensitive() {
        let html = r#"<table><tbody>
            <tr><td>  Totals  </td><td>5</td></tr>
        </tbody></table>"#;
        let extraction = extract(Level::Set, html, &ancestry("Baseball", Some("1989"), None, None));
        assert!(extraction.records.is_empty());
        assert!(extraction.totals.is_some());
    }

    #[test]
    fn test_localized_totals_label_fails_closed() {
        // Anything that is not the literal label is an ordinary record
        let html = r#"<table><tbody>
            <tr><td>Totaux</td><td>5</td></tr>
        </tbody></table>"#;
        let extraction = extract(Level::Set, html, &ancestry("Baseball", Some("1989"), None, None));
        assert_eq!(extraction.records.len(), 1);
        assert!(extraction.totals.is_none());
    }

    #[test]
    fn test_non_year_rows_skipped() {
        let html = r#"<table><tbody>
            <tr><td><a href="/x">View all</a></td><td>1</td></tr>
            <tr><td><a href="/pop-report/Baseball/1989">1989</a></td><td>1</td></tr>
        </tbody></table>"#;
        let extraction = extract(Level::Year, html, &ancestry("Baseball", None, None, None));
        assert_eq!(extraction.records.len(), 1);
    }

    #[test]
    fn test_set_metrics_parsing() {
        let html = r#"<table><tbody>
            <tr><td><a href="/pop-report/Baseball/1989/Donruss">Donruss</a></td>
                <td>1,234</td><td>-</td><td>88</td><td>flagged</td></tr>
        </tbody></table>"#;
        let extraction = extract(Level::Set, html, &ancestry("Baseball", Some("1989"), None, None));

        match &extraction.records[0] {
            RecordData::Set(set) => {
                assert_eq!(set.set_title, "Donruss");
                assert_eq!(set.year_url, PAGE_URL);
                assert_eq!(set.metrics.get("num_sets"), Some(&MetricValue::Int(1234)));
                // "-" placeholder dropped
                assert_eq!(set.metrics.get("total_items"), None);
                assert_eq!(set.metrics.get("total_graded"), Some(&MetricValue::Int(88)));
                assert_eq!(
                    set.metrics.get("metric_3"),
                    Some(&MetricValue::Text("flagged".to_string()))
                );
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_card_rows_carry_ancestry() {
        let html = r#"<table><tbody>
            <tr><td><a href="/card/griffey">Ken Griffey Jr.</a></td><td>10</td></tr>
        </tbody></table>"#;
        let extraction = extract(
            Level::Card,
            html,
            &ancestry("Baseball", Some("1989"), Some("Upper Deck"), None),
        );

        match &extraction.records[0] {
            RecordData::Card(card) => {
                assert_eq!(card.sport, "Baseball");
                assert_eq!(card.set_title, "Upper Deck");
                assert_eq!(card.card_urls, vec!["https://example.com/card/griffey"]);
                assert_eq!(card.set_url, PAGE_URL);
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_grade_rows_header_mapped() {
        let html = r#"<table>
            <thead><tr>
                <th>Rank</th><th>TAG Grade</th><th>View Report</th>
                <th>Rank by Grade</th><th>Completed</th><th>Cert Number</th>
            </tr></thead>
            <tbody>
                <tr><td>1</td><td>10</td><td><a href="/report/123">view</a></td>
                    <td>1</td><td>2023-04-01</td><td>C123</td></tr>
                <tr><td>2</td><td>9.5</td><td></td>
                    <td>1</td><td>-</td><td>C124</td></tr>
                <tr><td>3</td><td>9</td><td></td><td>2</td><td></td><td></td></tr>
            </tbody></table>"#;
        let extraction = extract(
            Level::GradeRow,
            html,
            &ancestry(
                "Baseball",
                Some("1989"),
                Some("Upper Deck"),
                Some("Ken Griffey Jr."),
            ),
        );

        // Third row has no cert number and is dropped
        assert_eq!(extraction.records.len(), 2);
        match &extraction.records[0] {
            RecordData::GradeRow(row) => {
                assert_eq!(row.cert_number, "C123");
                assert_eq!(row.tag_grade.as_deref(), Some("10"));
                assert_eq!(
                    row.report_url.as_deref(),
                    Some("https://example.com/report/123")
                );
                assert_eq!(row.completed_date_raw.as_deref(), Some("2023-04-01"));
                assert!(row.completed_date_iso.is_some());
                assert_eq!(row.card_url, PAGE_URL);
            }
            other => panic!("unexpected record {:?}", other),
        }
        match &extraction.records[1] {
            RecordData::GradeRow(row) => {
                assert_eq!(row.report_url, None);
                assert_eq!(row.completed_date_raw, None);
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_grade_rows_skip_totals_label() {
        let html = r#"<table>
            <thead><tr>
                <th>Rank</th><th>TAG Grade</th><th>View Report</th><th>Cert Number</th>
            </tr></thead>
            <tbody>
                <tr><td>TOTALS</td><td></td><td></td><td>X1</td></tr>
                <tr><td>1</td><td>10</td><td></td><td>C9</td></tr>
            </tbody></table>"#;
        let extraction = extract(
            Level::GradeRow,
            html,
            &ancestry("Baseball", Some("1989"), Some("Donruss"), Some("Gary Carter")),
        );
        assert_eq!(extraction.records.len(), 1);
        assert!(extraction.totals.is_none());
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let result = TableExtractor::new().extract(
            Level::Year,
            "<html><body><p>maintenance</p></body></html>",
            PAGE_URL,
            &ancestry("Baseball", None, None, None),
        );
        assert!(matches!(result, Err(ExtractError::NoDataTable { .. })));
    }

    #[test]
    fn test_missing_ancestry_is_an_error() {
        let result = TableExtractor::new().extract(
            Level::Year,
            "<table><tbody></tbody></table>",
            PAGE_URL,
            &Ancestry::default(),
        );
        assert!(matches!(result, Err(ExtractError::MissingContext { .. })));
    }

    #[test]
    fn test_categories_fall_back_to_joined_url() {
        let html = r#"<table><tbody>
            <tr><td>Baseball</td><td>100</td></tr>
        </tbody></table>"#;
        let extraction = TableExtractor::new()
            .extract(
                Level::Category,
                html,
                "https://example.com/pop-report",
                &Ancestry::default(),
            )
            .unwrap();
        match &extraction.records[0] {
            RecordData::Category(category) => {
                assert_eq!(category.sport_url, "https://example.com/pop-report/Baseball");
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2023-04-01").is_some());
        assert!(parse_date("04-01-2023").is_some());
        assert!(parse_date("04/01/2023").is_some());
        assert!(parse_date("2023-04-01T12:30:00Z").is_some());
        assert!(parse_date("2023-04-01T12:30:00").is_some());
        assert!(parse_date("sometime").is_none());
    }
}
