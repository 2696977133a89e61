//! URL construction for crawl nodes
//!
//! Child URLs normally come from anchors harvested off the parent page.
//! These helpers cover the rest: absolutizing relative hrefs and rebuilding
//! a set page URL from its title when no anchor was present. Set titles
//! concatenate a base set with a variation ("DonrussOptic Rated Rookie"),
//! and the variation travels in a `setName` query parameter.

use url::Url;

/// Base set names that appear with variations appended
///
/// Checked longest-prefix-first so "Topps Chrome" wins over "Topps".
const KNOWN_BASE_SETS: [&str; 24] = [
    "Bowman Chrome",
    "Bowman",
    "Collector's Choice",
    "Collector's Edge",
    "Donruss",
    "Fleer",
    "Leaf",
    "Merlin Chrome",
    "Merlin Heritage",
    "Merlin",
    "Pacific",
    "Panini Prizm",
    "Panini Select",
    "Panini",
    "Pinnacle",
    "Score",
    "Stadium Club",
    "Topps Chrome",
    "Topps Finest",
    "Topps Now",
    "Topps",
    "Ultra",
    "Upper Deck",
    "Wild Card",
];

/// Resolves a possibly-relative href against the page it appeared on
///
/// Fragment-only and javascript pseudo-links yield None.
pub fn absolutize(page_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let base = Url::parse(page_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

/// URL of the pop-report index page
pub fn index_url(base_url: &str, index_path: &str) -> String {
    format!(
        "{}{}",
        base_url.trim_end_matches('/'),
        index_path
    )
}

/// URL of a sport page below the index
pub fn sport_url(base_url: &str, index_path: &str, sport: &str) -> Option<String> {
    let mut url = Url::parse(&index_url(base_url, index_path)).ok()?;
    url.path_segments_mut().ok()?.push(sport);
    Some(url.to_string())
}

/// Splits a set title into its base set and variation
///
/// Tries known base-set prefixes first, then a lower-to-upper camel-case
/// boundary, then the first space. A title with no recognizable split is
/// all base.
pub fn split_base_set(set_title: &str) -> (String, Option<String>) {
    for base in KNOWN_BASE_SETS {
        if let Some(rest) = set_title.strip_prefix(base) {
            let rest = rest.trim();
            if rest.is_empty() {
                return (base.to_string(), None);
            }
            return (base.to_string(), Some(rest.to_string()));
        }
    }

    let chars: Vec<char> = set_title.chars().collect();
    for i in 1..chars.len() {
        if chars[i].is_uppercase() && chars[i - 1].is_lowercase() {
            let base: String = chars[..i].iter().collect();
            let variation: String = chars[i..].iter().collect();
            return (base, Some(variation));
        }
    }

    match set_title.split_once(' ') {
        Some((base, variation)) => (base.to_string(), Some(variation.to_string())),
        None => (set_title.to_string(), None),
    }
}

/// Rebuilds a set page URL from record fields
///
/// Used only when the set row carried no href; harvested URLs always win.
pub fn build_set_page_url(
    base_url: &str,
    index_path: &str,
    sport: &str,
    year: &str,
    set_title: &str,
) -> Option<String> {
    let (base_set, variation) = split_base_set(set_title);

    let mut url = Url::parse(&index_url(base_url, index_path)).ok()?;
    url.path_segments_mut()
        .ok()?
        .push(sport)
        .push(year)
        .push(&base_set);
    if let Some(variation) = variation {
        url.query_pairs_mut().append_pair("setName", &variation);
    }
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolutize_relative_href() {
        let absolute = absolutize(
            "https://example.com/pop-report/Baseball",
            "/pop-report/Baseball/1989",
        );
        assert_eq!(
            absolute.as_deref(),
            Some("https://example.com/pop-report/Baseball/1989")
        );
    }

    #[test]
    fn test_absolutize_rejects_non_destinations() {
        assert_eq!(absolutize("https://example.com/", "#anchor"), None);
        assert_eq!(absolutize("https://example.com/", "javascript:void(0)"), None);
        assert_eq!(absolutize("https://example.com/", "  "), None);
    }

    #[test]
    fn test_absolutize_keeps_absolute_href() {
        let absolute = absolutize("https://example.com/a", "https://other.example.com/b");
        assert_eq!(absolute.as_deref(), Some("https://other.example.com/b"));
    }

    #[test]
    fn test_index_and_sport_urls() {
        assert_eq!(
            index_url("https://example.com/", "/pop-report"),
            "https://example.com/pop-report"
        );
        assert_eq!(
            sport_url("https://example.com", "/pop-report", "Baseball").unwrap(),
            "https://example.com/pop-report/Baseball"
        );
    }

    #[test]
    fn test_split_known_base_set() {
        assert_eq!(
            split_base_set("Upper Deck"),
            ("Upper Deck".to_string(), None)
        );
        assert_eq!(
            split_base_set("Topps Chrome MLS"),
            ("Topps Chrome".to_string(), Some("MLS".to_string()))
        );
        assert_eq!(
            split_base_set("DonrussNight Moves"),
            ("Donruss".to_string(), Some("Night Moves".to_string()))
        );
    }

    #[test]
    fn test_split_camel_case_boundary() {
        assert_eq!(
            split_base_set("ClassicLight Blue"),
            ("Classic".to_string(), Some("Light Blue".to_string()))
        );
    }

    #[test]
    fn test_split_falls_back_to_first_space() {
        assert_eq!(
            split_base_set("Mystery Box"),
            ("Mystery".to_string(), Some("Box".to_string()))
        );
        assert_eq!(split_base_set("Solo"), ("Solo".to_string(), None));
    }

    #[test]
    fn test_build_set_page_url_with_variation() {
        let url = build_set_page_url(
            "https://example.com",
            "/pop-report",
            "Soccer",
            "2024",
            "DonrussOptic Rated Rookie",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://example.com/pop-report/Soccer/2024/Donruss?setName=Optic+Rated+Rookie"
        );
    }

    #[test]
    fn test_build_set_page_url_without_variation() {
        let url = build_set_page_url(
            "https://example.com",
            "/pop-report",
            "Baseball",
            "1989",
            "Upper Deck",
        )
        .unwrap();
        assert_eq!(url, "https://example.com/pop-report/Baseball/1989/Upper%20Deck");
    }
}
