//! URL handling module
//!
//! This module provides URL canonicalization, page classification by path
//! shape, and the scope filter that keeps the crawl on one site.

mod normalize;
mod scope;

use crate::state::PageKind;
use regex::Regex;
use std::sync::LazyLock;

// Re-export main functions
pub use normalize::{canonicalize_with_alias, try_canonicalize};
pub use scope::{SiteScope, DEFAULT_ALLOWED_PATHS, DEFAULT_APEX_ALIAS, DEFAULT_HOST};

static PART_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/PS\d+").expect("valid part path regex"));

static DEFAULT_SCOPE: LazyLock<SiteScope> = LazyLock::new(SiteScope::default);

/// Canonicalizes a URL against the default site
///
/// Returns an empty string for unparseable input; callers must drop it.
///
/// # Examples
///
/// ```
/// use partselect_ingest::url::canonicalize;
///
/// assert_eq!(
///     canonicalize("http://partselect.com//Models/WDT780SAEM1/"),
///     "https://www.partselect.com/Models/WDT780SAEM1"
/// );
/// assert_eq!(canonicalize("not a url"), "");
/// ```
pub fn canonicalize(url: &str) -> String {
    DEFAULT_SCOPE.canonicalize(url)
}

/// Returns true if the URL is inside the default site's allow-listed space
pub fn is_in_scope(url: &str) -> bool {
    DEFAULT_SCOPE.is_in_scope(url)
}

/// Classifies a URL by its path shape
///
/// Checked in priority order:
/// 1. `/Models/` segment → model
/// 2. `/PS<digits>` segment → part
/// 3. `/Repair/` segment → repair
/// 4. anything else → other
pub fn classify(url: &str) -> PageKind {
    if url.contains("/Models/") {
        return PageKind::Model;
    }

    if PART_PATH_RE.is_match(url) {
        return PageKind::Part;
    }

    if url.contains("/Repair/") {
        return PageKind::Repair;
    }

    PageKind::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_model() {
        assert_eq!(
            classify("https://www.partselect.com/Models/WDT780SAEM1/"),
            PageKind::Model
        );
    }

    #[test]
    fn test_classify_part() {
        assert_eq!(
            classify("https://www.partselect.com/PS11750093-Whirlpool-W10195416-Lower-Rack.htm"),
            PageKind::Part
        );
    }

    #[test]
    fn test_classify_repair() {
        assert_eq!(
            classify("https://www.partselect.com/Repair/Dishwasher/Not-Draining/"),
            PageKind::Repair
        );
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(
            classify("https://www.partselect.com/Dishwasher-Parts.htm"),
            PageKind::Other
        );
        assert_eq!(classify(""), PageKind::Other);
    }

    #[test]
    fn test_model_wins_over_part() {
        // Model pages frequently link part numbers in their path
        assert_eq!(
            classify("https://www.partselect.com/Models/PS1234/Parts/"),
            PageKind::Model
        );
    }

    #[test]
    fn test_classify_is_deterministic() {
        let url = "https://www.partselect.com/Repair/Refrigerator/";
        assert_eq!(classify(url), classify(url));
    }

    #[test]
    fn test_default_scope_helpers() {
        assert_eq!(
            canonicalize("https://PARTSELECT.com/Brands/"),
            "https://www.partselect.com/Brands"
        );
        assert!(is_in_scope("https://www.partselect.com/Brands/"));
        assert!(!is_in_scope("https://www.google.com/Brands/"));
    }
}
