//! Page classification and fetch outcomes
//!
//! `PageKind` is derived from a URL's path shape; `PageStatus` is what the
//! last fetch of a page recorded in `crawled_pages`.

use serde::Serialize;
use std::fmt;

/// The kind of page a URL points at, derived from its path shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    /// An appliance model page (`/Models/<number>`)
    Model,
    /// A part detail page (`/PS<digits>-...`)
    Part,
    /// A repair help page (`/Repair/...`)
    Repair,
    /// Listings, brand pages and everything else
    Other,
}

impl PageKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Part => "part",
            Self::Repair => "repair",
            Self::Other => "other",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "model" => Some(Self::Model),
            "part" => Some(Self::Part),
            "repair" => Some(Self::Repair),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Outcome of the last fetch recorded in `crawled_pages`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStatus {
    Parsed,
    Failed,
}

impl PageStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "parsed" => Some(Self::Parsed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_kind_db_strings() {
        for kind in [PageKind::Model, PageKind::Part, PageKind::Repair, PageKind::Other] {
            assert_eq!(PageKind::from_db_string(kind.to_db_string()), Some(kind));
        }
        assert_eq!(PageKind::from_db_string("brand"), None);
    }

    #[test]
    fn test_page_status_db_strings() {
        assert_eq!(PageStatus::Parsed.to_db_string(), "parsed");
        assert_eq!(PageStatus::from_db_string("failed"), Some(PageStatus::Failed));
        assert_eq!(PageStatus::from_db_string("skipped"), None);
    }
}
