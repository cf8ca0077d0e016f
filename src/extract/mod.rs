//! Page classification and content extraction
//!
//! Turns fetched page content (Markdown) into structured entities and the
//! list of site links it references. Extraction is pattern based and never
//! fails: a page that does not look like its classified kind simply yields no
//! payload. Scope filtering of discovered links is left to the caller.

mod links;
mod model;
mod part;

pub use links::{manufacturer_part_from_slug, truncate_chars};

use crate::state::PageKind;
use crate::url::{classify, SiteScope};
use serde::Serialize;
use std::collections::HashSet;

/// A part referenced by a model page or described by its own detail page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPart {
    pub partselect_number: String,
    pub part_url: String,
    pub name: Option<String>,
    pub manufacturer_part_number: Option<String>,
    pub price_value: Option<f64>,
}

/// A video or instruction link attached to a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelMedia {
    /// `video` or `instruction`
    pub media_type: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// An appliance model and everything its page lists
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedModel {
    pub model_number: String,
    pub brand: Option<String>,
    pub appliance_type: String,
    /// Compatible parts in page order, one entry per part number
    pub parts: Vec<ParsedPart>,
    pub symptoms: Vec<String>,
    pub media: Vec<ModelMedia>,
    pub qa: Vec<QaPair>,
}

/// Result of extracting one page
///
/// At most one of `model` and `part` is set, matching `page_kind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPage {
    pub page_kind: PageKind,
    pub model: Option<ParsedModel>,
    pub part: Option<ParsedPart>,
    /// Canonical site links found on the page, unfiltered by scope
    pub discovered_urls: Vec<String>,
}

/// Extractor bound to one target site
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    site: SiteScope,
}

impl Extractor {
    pub fn new(site: SiteScope) -> Self {
        Self { site }
    }

    pub fn site(&self) -> &SiteScope {
        &self.site
    }

    /// Extracts structured entities and discovered links from a page
    ///
    /// # Arguments
    ///
    /// * `url` - The page URL (canonical or raw)
    /// * `content` - Page content as Markdown
    /// * `title` - Page title, used for the model brand and appliance type
    pub fn extract(&self, url: &str, content: &str, title: &str) -> ParsedPage {
        let page_kind = classify(url);

        let (model, part) = match page_kind {
            PageKind::Model => (
                model::parse_model_page(url, content, title, &self.site),
                None,
            ),
            PageKind::Part => (None, part::parse_part_page(url, content, &self.site)),
            PageKind::Repair | PageKind::Other => (None, None),
        };

        ParsedPage {
            page_kind,
            model,
            part,
            discovered_urls: self.discovered_urls(content),
        }
    }

    fn discovered_urls(&self, content: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        links::site_links(content, &self.site)
            .into_iter()
            .map(|link| self.site.canonicalize(link.href))
            .filter(|url| !url.is_empty() && seen.insert(url.clone()))
            .collect()
    }
}

/// Extracts a page against the default target site
pub fn extract(url: &str, content: &str, title: &str) -> ParsedPage {
    Extractor::default().extract(url, content, title)
}
