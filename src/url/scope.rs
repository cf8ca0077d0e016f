use crate::url::normalize::canonicalize_with_alias;

/// Host every canonical URL is rewritten to
pub const DEFAULT_HOST: &str = "www.partselect.com";

/// Apex alias mapped onto [`DEFAULT_HOST`]
pub const DEFAULT_APEX_ALIAS: &str = "partselect.com";

/// Path fragments that keep a URL inside the crawl
///
/// A path is in scope when it starts with, or contains, any of these.
pub const DEFAULT_ALLOWED_PATHS: &[&str] = &[
    "/Models/",
    "/PS",
    "/Dishwasher-Parts",
    "/Refrigerator-Parts",
    "/Washer-Parts",
    "/Dryer-Parts",
    "/Range-Parts",
    "/Microwave-Parts",
    "/Oven-Parts",
    "/Freezer-Parts",
    "/Ice-Machine-Parts",
    "/Trash-Compactor-Parts",
    "/Cooktop-Parts",
    "/Appliance-Parts",
    "/Repair/",
    "/Brands",
    "-Dishwasher-Parts",
    "-Refrigerator-Parts",
    "-Washer-Parts",
    "-Dryer-Parts",
    "-Range-Parts",
    "-Microwave-Parts",
    "-Oven-Parts",
    "-Freezer-Parts",
    "-Ice-Machine-Parts",
    "-Trash-Compactor-Parts",
    "-Cooktop-Parts",
];

/// The single site a crawl is confined to
///
/// Bounds the otherwise unbounded link graph: anything failing
/// [`SiteScope::is_in_scope`] is dropped before it reaches the frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteScope {
    host: String,
    apex_alias: Option<String>,
    allowed_paths: Vec<String>,
}

impl Default for SiteScope {
    fn default() -> Self {
        Self::new(
            DEFAULT_HOST,
            Some(DEFAULT_APEX_ALIAS),
            DEFAULT_ALLOWED_PATHS.iter().map(|p| p.to_string()).collect(),
        )
    }
}

impl SiteScope {
    /// Creates a scope for `host`, optionally aliasing an apex domain onto it
    pub fn new(host: &str, apex_alias: Option<&str>, allowed_paths: Vec<String>) -> Self {
        Self {
            host: host.trim().to_lowercase(),
            apex_alias: apex_alias
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty()),
            allowed_paths,
        }
    }

    /// The canonical host of the target site
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns true if `host` names the target site (canonical host or its alias)
    pub fn is_site_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        host == self.host || self.apex_alias.as_deref() == Some(host.as_str())
    }

    /// Canonicalizes a URL, mapping this site's apex alias onto its host
    ///
    /// Returns an empty string for unparseable input.
    pub fn canonicalize(&self, url: &str) -> String {
        let alias = self
            .apex_alias
            .as_deref()
            .map(|apex| (apex, self.host.as_str()));
        canonicalize_with_alias(url, alias)
    }

    /// Returns true if the URL belongs to the target site and an allow-listed path
    pub fn is_in_scope(&self, url: &str) -> bool {
        let canonical = self.canonicalize(url);
        if canonical.is_empty() {
            return false;
        }

        let prefix = format!("https://{}", self.host);
        let path = match canonical.strip_prefix(&prefix) {
            Some(rest) if rest.starts_with('/') => rest,
            _ => return false,
        };

        self.allowed_paths
            .iter()
            .any(|allowed| path.starts_with(allowed.as_str()) || path.contains(allowed.as_str()))
    }
}
