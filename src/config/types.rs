use crate::url::{SiteScope, DEFAULT_ALLOWED_PATHS, DEFAULT_APEX_ALIAS, DEFAULT_HOST};
use serde::{Deserialize, Serialize};

/// Allow-listed listing and brand pages the crawl starts from
pub const DEFAULT_SEEDS: &[&str] = &[
    "https://www.partselect.com/Appliance-Parts.htm",
    "https://www.partselect.com/Dishwasher-Parts.htm",
    "https://www.partselect.com/Refrigerator-Parts.htm",
    "https://www.partselect.com/Washer-Parts.htm",
    "https://www.partselect.com/Dryer-Parts.htm",
    "https://www.partselect.com/Range-Parts.htm",
    "https://www.partselect.com/Microwave-Parts.htm",
    "https://www.partselect.com/Oven-Parts.htm",
    "https://www.partselect.com/Freezer-Parts.htm",
    "https://www.partselect.com/Ice-Machine-Parts.htm",
    "https://www.partselect.com/Trash-Compactor-Parts.htm",
    "https://www.partselect.com/Cooktop-Parts.htm",
    "https://www.partselect.com/Brands/",
    "https://www.partselect.com/Whirlpool-Dishwasher-Parts.htm",
    "https://www.partselect.com/Whirlpool-Refrigerator-Parts.htm",
    "https://www.partselect.com/Whirlpool-Washer-Parts.htm",
    "https://www.partselect.com/Whirlpool-Dryer-Parts.htm",
    "https://www.partselect.com/Whirlpool-Range-Parts.htm",
    "https://www.partselect.com/GE-Dishwasher-Parts.htm",
    "https://www.partselect.com/GE-Refrigerator-Parts.htm",
    "https://www.partselect.com/GE-Washer-Parts.htm",
    "https://www.partselect.com/GE-Dryer-Parts.htm",
    "https://www.partselect.com/GE-Range-Parts.htm",
    "https://www.partselect.com/Frigidaire-Dishwasher-Parts.htm",
    "https://www.partselect.com/Frigidaire-Refrigerator-Parts.htm",
    "https://www.partselect.com/Frigidaire-Washer-Parts.htm",
    "https://www.partselect.com/Frigidaire-Dryer-Parts.htm",
    "https://www.partselect.com/Frigidaire-Range-Parts.htm",
];

/// Main configuration structure for the ingestion pipeline
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    #[serde(rename = "concurrency", default = "default_concurrency")]
    pub concurrency: u32,

    /// Wall-clock budget for one run (hours)
    #[serde(rename = "max-runtime-hours", default = "default_max_runtime_hours")]
    pub max_runtime_hours: f64,

    /// Maximum number of pages fetched in one run
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u64,

    /// Force seed URLs back to queued even if already done
    #[serde(rename = "requeue-seeds-on-start", default)]
    pub requeue_seeds_on_start: bool,

    /// Keep the cleaned Markdown of every parsed page
    #[serde(rename = "save-markdown", default)]
    pub save_markdown: bool,

    /// Sleep between polls of an empty frontier (milliseconds)
    #[serde(rename = "idle-poll-ms", default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Consecutive polls finding nothing queued or in flight before a worker exits
    #[serde(rename = "max-idle-polls", default = "default_max_idle_polls")]
    pub max_idle_polls: u32,

    /// Timeout for a single fetch attempt (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Failed URLs with at least this many attempts are not retried on resume.
    /// Unset means failed URLs are always retried.
    #[serde(rename = "retry-limit", default)]
    pub retry_limit: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_runtime_hours: default_max_runtime_hours(),
            max_pages: default_max_pages(),
            requeue_seeds_on_start: false,
            save_markdown: false,
            idle_poll_ms: default_idle_poll_ms(),
            max_idle_polls: default_max_idle_polls(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            retry_limit: None,
        }
    }
}

fn default_concurrency() -> u32 {
    12
}

fn default_max_runtime_hours() -> f64 {
    48.0
}

fn default_max_pages() -> u64 {
    250_000
}

fn default_idle_poll_ms() -> u64 {
    1_000
}

fn default_max_idle_polls() -> u32 {
    5
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// The target site: host, alias, allow-listed paths and seed URLs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    #[serde(rename = "host", default = "default_host")]
    pub host: String,

    /// Apex domain rewritten onto `host`; empty disables aliasing
    #[serde(rename = "apex-alias", default = "default_apex_alias")]
    pub apex_alias: String,

    #[serde(rename = "allowed-paths", default = "default_allowed_paths")]
    pub allowed_paths: Vec<String>,

    #[serde(rename = "seeds", default = "default_seeds")]
    pub seeds: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            apex_alias: default_apex_alias(),
            allowed_paths: default_allowed_paths(),
            seeds: default_seeds(),
        }
    }
}

impl SiteConfig {
    /// Builds the scope filter for this site
    pub fn scope(&self) -> SiteScope {
        let alias = Some(self.apex_alias.as_str()).filter(|a| !a.trim().is_empty());
        SiteScope::new(&self.host, alias, self.allowed_paths.clone())
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_apex_alias() -> String {
    DEFAULT_APEX_ALIAS.to_string()
}

fn default_allowed_paths() -> Vec<String> {
    DEFAULT_ALLOWED_PATHS.iter().map(|p| p.to_string()).collect()
}

fn default_seeds() -> Vec<String> {
    DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect()
}
