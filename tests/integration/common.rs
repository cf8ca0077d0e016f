//! Shared fixtures: a scripted fetcher and a small catalog of pages

use async_trait::async_trait;
use partselect_ingest::config::{
    Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig,
};
use partselect_ingest::crawler::{FetchError, FetchProfile, FetchedPage, PageFetcher};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

pub const SEED: &str = "https://www.partselect.com/Dishwasher-Parts.htm";
pub const MODEL: &str = "https://www.partselect.com/Models/WDT780SAEM1";
pub const RACK: &str = "https://www.partselect.com/PS3406971-Whirlpool-W10195416-Lower-Rack.htm";
pub const WHEEL: &str = "https://www.partselect.com/PS3406972-Whirlpool-W10195417-Wheel.htm";
pub const BRANDS: &str = "https://www.partselect.com/Brands";

/// Callback run inside a fetch, keyed by URL
pub type FetchHook = Box<dyn Fn() + Send + Sync>;

/// Serves canned Markdown per canonical URL; anything else is a 404
pub struct ScriptedFetcher {
    pages: HashMap<String, (String, String)>,
    errors: HashMap<String, String>,
    hooks: HashMap<String, FetchHook>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            errors: HashMap::new(),
            hooks: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn page(mut self, url: &str, title: &str, markdown: &str) -> Self {
        self.pages
            .insert(url.to_string(), (title.to_string(), markdown.to_string()));
        self
    }

    pub fn error(mut self, url: &str, error: &str) -> Self {
        self.errors.insert(url.to_string(), error.to_string());
        self
    }

    pub fn hook(mut self, url: &str, hook: FetchHook) -> Self {
        self.hooks.insert(url.to_string(), hook);
        self
    }

    /// Distinct URLs fetched so far
    pub fn fetched_urls(&self) -> Vec<String> {
        let mut urls = self.calls.lock().unwrap().clone();
        urls.sort();
        urls.dedup();
        urls
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _profile: &FetchProfile) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(hook) = self.hooks.get(url) {
            hook();
        }
        if let Some(error) = self.errors.get(url) {
            return Err(FetchError::Other(error.clone()));
        }
        match self.pages.get(url) {
            Some((title, markdown)) => Ok(FetchedPage::ok(markdown.clone(), Some(title.as_str()))),
            None => Ok(FetchedPage::failed("HTTP 404")),
        }
    }
}

/// A category page, one model page, two part pages and a broken brands page
pub fn catalog() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .page(
            SEED,
            "Dishwasher Parts",
            "\
# Dishwasher Parts
[WDT780SAEM1](https://www.partselect.com/Models/WDT780SAEM1/)
[Brands](https://www.partselect.com/Brands/)
[Blog](https://www.partselect.com/blog/dishwashers/)
[Elsewhere](https://www.example.com/Models/X/)
",
        )
        .page(
            MODEL,
            "Whirlpool Dishwasher WDT780SAEM1",
            "\
# Whirlpool WDT780SAEM1 Dishwasher
## Parts for the WDT780SAEM1
[Rack](https://www.partselect.com/PS3406971-Whirlpool-W10195416-Lower-Rack.htm)
[Wheel](https://www.partselect.com/PS3406972-Whirlpool-W10195417-Wheel.htm)
## Common Symptoms
",
        )
        .page(RACK, "Lower Rack", "# Dishwasher Lower Rack\nOur price: $24.99")
        .page(WHEEL, "Wheel", "# Dishwasher Rack Wheel\nOur price: $8.50")
        .error(BRANDS, "connection reset")
}

/// A fast-draining configuration writing to `db_path`
pub fn test_config(db_path: &Path, seeds: &[&str]) -> Config {
    Config {
        crawler: CrawlerConfig {
            concurrency: 3,
            idle_poll_ms: 10,
            max_idle_polls: 3,
            fetch_timeout_secs: 5,
            ..CrawlerConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().into_owned(),
        },
        site: SiteConfig {
            seeds: seeds.iter().map(|s| s.to_string()).collect(),
            ..SiteConfig::default()
        },
    }
}

pub fn count(db_path: &Path, table: &str) -> i64 {
    let conn = Connection::open(db_path).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })
    .unwrap()
}

pub fn frontier_status(db_path: &Path, url: &str) -> Option<String> {
    let conn = Connection::open(db_path).unwrap();
    conn.query_row(
        "SELECT status FROM crawl_frontier WHERE url_canonical = ?1",
        [url],
        |row| row.get(0),
    )
    .ok()
}
