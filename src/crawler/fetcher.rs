//! Page fetching
//!
//! This module defines the seam between the crawl loop and whatever turns a
//! URL into Markdown:
//! - The `PageFetcher` trait and the `FetchProfile` it is driven by
//! - Building HTTP clients with proper user agent strings
//! - `HttpFetcher`, the bundled reqwest + scraper + htmd implementation

use crate::config::UserAgentConfig;
use crate::crawler::render::render_page;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors raised by a fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// How a single fetch attempt renders the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchProfile {
    /// Selector that must be present for the attempt to succeed
    pub wait_for: Option<String>,

    /// Content selector; comma-separated alternatives, earliest match wins
    pub css_selector: Option<String>,

    /// Lines with fewer words are dropped
    pub word_count_threshold: usize,

    pub exclude_external_links: bool,

    pub exclude_social_media_links: bool,

    pub remove_overlay_elements: bool,
}

impl Default for FetchProfile {
    fn default() -> Self {
        Self::baseline()
    }
}

impl FetchProfile {
    /// Whole page, site links only, overlays removed
    pub fn baseline() -> Self {
        Self {
            wait_for: None,
            css_selector: None,
            word_count_threshold: 1,
            exclude_external_links: true,
            exclude_social_media_links: true,
            remove_overlay_elements: true,
        }
    }

    pub fn with_wait_for(mut self, selector: &str) -> Self {
        self.wait_for = Some(selector.to_string());
        self
    }

    pub fn with_css_selector(mut self, selector: &str) -> Self {
        self.css_selector = Some(selector.to_string());
        self
    }
}

/// Result of fetching one page with one profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    pub success: bool,
    pub markdown: String,
    /// Page metadata; `title` holds the document title when known
    pub metadata: BTreeMap<String, String>,
    pub error: Option<String>,
}

impl FetchedPage {
    /// A successful page with its Markdown and title
    pub fn ok(markdown: impl Into<String>, title: Option<&str>) -> Self {
        let mut metadata = BTreeMap::new();
        if let Some(title) = title {
            metadata.insert("title".to_string(), title.to_string());
        }
        Self {
            success: true,
            markdown: markdown.into(),
            metadata,
            error: None,
        }
    }

    /// A page the fetcher reached but could not render
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        self.metadata.get("title").map(String::as_str).unwrap_or("")
    }
}

/// External collaborator that turns a URL into Markdown
///
/// An `Err` and an unsuccessful `FetchedPage` are both attempt failures;
/// the strategy selector treats them the same way.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a single page by URL, rendered per `profile`.
    async fn fetch(&self, url: &str, profile: &FetchProfile) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use partselect_ingest::config::UserAgentConfig;
/// use partselect_ingest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "PartSelectIngest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages over HTTP and renders them locally
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, profile: &FetchProfile) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let mut metadata = BTreeMap::new();
        metadata.insert("status_code".to_string(), status.as_u16().to_string());
        metadata.insert("final_url".to_string(), final_url.to_string());
        metadata.insert("content_type".to_string(), content_type);

        if !status.is_success() {
            debug!(url, status = status.as_u16(), "non-success response");
            return Ok(FetchedPage {
                metadata,
                ..FetchedPage::failed(format!("HTTP {}", status.as_u16()))
            });
        }

        let body = response.text().await?;

        let page = match render_page(&body, &final_url, profile) {
            Ok(rendered) => {
                if let Some(title) = rendered.title {
                    metadata.insert("title".to_string(), title);
                }
                FetchedPage {
                    success: true,
                    markdown: rendered.markdown,
                    metadata,
                    error: None,
                }
            }
            Err(error) => FetchedPage {
                metadata,
                ..FetchedPage::failed(error)
            },
        };

        Ok(page)
    }
}
