//! HTML to Markdown rendering for fetched pages
//!
//! This module turns a fetched HTML document into the Markdown the extractor
//! works on:
//! - Enforce the profile's wait-for selector
//! - Narrow to the first matching content selector alternative
//! - Strip overlays, scripts and styles
//! - Convert to Markdown and resolve relative links
//! - Unlink external and social media links
//! - Drop lines below the word-count threshold

use crate::crawler::fetcher::FetchProfile;
use regex::{Captures, Regex};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

static MD_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)\s]*)\)").expect("valid markdown link regex"));

/// Elements dropped when overlay removal is requested
const OVERLAY_SELECTORS: &[&str] = &[
    "[role='dialog']",
    "[aria-modal='true']",
    ".modal",
    ".overlay",
    ".popup",
    ".cookie-banner",
    "#onetrust-consent-sdk",
];

/// Tags never rendered into Markdown
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg", "template"];

/// Hosts treated as social media
const SOCIAL_MEDIA_HOSTS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "youtube.com",
    "pinterest.com",
    "linkedin.com",
    "tiktok.com",
];

/// A page rendered to Markdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub title: Option<String>,
    pub markdown: String,
}

/// Renders an HTML document to Markdown following a fetch profile
///
/// # Arguments
///
/// * `html` - The HTML content
/// * `base_url` - The final URL of the page, for resolving relative links
/// * `profile` - Selectors and filters to apply
///
/// # Returns
///
/// * `Ok(RenderedPage)` - Title and Markdown
/// * `Err(String)` - The wait-for selector did not match, a selector was
///   invalid, or conversion failed
pub fn render_page(html: &str, base_url: &Url, profile: &FetchProfile) -> Result<RenderedPage, String> {
    let document = Html::parse_document(html);
    let title = extract_title(&document);

    if let Some(wait_for) = profile.wait_for.as_deref() {
        let selector = parse_selector(wait_for)?;
        if document.select(&selector).next().is_none() {
            return Err(format!("wait_for selector '{}' not found", wait_for));
        }
    }

    let mut content_html = match profile.css_selector.as_deref() {
        Some(css) => select_content(&document, css)?,
        None => document.root_element().html(),
    };

    if profile.remove_overlay_elements {
        content_html = remove_overlays(&content_html);
    }

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();
    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| format!("htmd conversion failed: {}", e))?;

    let markdown = rewrite_links(&raw_markdown, base_url, profile);
    let markdown = filter_short_lines(&markdown, profile.word_count_threshold);

    Ok(RenderedPage { title, markdown })
}

/// Extracts the page title from the HTML document
pub fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector '{}': {:?}", css, e))
}

/// Returns the HTML of the first element matching the earliest alternative
///
/// `"article, main, body"` prefers `<article>` over `<main>` over `<body>`
/// regardless of document order.
fn select_content(document: &Html, css: &str) -> Result<String, String> {
    for alternative in css.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let selector = parse_selector(alternative)?;
        if let Some(element) = document.select(&selector).next() {
            return Ok(element.html());
        }
    }
    Err(format!("css selector '{}' matched nothing", css))
}

fn remove_overlays(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut result = html.to_string();

    for css in OVERLAY_SELECTORS {
        if let Ok(selector) = Selector::parse(css) {
            for element in fragment.select(&selector) {
                result = result.replace(&element.html(), "");
            }
        }
    }

    result
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None for empty, fragment-only, `javascript:`, `mailto:`, `tel:`
/// and `data:` links.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}

fn is_social_host(host: &str) -> bool {
    SOCIAL_MEDIA_HOSTS
        .iter()
        .any(|social| host == *social || host.ends_with(&format!(".{}", social)))
}

/// Returns true if both hosts belong to the same site, ignoring `www.`
fn same_site(a: &str, b: &str) -> bool {
    a.trim_start_matches("www.") == b.trim_start_matches("www.")
}

fn rewrite_links(markdown: &str, base_url: &Url, profile: &FetchProfile) -> String {
    let base_host = base_url.host_str().unwrap_or_default().to_lowercase();

    MD_LINK_RE
        .replace_all(markdown, |caps: &Captures<'_>| {
            let text = &caps[1];
            let Some(url) = resolve_link(&caps[2], base_url) else {
                return text.to_string();
            };

            let host = url.host_str().unwrap_or_default().to_lowercase();
            let external = !same_site(&host, &base_host);
            if (profile.exclude_external_links && external)
                || (profile.exclude_social_media_links && is_social_host(&host))
            {
                return text.to_string();
            }

            format!("[{}]({})", text, url)
        })
        .into_owned()
}

fn filter_short_lines(markdown: &str, threshold: usize) -> String {
    if threshold <= 1 {
        return markdown.to_string();
    }

    markdown
        .lines()
        .filter(|line| line.trim().is_empty() || line.split_whitespace().count() >= threshold)
        .collect::<Vec<_>>()
        .join("\n")
}
