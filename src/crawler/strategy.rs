//! Best-of-N fetch strategy selection
//!
//! Different pages render usable content at different fetch fidelities, so
//! every URL is fetched once per strategy and the attempt with the most words
//! wins. Word count is only a proxy: a verbose boilerplate render can beat a
//! short accurate one.

use crate::crawler::fetcher::{FetchError, FetchProfile, PageFetcher};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// A named fetch configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchStrategy {
    pub name: String,
    pub profile: FetchProfile,
}

impl FetchStrategy {
    pub fn new(name: &str, profile: FetchProfile) -> Self {
        Self {
            name: name.to_string(),
            profile,
        }
    }
}

/// The strategies tried for every page, in increasing specificity
pub fn default_strategies() -> Vec<FetchStrategy> {
    vec![
        FetchStrategy::new("baseline", FetchProfile::baseline()),
        FetchStrategy::new("wait_body", FetchProfile::baseline().with_wait_for("body")),
        FetchStrategy::new(
            "selector_article",
            FetchProfile::baseline()
                .with_wait_for("body")
                .with_css_selector("article, main, body"),
        ),
    ]
}

/// Outcome of one strategy against one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub strategy: String,
    pub success: bool,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    pub title: String,
    pub word_count: usize,
    pub error: Option<String>,
}

impl FetchAttempt {
    fn failed(strategy: &str, error: String) -> Self {
        Self {
            strategy: strategy.to_string(),
            success: false,
            content: String::new(),
            metadata: BTreeMap::new(),
            title: String::new(),
            word_count: 0,
            error: Some(error),
        }
    }
}

async fn attempt(
    fetcher: &dyn PageFetcher,
    url: &str,
    strategy: &FetchStrategy,
    timeout: Duration,
) -> FetchAttempt {
    let result = match tokio::time::timeout(timeout, fetcher.fetch(url, &strategy.profile)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    };

    match result {
        Ok(page) => {
            let word_count = page.markdown.split_whitespace().count();
            let title = page.title().to_string();
            FetchAttempt {
                strategy: strategy.name.clone(),
                success: page.success,
                content: page.markdown,
                metadata: page.metadata,
                title,
                word_count,
                error: if page.success {
                    None
                } else {
                    Some(page.error.unwrap_or_else(|| "fetch failed".to_string()))
                },
            }
        }
        Err(e) => FetchAttempt::failed(&strategy.name, e.to_string()),
    }
}

/// Runs every strategy against `url` and returns the best attempt
///
/// All strategies run, in order. Among successful attempts the largest word
/// count wins and ties keep the earliest. If no attempt succeeds the first
/// attempt is returned unchanged, for diagnostics.
///
/// # Arguments
///
/// * `fetcher` - The fetch collaborator
/// * `url` - The URL to fetch
/// * `strategies` - Strategies in declared order
/// * `attempt_timeout` - Upper bound on each attempt
pub async fn fetch_best(
    fetcher: &dyn PageFetcher,
    url: &str,
    strategies: &[FetchStrategy],
    attempt_timeout: Duration,
) -> FetchAttempt {
    let mut first: Option<FetchAttempt> = None;
    let mut best: Option<FetchAttempt> = None;

    for strategy in strategies {
        let candidate = attempt(fetcher, url, strategy, attempt_timeout).await;
        debug!(
            url,
            strategy = %candidate.strategy,
            success = candidate.success,
            word_count = candidate.word_count,
            "fetch attempt"
        );

        if candidate.success
            && best
                .as_ref()
                .map_or(true, |b| candidate.word_count > b.word_count)
        {
            best = Some(candidate.clone());
        }
        if first.is_none() {
            first = Some(candidate);
        }
    }

    best.or(first)
        .unwrap_or_else(|| FetchAttempt::failed("none", "no fetch strategies configured".to_string()))
}
