//! Crawler module for page fetching and run coordination
//!
//! This module contains the core crawling logic, including:
//! - The fetch collaborator seam and its HTTP implementation
//! - HTML to Markdown rendering
//! - Best-of-N fetch strategy selection
//! - The worker loop and overall run coordination

mod coordinator;
mod fetcher;
mod render;
mod strategy;
mod worker;

pub use coordinator::{run_ingestion, Coordinator, RunSummary, RUN_MODE};
pub use fetcher::{build_http_client, FetchError, FetchProfile, FetchedPage, HttpFetcher, PageFetcher};
pub use render::{extract_title, render_page, RenderedPage};
pub use strategy::{default_strategies, fetch_best, FetchAttempt, FetchStrategy};
pub use worker::{run_worker, RunContext, WorkerExit};
