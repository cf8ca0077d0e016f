//! Integration tests for the ingestion pipeline

mod common;
mod crawl_tests;
mod fetcher_tests;
mod frontier_tests;
