//! Output module for run statistics and progress reporting
//!
//! This module handles:
//! - Live per-run counters shared by workers
//! - The JSON snapshot printed at the end of a run
//! - Progress reports read back from the database

pub mod stats;

pub use stats::{load_progress, print_progress, CrawlStats, CrawlStatsSnapshot, ProgressReport};
