//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `FrontierStatus`: lifecycle of a URL in the durable crawl frontier
//! - `PageKind`: what a URL points at (model, part, repair, other)
//! - `PageStatus`: outcome recorded for the last fetch of a page

mod frontier_state;
mod page;

// Re-export main types
pub use frontier_state::FrontierStatus;
pub use page::{PageKind, PageStatus};
