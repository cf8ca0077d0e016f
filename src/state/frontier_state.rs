/// Frontier status definitions for tracking crawl progress
///
/// This module defines every status a frontier entry can be in, plus the
/// rules enqueue and resume reconciliation apply to them.
use serde::Serialize;
use std::fmt;

/// Represents the current status of a URL in the crawl frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontierStatus {
    // ===== Active States =====
    /// URL is waiting to be claimed by a worker
    Queued,

    /// URL is claimed by exactly one worker
    Processing,

    // ===== Terminal States =====
    /// URL was fetched, parsed and persisted
    Done,

    /// Every fetch strategy failed for this URL
    Failed,
}

impl FrontierStatus {
    /// Returns true if the entry still counts towards pending work
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }

    /// Returns true if a non-forced enqueue must leave this status untouched
    pub fn is_sticky(&self) -> bool {
        matches!(self, Self::Done | Self::Processing)
    }

    /// Returns true for a failed entry that has used up `retry_limit` attempts
    ///
    /// With no limit a failure is never exhausted.
    pub fn retries_exhausted(&self, attempts: u32, retry_limit: Option<u32>) -> bool {
        *self == Self::Failed && retry_limit.is_some_and(|limit| attempts >= limit)
    }

    /// Decides what an enqueue does to an existing entry
    ///
    /// # Returns
    ///
    /// * `Some(Queued)` - The entry goes back to the queue
    /// * `None` - Only its discovery metadata is refreshed
    pub fn on_enqueue(
        &self,
        attempts: u32,
        forced: bool,
        retry_limit: Option<u32>,
    ) -> Option<FrontierStatus> {
        if forced {
            return Some(Self::Queued);
        }
        if self.is_sticky() || self.retries_exhausted(attempts, retry_limit) {
            None
        } else {
            Some(Self::Queued)
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible frontier statuses
    pub fn all_states() -> Vec<Self> {
        vec![Self::Queued, Self::Processing, Self::Done, Self::Failed]
    }
}

impl fmt::Display for FrontierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
