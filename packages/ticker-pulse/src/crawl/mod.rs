//! Concurrent forum crawl producing per-symbol mention counts.

mod coordinator;
mod inspect;
pub mod matcher;

pub use coordinator::CrawlCoordinator;
pub use inspect::{inspect_symbol, MentionReport, ThreadMentions};
pub use matcher::{SymbolMatcher, VariantMatcher};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Threads created before `now - lookback` are skipped
    pub lookback: Duration,

    /// Sections crawled at once
    pub section_workers: usize,

    /// Threads fetched at once within one section
    pub thread_workers: usize,

    /// Threads requested per section listing
    pub listing_limit: u32,

    /// Characters of thread text scanned for symbols
    pub max_text_len: usize,

    /// A symbol is relevant when its total count exceeds this
    pub relevance_threshold: u64,

    /// Upper bound on one section's crawl
    pub section_timeout: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            lookback: Duration::from_secs(24 * 60 * 60),
            section_workers: 4,
            thread_workers: 8,
            listing_limit: 100,
            max_text_len: matcher::DEFAULT_MAX_TEXT_LEN,
            relevance_threshold: 5,
            section_timeout: Duration::from_secs(600),
        }
    }
}

impl CrawlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn with_section_workers(mut self, workers: usize) -> Self {
        self.section_workers = workers;
        self
    }

    pub fn with_thread_workers(mut self, workers: usize) -> Self {
        self.thread_workers = workers;
        self
    }

    pub fn with_listing_limit(mut self, limit: u32) -> Self {
        self.listing_limit = limit;
        self
    }

    pub fn with_max_text_len(mut self, len: usize) -> Self {
        self.max_text_len = len;
        self
    }

    pub fn with_relevance_threshold(mut self, threshold: u64) -> Self {
        self.relevance_threshold = threshold;
        self
    }

    pub fn with_section_timeout(mut self, timeout: Duration) -> Self {
        self.section_timeout = timeout;
        self
    }

    /// Oldest creation time still inside the lookback window.
    pub(crate) fn cutoff(&self, now: chrono::DateTime<chrono::Utc>) -> chrono::DateTime<chrono::Utc> {
        chrono::Duration::from_std(self.lookback)
            .ok()
            .and_then(|lookback| now.checked_sub_signed(lookback))
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC)
    }
}
