//! Testing utilities including mock implementations.
//!
//! These let applications and tests drive the pipeline without touching
//! Reddit, market-data providers or a webhook.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{
    ForumError, ForumResult, NotifyError, NotifyResult, ProviderError, ProviderResult,
    SummaryError,
};
use crate::traits::{
    ForumSource, NameProvider, Notifier, QuoteProvider, Summarizer, SummaryContext,
};
use crate::types::{PriceInfo, ThreadContent, ThreadSummary};

/// A mock forum for testing.
///
/// Serves predefined threads per section without network access.
#[derive(Default)]
pub struct MockForum {
    /// Threads by section
    threads: Arc<RwLock<HashMap<String, Vec<ThreadContent>>>>,

    /// Sections whose listing fails
    fail_sections: Arc<RwLock<HashSet<String>>>,

    /// Thread ids whose fetch fails
    fail_threads: Arc<RwLock<HashSet<String>>>,

    /// Artificial latency per thread fetch
    fetch_delay: Option<Duration>,

    /// Fetches currently running, and the highest value seen
    active_fetches: Arc<AtomicUsize>,
    peak_fetches: Arc<AtomicUsize>,

    /// Call tracking
    calls: Arc<RwLock<Vec<MockForumCall>>>,
}

/// Record of a call made to the mock forum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockForumCall {
    Listing { section: String },
    Fetch { section: String, id: String },
}

impl MockForum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a thread to a section.
    pub fn with_thread(self, section: impl Into<String>, thread: ThreadContent) -> Self {
        self.threads
            .write()
            .unwrap()
            .entry(section.into())
            .or_default()
            .push(thread);
        self
    }

    /// Add a thread created just now whose title is `text`.
    pub fn with_post(self, section: impl Into<String>, id: impl Into<String>, text: &str) -> Self {
        self.with_thread(section, ThreadContent::new(id, text, Utc::now()))
    }

    /// Register a section with no threads.
    pub fn with_section(self, section: impl Into<String>) -> Self {
        self.threads
            .write()
            .unwrap()
            .entry(section.into())
            .or_default();
        self
    }

    /// Make a section's listing fail.
    pub fn fail_section(self, section: impl Into<String>) -> Self {
        self.fail_sections.write().unwrap().insert(section.into());
        self
    }

    /// Make a thread fetch fail.
    pub fn fail_thread(self, id: impl Into<String>) -> Self {
        self.fail_threads.write().unwrap().insert(id.into());
        self
    }

    /// Delay every thread fetch.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockForumCall> {
        self.calls.read().unwrap().clone()
    }

    /// Sections whose listing was requested, in call order.
    pub fn listing_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockForumCall::Listing { section } => Some(section),
                _ => None,
            })
            .collect()
    }

    /// Thread ids fetched, in call order.
    pub fn fetch_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockForumCall::Fetch { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Highest number of thread fetches observed running at once.
    pub fn peak_concurrent_fetches(&self) -> usize {
        self.peak_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ForumSource for MockForum {
    async fn recent_threads(&self, section: &str, limit: u32) -> ForumResult<Vec<ThreadSummary>> {
        self.calls.write().unwrap().push(MockForumCall::Listing {
            section: section.to_string(),
        });

        if self.fail_sections.read().unwrap().contains(section) {
            return Err(ForumError::Unavailable(format!("mock listing failure: {}", section)));
        }

        let mut threads: Vec<ThreadSummary> = self
            .threads
            .read()
            .unwrap()
            .get(section)
            .map(|threads| {
                threads
                    .iter()
                    .map(|t| ThreadSummary::new(&t.id, section, &t.title, t.created_at))
                    .collect()
            })
            .unwrap_or_default();

        threads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        threads.truncate(limit as usize);
        Ok(threads)
    }

    async fn fetch_thread(&self, section: &str, id: &str) -> ForumResult<ThreadContent> {
        self.calls.write().unwrap().push(MockForumCall::Fetch {
            section: section.to_string(),
            id: id.to_string(),
        });

        let active = self.active_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_fetches.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        self.active_fetches.fetch_sub(1, Ordering::SeqCst);

        if self.fail_threads.read().unwrap().contains(id) {
            return Err(ForumError::Unavailable(format!("mock fetch failure: {}", id)));
        }

        self.threads
            .read()
            .unwrap()
            .get(section)
            .and_then(|threads| threads.iter().find(|t| t.id == id).cloned())
            .ok_or_else(|| ForumError::NotFound(format!("{}/{}", section, id)))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A mock company-name provider.
pub struct MockNameProvider {
    label: String,
    names: Arc<RwLock<HashMap<String, String>>>,
    search_names: Arc<RwLock<HashMap<String, String>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    delay: Option<Duration>,
    calls: Arc<RwLock<Vec<String>>>,
    search_calls: Arc<RwLock<Vec<String>>>,
}

impl MockNameProvider {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            names: Arc::default(),
            search_names: Arc::default(),
            failing: Arc::default(),
            delay: None,
            calls: Arc::default(),
            search_calls: Arc::default(),
        }
    }

    /// Answer `symbol` with `name`.
    pub fn with_name(self, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.write().unwrap().insert(symbol.into(), name.into());
        self
    }

    /// Answer `symbol` only from the search step. Any search name makes
    /// the mock report a search step.
    pub fn with_search_name(self, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        self.search_names
            .write()
            .unwrap()
            .insert(symbol.into(), name.into());
        self
    }

    /// Return an error for every direct lookup of `symbol`.
    pub fn fail_symbol(self, symbol: impl Into<String>) -> Self {
        self.failing.write().unwrap().insert(symbol.into());
        self
    }

    /// Delay every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Symbols looked up directly, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    /// Symbols searched, in call order.
    pub fn search_calls(&self) -> Vec<String> {
        self.search_calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl NameProvider for MockNameProvider {
    async fn lookup_name(&self, symbol: &str) -> ProviderResult<Option<String>> {
        self.calls.write().unwrap().push(symbol.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.read().unwrap().contains(symbol) {
            return Err(ProviderError::Api {
                provider: "mock",
                status: 503,
                message: "mock provider failure".into(),
            });
        }

        Ok(self.names.read().unwrap().get(symbol).cloned())
    }

    fn has_search(&self) -> bool {
        !self.search_names.read().unwrap().is_empty()
    }

    async fn search_name(&self, symbol: &str) -> ProviderResult<Option<String>> {
        self.search_calls.write().unwrap().push(symbol.to_string());
        Ok(self.search_names.read().unwrap().get(symbol).cloned())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// A mock quote provider.
#[derive(Default)]
pub struct MockQuoteProvider {
    quotes: Arc<RwLock<HashMap<String, PriceInfo>>>,
    headlines: Arc<RwLock<HashMap<String, Vec<String>>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockQuoteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(self, symbol: impl Into<String>, quote: PriceInfo) -> Self {
        self.quotes.write().unwrap().insert(symbol.into(), quote);
        self
    }

    /// Convenience for a quote with only a price and currency.
    pub fn with_price(self, symbol: impl Into<String>, price: f64) -> Self {
        self.with_quote(
            symbol,
            PriceInfo {
                price: Some(price),
                currency: Some("USD".into()),
                ..Default::default()
            },
        )
    }

    pub fn with_headlines(self, symbol: impl Into<String>, headlines: Vec<String>) -> Self {
        self.headlines
            .write()
            .unwrap()
            .insert(symbol.into(), headlines);
        self
    }

    /// Symbols quoted, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl QuoteProvider for MockQuoteProvider {
    async fn quote(&self, symbol: &str) -> ProviderResult<PriceInfo> {
        self.calls.write().unwrap().push(symbol.to_string());
        self.quotes
            .read()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| ProviderError::Parse {
                provider: "mock",
                message: format!("no quote for {}", symbol),
            })
    }

    async fn headlines(&self, symbol: &str) -> ProviderResult<Vec<String>> {
        Ok(self
            .headlines
            .read()
            .unwrap()
            .get(symbol)
            .cloned()
            .unwrap_or_default())
    }
}

/// A notifier that keeps every message it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Arc<RwLock<Vec<String>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every message (after recording it).
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.read().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> NotifyResult<()> {
        self.messages.write().unwrap().push(message.to_string());
        if self.fail {
            return Err(NotifyError::Rejected {
                status: 500,
                body: "mock webhook failure".into(),
            });
        }
        Ok(())
    }
}

/// A summarizer returning a fixed synopsis and recording its inputs.
#[derive(Default)]
pub struct MockSummarizer {
    synopsis: String,
    contexts: Arc<RwLock<Vec<SummaryContext>>>,
}

impl MockSummarizer {
    pub fn new(synopsis: impl Into<String>) -> Self {
        Self {
            synopsis: synopsis.into(),
            contexts: Arc::default(),
        }
    }

    pub fn contexts(&self) -> Vec<SummaryContext> {
        self.contexts.read().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, context: &SummaryContext) -> Result<String, SummaryError> {
        self.contexts.write().unwrap().push(context.clone());
        Ok(self.synopsis.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_forum_lists_newest_first() {
        let now = Utc::now();
        let forum = MockForum::new()
            .with_thread("stocks", ThreadContent::new("old", "old", now - chrono::Duration::hours(2)))
            .with_thread("stocks", ThreadContent::new("new", "new", now));

        let threads = forum.recent_threads("stocks", 10).await.unwrap();
        let ids: Vec<_> = threads.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);

        let limited = forum.recent_threads("stocks", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_mock_forum_failures() {
        let forum = MockForum::new()
            .with_post("stocks", "t1", "GME")
            .fail_section("wallstreetbets")
            .fail_thread("t1");

        assert!(forum.recent_threads("wallstreetbets", 10).await.is_err());
        assert!(forum.fetch_thread("stocks", "t1").await.is_err());
        assert_eq!(forum.listing_calls(), vec!["wallstreetbets"]);
        assert_eq!(forum.fetch_calls(), vec!["t1"]);
    }

    #[tokio::test]
    async fn test_mock_name_provider() {
        let provider = MockNameProvider::new("primary")
            .with_name("GME", "GameStop Corp.")
            .fail_symbol("BAD");

        assert_eq!(
            provider.company_name("GME").await.unwrap(),
            Some("GameStop Corp.".to_string())
        );
        assert_eq!(provider.company_name("XYZ").await.unwrap(), None);
        assert!(provider.company_name("BAD").await.is_err());
        assert_eq!(provider.call_count(), 3);
        assert!(provider.search_calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_lookup_falls_back_to_search() {
        let provider = MockNameProvider::new("primary")
            .fail_symbol("GME")
            .with_search_name("GME", "GameStop Corp.");

        assert_eq!(
            provider.company_name("GME").await.unwrap(),
            Some("GameStop Corp.".to_string())
        );
        assert_eq!(provider.company_name("AMC").await.unwrap(), None);
        assert_eq!(provider.search_calls(), vec!["GME", "AMC"]);
    }

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = RecordingNotifier::failing();
        assert!(notifier.notify("hello").await.is_err());
        assert_eq!(notifier.messages(), vec!["hello"]);
    }
}
