//! Rate-limited wrapper for any external collaborator.
//!
//! Wraps a forum, provider or summarizer so every outbound call first
//! acquires a slot from the matching API budget.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Api, ApiRateLimits};
use crate::error::{ForumResult, ProviderResult, SummaryError};
use crate::traits::{ForumSource, NameProvider, QuoteProvider, Summarizer, SummaryContext};
use crate::types::{PriceInfo, ThreadContent, ThreadSummary};

/// A wrapper that waits for the `api` budget before delegating.
pub struct RateLimited<T> {
    inner: T,
    limits: Arc<ApiRateLimits>,
    api: Api,
}

impl<T> RateLimited<T> {
    pub fn new(inner: T, limits: Arc<ApiRateLimits>, api: Api) -> Self {
        Self { inner, limits, api }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    async fn wait_for_permit(&self) {
        self.limits.acquire(self.api).await;
    }
}

#[async_trait]
impl<T: ForumSource> ForumSource for RateLimited<T> {
    async fn recent_threads(&self, section: &str, limit: u32) -> ForumResult<Vec<ThreadSummary>> {
        self.wait_for_permit().await;
        self.inner.recent_threads(section, limit).await
    }

    async fn fetch_thread(&self, section: &str, id: &str) -> ForumResult<ThreadContent> {
        self.wait_for_permit().await;
        self.inner.fetch_thread(section, id).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[async_trait]
impl<T: NameProvider> NameProvider for RateLimited<T> {
    async fn lookup_name(&self, symbol: &str) -> ProviderResult<Option<String>> {
        self.wait_for_permit().await;
        self.inner.lookup_name(symbol).await
    }

    fn has_search(&self) -> bool {
        self.inner.has_search()
    }

    async fn search_name(&self, symbol: &str) -> ProviderResult<Option<String>> {
        self.wait_for_permit().await;
        self.inner.search_name(symbol).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[async_trait]
impl<T: QuoteProvider> QuoteProvider for RateLimited<T> {
    async fn quote(&self, symbol: &str) -> ProviderResult<PriceInfo> {
        self.wait_for_permit().await;
        self.inner.quote(symbol).await
    }

    async fn headlines(&self, symbol: &str) -> ProviderResult<Vec<String>> {
        self.wait_for_permit().await;
        self.inner.headlines(symbol).await
    }
}

#[async_trait]
impl<T: Summarizer> Summarizer for RateLimited<T> {
    async fn summarize(&self, context: &SummaryContext) -> Result<String, SummaryError> {
        self.wait_for_permit().await;
        self.inner.summarize(context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::{Budget, RateLimitConfig};
    use crate::testing::{MockForum, MockNameProvider, MockSummarizer};
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_forum_calls_consume_forum_budget() {
        let limits = Arc::new(ApiRateLimits::new(
            &RateLimitConfig::default().with_forum(Budget::new(2, Duration::from_secs(30))),
        ));
        let forum = RateLimited::new(MockForum::new(), Arc::clone(&limits), Api::Forum);
        let start = Instant::now();

        forum.recent_threads("stocks", 10).await.unwrap();
        forum.recent_threads("stocks", 10).await.unwrap();
        forum.recent_threads("stocks", 10).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert_eq!(forum.inner().listing_calls().len(), 3);
        assert_eq!(limits.limiter(Api::MarketData).in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_name_search_fallback_takes_its_own_permit() {
        let limits = Arc::new(ApiRateLimits::new(
            &RateLimitConfig::default().with_market_data(Budget::new(1, Duration::from_secs(60))),
        ));
        let provider = RateLimited::new(
            MockNameProvider::new("primary").with_search_name("GME", "GameStop Corp."),
            Arc::clone(&limits),
            Api::MarketData,
        );
        let start = Instant::now();

        let name = provider.company_name("GME").await.unwrap();

        assert_eq!(name.as_deref(), Some("GameStop Corp."));
        assert_eq!(provider.inner().calls(), vec!["GME"]);
        assert_eq!(provider.inner().search_calls(), vec!["GME"]);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_hit_skips_search() {
        let limits = Arc::new(ApiRateLimits::new(
            &RateLimitConfig::default().with_market_data(Budget::new(1, Duration::from_secs(60))),
        ));
        let provider = RateLimited::new(
            MockNameProvider::new("primary")
                .with_name("GME", "GameStop Corp.")
                .with_search_name("GME", "GameStop"),
            Arc::clone(&limits),
            Api::MarketData,
        );
        let start = Instant::now();

        let name = provider.company_name("GME").await.unwrap();

        assert_eq!(name.as_deref(), Some("GameStop Corp."));
        assert!(provider.inner().search_calls().is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limits.limiter(Api::MarketData).in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_summarizer_waits_for_summarization_budget() {
        let limits = Arc::new(ApiRateLimits::new(
            &RateLimitConfig::default()
                .with_summarization(Budget::new(1, Duration::from_secs(120))),
        ));
        let mock = Arc::new(MockSummarizer::new("synopsis"));
        let shared: Arc<dyn Summarizer> = mock.clone();
        let summarizer = RateLimited::new(shared, Arc::clone(&limits), Api::Summarization);
        let context = SummaryContext::new("GME");
        let start = Instant::now();

        summarizer.summarize(&context).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
        summarizer.summarize(&context).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(120));
        assert_eq!(mock.contexts().len(), 2);
    }
}
