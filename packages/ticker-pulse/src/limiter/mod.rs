//! Sliding-window rate limiting for outbound API calls.
//!
//! Each limiter keeps a log of admission instants. An attempt prunes the
//! entries older than the window; if the log is still full the caller
//! sleeps until the oldest entry leaves the window and tries again. The
//! lock is never held across the sleep.

mod rate_limited;

pub use rate_limited::RateLimited;

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// A call budget: at most `max_calls` admissions within any `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub max_calls: usize,
    pub period: Duration,
}

impl Budget {
    pub const fn new(max_calls: usize, period: Duration) -> Self {
        Self { max_calls, period }
    }
}

/// Sliding-window limiter shared by every caller of one API.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    budget: Budget,
    calls: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// A zero `max_calls` is treated as one.
    pub fn new(budget: Budget) -> Self {
        let budget = Budget::new(budget.max_calls.max(1), budget.period);
        Self {
            budget,
            calls: Mutex::new(VecDeque::with_capacity(budget.max_calls)),
        }
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// Wait until a call is admitted, then record it.
    pub async fn acquire(&self) {
        loop {
            let wait = match self.try_admit(Instant::now()) {
                None => return,
                Some(wait) => wait,
            };
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Admit immediately or return how long until the oldest call expires.
    fn try_admit(&self, now: Instant) -> Option<Duration> {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);

        while let Some(oldest) = calls.front() {
            if now.duration_since(*oldest) >= self.budget.period {
                calls.pop_front();
            } else {
                break;
            }
        }

        if calls.len() < self.budget.max_calls {
            calls.push_back(now);
            return None;
        }

        let oldest = calls.front().copied().unwrap_or(now);
        Some(self.budget.period.saturating_sub(now.duration_since(oldest)))
    }

    /// Calls currently inside the window.
    pub fn in_flight(&self) -> usize {
        let now = Instant::now();
        let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls
            .iter()
            .filter(|t| now.duration_since(**t) < self.budget.period)
            .count()
    }
}

/// The APIs the pipeline talks to, each with its own budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Api {
    Forum,
    MarketData,
    Summarization,
}

/// Per-API budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub forum: Budget,
    pub market_data: Budget,
    pub summarization: Budget,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            forum: Budget::new(50, Duration::from_secs(60)),
            market_data: Budget::new(25, Duration::from_secs(60)),
            summarization: Budget::new(1, Duration::from_secs(960)),
        }
    }
}

impl RateLimitConfig {
    pub fn with_forum(mut self, budget: Budget) -> Self {
        self.forum = budget;
        self
    }

    pub fn with_market_data(mut self, budget: Budget) -> Self {
        self.market_data = budget;
        self
    }

    pub fn with_summarization(mut self, budget: Budget) -> Self {
        self.summarization = budget;
        self
    }
}

/// One independent limiter per API.
#[derive(Debug)]
pub struct ApiRateLimits {
    forum: SlidingWindowLimiter,
    market_data: SlidingWindowLimiter,
    summarization: SlidingWindowLimiter,
}

impl ApiRateLimits {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            forum: SlidingWindowLimiter::new(config.forum),
            market_data: SlidingWindowLimiter::new(config.market_data),
            summarization: SlidingWindowLimiter::new(config.summarization),
        }
    }

    pub fn limiter(&self, api: Api) -> &SlidingWindowLimiter {
        match api {
            Api::Forum => &self.forum,
            Api::MarketData => &self.market_data,
            Api::Summarization => &self.summarization,
        }
    }

    pub async fn acquire(&self, api: Api) {
        self.limiter(api).acquire().await;
    }
}

impl Default for ApiRateLimits {
    fn default() -> Self {
        Self::new(&RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_admits_up_to_budget_without_waiting() {
        let limiter = SlidingWindowLimiter::new(Budget::new(3, Duration::from_secs(10)));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_flight(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_oldest_call_to_leave_window() {
        let limiter = SlidingWindowLimiter::new(Budget::new(2, Duration::from_secs(10)));
        let start = Instant::now();

        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(4)).await;
        limiter.acquire().await;
        limiter.acquire().await;

        // First call at t=0 leaves the window at t=10.
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_budget() {
        let limiter = Arc::new(SlidingWindowLimiter::new(Budget::new(
            5,
            Duration::from_secs(60),
        )));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..12 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                start.elapsed()
            }));
        }

        let mut admitted = Vec::new();
        for handle in handles {
            admitted.push(handle.await.unwrap());
        }
        admitted.sort();

        assert!(admitted[..5].iter().all(|t| *t == Duration::ZERO));
        assert!(admitted[5..10].iter().all(|t| *t == Duration::from_secs(60)));
        assert!(admitted[10..].iter().all(|t| *t == Duration::from_secs(120)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_budgets_are_independent() {
        let limits = ApiRateLimits::new(
            &RateLimitConfig::default()
                .with_forum(Budget::new(1, Duration::from_secs(60)))
                .with_market_data(Budget::new(1, Duration::from_secs(60))),
        );
        let start = Instant::now();

        limits.acquire(Api::Forum).await;
        limits.acquire(Api::MarketData).await;
        limits.acquire(Api::Summarization).await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limits.limiter(Api::Forum).in_flight(), 1);
    }

    #[test]
    fn test_default_budgets() {
        let config = RateLimitConfig::default();
        assert_eq!(config.forum, Budget::new(50, Duration::from_secs(60)));
        assert_eq!(config.market_data, Budget::new(25, Duration::from_secs(60)));
        assert_eq!(config.summarization, Budget::new(1, Duration::from_secs(960)));
    }

    #[test]
    fn test_zero_budget_admits_one() {
        let limiter = SlidingWindowLimiter::new(Budget::new(0, Duration::from_secs(1)));
        assert_eq!(limiter.budget().max_calls, 1);
    }
}
