//! Ticker Pulse
//!
//! Counts stock-ticker mentions across Reddit communities, keeps a
//! run-over-run baseline of those counts and raises an alert when a
//! symbol's mention activity spikes.
//!
//! # Pipeline
//!
//! 1. [`crawl`] lists recent threads per subreddit and counts symbol
//!    mentions with a bounded pool of workers, reducing into a [`Run`]
//! 2. [`store`] persists every run and the stats snapshot as JSON files
//! 3. [`resolver`] maps relevant symbols to company names through a
//!    persistent cache, a local table and raced market-data providers
//! 4. [`trigger`] compares the run against the previous snapshot
//! 5. [`notify`] formats and delivers the alert
//! 6. [`archive`] moves the run's log away without keeping duplicates
//!
//! Every outbound API call waits on a sliding-window budget from
//! [`limiter`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ticker_pulse::{ApiRateLimits, Pipeline, PulseConfig};
//!
//! let config = PulseConfig::from_env()?;
//! let limits = Arc::new(ApiRateLimits::new(&config.rate_limits));
//! let report = Pipeline::from_config(&config, limits)?.run_once().await?;
//! println!("{} triggers", report.triggers.len());
//! ```

pub mod archive;
pub mod config;
pub mod crawl;
pub mod credentials;
pub mod error;
pub mod forums;
pub mod limiter;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod providers;
pub mod resolver;
pub mod store;
pub mod tabular;
pub mod testing;
pub mod traits;
pub mod trigger;
pub mod types;
pub mod universe;

pub use archive::{ArchiveOutcome, ArchivedLogEntry, LogArchiver};
pub use config::PulseConfig;
pub use crawl::{inspect_symbol, CrawlConfig, CrawlCoordinator, MentionReport, SymbolMatcher};
pub use credentials::{RedditCredentials, SecretString};
pub use error::{
    ArchiveError, ForumError, NotifyError, ProviderError, PulseError, Result, StoreError,
    SummaryError,
};
pub use limiter::{Api, ApiRateLimits, Budget, RateLimitConfig, RateLimited, SlidingWindowLimiter};
pub use notify::{AlertMessage, DiscordWebhook, NotifyConfig};
pub use pipeline::{Pipeline, PipelineOptions, RunReport};
pub use resolver::{NameResolver, Resolution, ResolverConfig};
pub use store::{NameCacheStore, RunStore, SnapshotStore};
pub use traits::{
    ForumSource, NameProvider, NoopSummarizer, Notifier, QuoteProvider, Summarizer,
    SummaryContext,
};
pub use trigger::{evaluate, TriggerEngine, TriggerThresholds};
pub use types::{
    NameCache, NameEntry, NameSource, PriceInfo, Run, RunId, StatsSnapshot, SubredditResult,
    ThreadContent, ThreadSummary, Trigger,
};
pub use universe::SymbolUniverse;
