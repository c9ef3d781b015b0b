//! One pipeline invocation, end to end:
//!
//! crawl → persist run → hand-off read → resolve names → evaluate trends →
//! enrich with market data → alert → advance the snapshot.
//!
//! Only a missing or empty symbol universe, a failing run store or an
//! uncompilable matcher abort the invocation. Everything past the crawl
//! degrades instead of failing.

mod enrich;

pub use enrich::fetch_prices;

use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::PulseConfig;
use crate::crawl::CrawlCoordinator;
use crate::error::Result;
use crate::forums::RedditForum;
use crate::limiter::{Api, ApiRateLimits, RateLimited};
use crate::notify::{AlertMessage, DiscordWebhook, NotifyConfig, TickerDetail};
use crate::providers::{AlphaVantage, YahooFinance};
use crate::resolver::{NameResolver, Resolution};
use crate::store::{NameCacheStore, RunStore, SnapshotStore, DEFAULT_HANDOFF_TIMEOUT};
use crate::traits::{ForumSource, Notifier, QuoteProvider, Summarizer, SummaryContext};
use crate::trigger::{PendingCycle, TriggerEngine};
use crate::types::{PriceInfo, Run, RunId, Trigger};
use crate::universe::{default_blacklist, SymbolUniverse};

/// Inputs of a pipeline invocation that are not collaborators.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub sections: Vec<String>,
    pub symbols_file: PathBuf,
    pub blacklist: BTreeSet<String>,
    pub handoff_timeout: Duration,
    pub notify: NotifyConfig,
    /// Quotes fetched at once
    pub enrich_workers: usize,
}

impl PipelineOptions {
    pub fn new(sections: Vec<String>, symbols_file: impl Into<PathBuf>) -> Self {
        Self {
            sections,
            symbols_file: symbols_file.into(),
            blacklist: default_blacklist(),
            handoff_timeout: DEFAULT_HANDOFF_TIMEOUT,
            notify: NotifyConfig::default(),
            enrich_workers: 3,
        }
    }

    pub fn from_config(config: &PulseConfig) -> Self {
        Self {
            blacklist: config.blacklist.clone(),
            handoff_timeout: config.handoff_timeout,
            notify: config.notify.clone(),
            ..Self::new(config.subreddits.clone(), &config.symbols_file)
        }
    }

    pub fn with_blacklist(mut self, blacklist: BTreeSet<String>) -> Self {
        self.blacklist = blacklist;
        self
    }

    pub fn with_handoff_timeout(mut self, timeout: Duration) -> Self {
        self.handoff_timeout = timeout;
        self
    }

    pub fn with_notify(mut self, notify: NotifyConfig) -> Self {
        self.notify = notify;
        self
    }
}

/// What one invocation did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub posts_checked: u64,
    pub relevant: usize,
    pub resolved: usize,
    pub unresolved: Vec<String>,
    pub triggers: Vec<Trigger>,
    pub prices: BTreeMap<String, PriceInfo>,
    /// The alert text, when something triggered
    pub alert: Option<String>,
    pub notified: bool,
}

impl RunReport {
    pub fn is_triggered(&self) -> bool {
        !self.triggers.is_empty()
    }
}

pub struct Pipeline {
    options: PipelineOptions,
    crawler: CrawlCoordinator,
    resolver: NameResolver,
    runs: RunStore,
    engine: TriggerEngine,
    quotes: Option<Arc<dyn QuoteProvider>>,
    notifier: Option<Arc<dyn Notifier>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    limits: Option<Arc<ApiRateLimits>>,
}

impl Pipeline {
    pub fn new(
        options: PipelineOptions,
        crawler: CrawlCoordinator,
        resolver: NameResolver,
        runs: RunStore,
        engine: TriggerEngine,
    ) -> Self {
        Self {
            options,
            crawler,
            resolver,
            runs,
            engine,
            quotes: None,
            notifier: None,
            summarizer: None,
            limits: None,
        }
    }

    /// Wire the production collaborators from configuration. Every external
    /// API call goes through its budget in `limits`.
    pub fn from_config(config: &PulseConfig, limits: Arc<ApiRateLimits>) -> anyhow::Result<Self> {
        let forum: Arc<dyn ForumSource> = Arc::new(RateLimited::new(
            RedditForum::new(config.require_reddit()?),
            Arc::clone(&limits),
            Api::Forum,
        ));

        let yahoo = Arc::new(RateLimited::new(
            YahooFinance::new(),
            Arc::clone(&limits),
            Api::MarketData,
        ));

        let resolver = build_resolver(config, &limits)?.with_primary(yahoo.clone());

        let mut pipeline = Self::new(
            PipelineOptions::from_config(config),
            CrawlCoordinator::new(forum, config.crawl.clone()),
            resolver,
            RunStore::new(config.runs_dir()),
            TriggerEngine::new(SnapshotStore::new(config.stats_path()), config.thresholds),
        )
        .with_quotes(yahoo)
        .with_rate_limits(limits);

        if let Some(url) = &config.webhook_url {
            pipeline = pipeline.with_notifier(Arc::new(
                DiscordWebhook::new(url.clone()).with_max_len(config.notify.max_len),
            ));
        } else {
            info!("DISCORD_WEBHOOK_URL not set, alerts are only logged");
        }

        Ok(pipeline)
    }

    pub fn with_quotes(mut self, quotes: Arc<dyn QuoteProvider>) -> Self {
        self.quotes = Some(quotes);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Budgets for collaborators the pipeline wraps itself. The summarizer
    /// is metered by `Api::Summarization` once these are set.
    pub fn with_rate_limits(mut self, limits: Arc<ApiRateLimits>) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    /// Run the whole pipeline once.
    pub async fn run_once(&self) -> Result<RunReport> {
        let universe = SymbolUniverse::load(&self.options.symbols_file, &self.options.blacklist)?;

        let previous = self.runs.latest_id()?;
        let crawled = self.crawler.crawl(&self.options.sections, &universe).await?;
        self.runs.save(&crawled)?;

        let run = self
            .runs
            .wait_for_newer(previous.as_ref(), self.options.handoff_timeout)
            .await?
            .unwrap_or(crawled);

        let resolutions = self.resolver.resolve_batch(run.relevant.keys().cloned()).await;
        let unresolved: Vec<String> = resolutions
            .iter()
            .filter(|(_, r)| !r.is_resolved())
            .map(|(symbol, _)| symbol.clone())
            .collect();

        let pending = self.engine.begin(run.run_id.clone(), run.total_counts());

        let mut wanted: BTreeSet<String> = run
            .top_symbols(self.options.notify.top_n)
            .into_iter()
            .map(|(symbol, _)| symbol)
            .collect();
        wanted.extend(pending.triggers.iter().map(|t| t.symbol.clone()));
        let prices = match &self.quotes {
            Some(quotes) => fetch_prices(quotes.as_ref(), wanted, self.options.enrich_workers).await,
            None => BTreeMap::new(),
        };

        let alert = match pending.triggers.first() {
            Some(top) => Some(self.compose_alert(&run, &pending, top, &prices, &resolutions).await),
            None => {
                info!(run_id = %run.run_id, "No significant mention increase, no alert");
                None
            }
        };
        let notified = match &alert {
            Some(text) => self.deliver(text).await,
            None => false,
        };

        let triggers = pending.commit(prices.clone())?;

        let report = RunReport {
            run_id: run.run_id.clone(),
            posts_checked: run.total_posts_checked,
            relevant: run.relevant.len(),
            resolved: resolutions.len() - unresolved.len(),
            unresolved,
            triggers,
            prices,
            alert,
            notified,
        };
        info!(
            run_id = %report.run_id,
            posts = report.posts_checked,
            relevant = report.relevant,
            resolved = report.resolved,
            triggers = report.triggers.len(),
            notified = report.notified,
            "Pipeline run finished"
        );
        Ok(report)
    }

    /// Resolve names for the newest stored run's relevant symbols.
    pub async fn resolve_latest(&self) -> Result<Option<BTreeMap<String, Resolution>>> {
        let Some(run) = self.runs.latest()? else {
            return Ok(None);
        };
        Ok(Some(
            self.resolver.resolve_batch(run.relevant.keys().cloned()).await,
        ))
    }

    async fn compose_alert(
        &self,
        run: &Run,
        pending: &PendingCycle<'_>,
        top: &Trigger,
        prices: &BTreeMap<String, PriceInfo>,
        resolutions: &BTreeMap<String, Resolution>,
    ) -> String {
        let symbol = top.symbol.as_str();
        // Symbols below the relevance threshold were not part of the batch
        let company_name = match resolutions.get(symbol) {
            Some(resolution) => resolution.name().map(str::to_string),
            None => self.resolver.resolve(symbol).await,
        };
        let price = prices.get(symbol).cloned();

        let synopsis = match self.metered_summarizer() {
            Some(summarizer) => {
                let headlines = match &self.quotes {
                    Some(quotes) => quotes.headlines(symbol).await.unwrap_or_else(|e| {
                        warn!(symbol, error = %e, "Headlines unavailable");
                        Vec::new()
                    }),
                    None => Vec::new(),
                };
                let context = SummaryContext::new(symbol)
                    .with_company_name(company_name.clone())
                    .with_mentions(run.section_counts(symbol))
                    .with_price(price.clone())
                    .with_headlines(headlines);
                match summarizer.summarize(&context).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!(symbol, error = %e, "Summary failed, alerting without it");
                        None
                    }
                }
            }
            None => None,
        };

        let detail = TickerDetail::new(symbol, pending.previous(symbol), top.curr_count)
            .with_company_name(company_name)
            .with_price(price)
            .with_synopsis(synopsis);

        let max_len = match &self.notifier {
            Some(notifier) => notifier.max_len().min(self.options.notify.max_len),
            None => self.options.notify.max_len,
        };
        AlertMessage::new(run.run_id.clone(), pending.triggers.clone())
            .with_detail(detail)
            .render_capped(max_len)
    }

    fn metered_summarizer(&self) -> Option<Arc<dyn Summarizer>> {
        let summarizer = self.summarizer.clone()?;
        Some(match &self.limits {
            Some(limits) => Arc::new(RateLimited::new(
                summarizer,
                Arc::clone(limits),
                Api::Summarization,
            )),
            None => summarizer,
        })
    }

    async fn deliver(&self, text: &str) -> bool {
        let Some(notifier) = &self.notifier else {
            info!(alert = %text, "Alert composed, no notifier configured");
            return false;
        };
        match notifier.notify(text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Alert delivery failed");
                false
            }
        }
    }
}

/// Name resolver on the configured cache, seeded with the universe's names
/// when the universe file is readable. Providers are attached by the caller
/// except the secondary, which exists only with an API key.
pub fn build_resolver(
    config: &PulseConfig,
    limits: &Arc<ApiRateLimits>,
) -> anyhow::Result<NameResolver> {
    let store = NameCacheStore::new(config.name_cache_path());
    let mut resolver = NameResolver::open(store, config.resolver.clone())
        .context("failed to open name cache")?;

    match SymbolUniverse::load(&config.symbols_file, &config.blacklist) {
        Ok(universe) => resolver = resolver.with_local_names(&universe),
        Err(e) => warn!(error = %e, "No local name table"),
    }

    if let Some(key) = &config.alpha_vantage_key {
        resolver = resolver.with_secondary(Arc::new(RateLimited::new(
            AlphaVantage::new(key.clone()),
            Arc::clone(limits),
            Api::MarketData,
        )));
    }
    Ok(resolver)
}
