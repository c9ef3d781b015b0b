//! Process configuration, loaded once from the environment.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::credentials::{RedditCredentials, SecretString};
use crate::crawl::CrawlConfig;
use crate::limiter::{Budget, RateLimitConfig};
use crate::notify::NotifyConfig;
use crate::resolver::ResolverConfig;
use crate::store::DEFAULT_HANDOFF_TIMEOUT;
use crate::trigger::TriggerThresholds;
use crate::universe::default_blacklist;

const DEFAULT_USER_AGENT: &str = "ticker-pulse/0.1";
const DEFAULT_SUBREDDIT: &str = "wallstreetbets";

/// Configuration for one process. Components receive the parts they need
/// through their constructors.
#[derive(Debug, Clone)]
pub struct PulseConfig {
    pub reddit: Option<RedditCredentials>,
    pub subreddits: Vec<String>,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub symbols_file: PathBuf,
    pub blacklist: BTreeSet<String>,
    pub alpha_vantage_key: Option<SecretString>,
    pub webhook_url: Option<SecretString>,
    pub log_keep_last: Option<usize>,
    pub handoff_timeout: Duration,
    pub crawl: CrawlConfig,
    pub rate_limits: RateLimitConfig,
    pub resolver: ResolverConfig,
    pub thresholds: TriggerThresholds,
    pub notify: NotifyConfig,
}

impl Default for PulseConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            reddit: None,
            subreddits: vec![DEFAULT_SUBREDDIT.to_string()],
            symbols_file: data_dir.join("input").join("symbols.csv"),
            data_dir,
            log_dir: PathBuf::from("logs"),
            blacklist: default_blacklist(),
            alpha_vantage_key: None,
            webhook_url: None,
            log_keep_last: Some(10),
            handoff_timeout: DEFAULT_HANDOFF_TIMEOUT,
            crawl: CrawlConfig::default(),
            rate_limits: RateLimitConfig::default(),
            resolver: ResolverConfig::default(),
            thresholds: TriggerThresholds::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl PulseConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let reddit = match (var("REDDIT_CLIENT_ID"), var("REDDIT_CLIENT_SECRET")) {
            (Some(id), Some(secret)) => Some(RedditCredentials::new(
                id,
                secret,
                var("REDDIT_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            )),
            (None, None) => None,
            _ => anyhow::bail!("REDDIT_CLIENT_ID and REDDIT_CLIENT_SECRET must be set together"),
        };

        let subreddits = match var("SUBREDDITS") {
            Some(list) => split_list(&list),
            None => defaults.subreddits,
        };
        if subreddits.is_empty() {
            anyhow::bail!("SUBREDDITS must name at least one subreddit");
        }

        let data_dir = var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir);
        let symbols_file = var("SYMBOLS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("input").join("symbols.csv"));

        let blacklist = match var("SYMBOL_BLACKLIST") {
            Some(list) => split_list(&list).into_iter().map(|s| s.to_uppercase()).collect(),
            None => defaults.blacklist,
        };

        let thresholds = TriggerThresholds::default()
            .with_ratio(parse_or(&var, "ALERT_RATIO", defaults.thresholds.ratio)?)
            .with_min_delta(parse_or(&var, "ALERT_MIN_DELTA", defaults.thresholds.min_delta)?)
            .with_min_abs(parse_or(&var, "ALERT_MIN_ABS", defaults.thresholds.min_abs)?);
        if !thresholds.ratio.is_finite() || thresholds.ratio < 1.0 {
            anyhow::bail!("ALERT_RATIO must be a number >= 1.0");
        }

        let lookback_hours: u64 = parse_or(&var, "LOOKBACK_HOURS", 24)?;
        let relevance_threshold =
            parse_or(&var, "RELEVANCE_THRESHOLD", defaults.crawl.relevance_threshold)?;
        let crawl = defaults
            .crawl
            .with_lookback(secs_from("LOOKBACK_HOURS", lookback_hours, 60 * 60)?)
            .with_relevance_threshold(relevance_threshold);

        let forum_calls = parse_or(
            &var,
            "FORUM_CALLS_PER_MINUTE",
            defaults.rate_limits.forum.max_calls,
        )?;
        let market_calls = parse_or(
            &var,
            "MARKET_CALLS_PER_MINUTE",
            defaults.rate_limits.market_data.max_calls,
        )?;
        let rate_limits = defaults
            .rate_limits
            .with_forum(Budget::new(forum_calls, Duration::from_secs(60)))
            .with_market_data(Budget::new(market_calls, Duration::from_secs(60)));

        let ttl_days: Option<u64> = parse_opt(&var, "NAME_CACHE_TTL_DAYS")?;
        let max_age = ttl_days
            .map(|days| secs_from("NAME_CACHE_TTL_DAYS", days, 24 * 60 * 60))
            .transpose()?;
        let resolver = defaults.resolver.with_max_age(max_age);

        // 0 keeps every archived log
        let log_keep_last = match parse_or::<usize, _>(&var, "LOG_KEEP_LAST", 10)? {
            0 => None,
            n => Some(n),
        };

        Ok(Self {
            reddit,
            subreddits,
            data_dir,
            log_dir: var("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            symbols_file,
            blacklist,
            alpha_vantage_key: var("ALPHAVANTAGE_API_KEY").map(SecretString::from),
            webhook_url: var("DISCORD_WEBHOOK_URL").map(SecretString::from),
            log_keep_last,
            handoff_timeout: defaults.handoff_timeout,
            crawl,
            rate_limits,
            resolver,
            thresholds,
            notify: defaults.notify,
        })
    }

    /// Directory of `{run_id}_crawl.json` files.
    pub fn runs_dir(&self) -> PathBuf {
        self.data_dir.join("runs")
    }

    pub fn stats_path(&self) -> PathBuf {
        self.data_dir.join("stats.json")
    }

    pub fn name_cache_path(&self) -> PathBuf {
        self.data_dir.join("ticker_names.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join("crawler.log")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.log_dir.join("archive")
    }

    /// Forum credentials, required for anything that crawls.
    pub fn require_reddit(&self) -> Result<&RedditCredentials> {
        self.reddit
            .as_ref()
            .context("REDDIT_CLIENT_ID and REDDIT_CLIENT_SECRET must be set")
    }
}

fn split_list(list: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(var, key)?.unwrap_or(default))
}

fn parse_opt<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("{} must be a valid number, got {:?}", key, raw))
        })
        .transpose()
}

/// `count` units of `unit_secs` seconds, rejecting values that overflow.
fn secs_from(key: &str, count: u64, unit_secs: u64) -> Result<Duration> {
    count
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .with_context(|| format!("{} is too large: {}", key, count))
}
