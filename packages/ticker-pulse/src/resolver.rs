//! Company-name resolution with a persistent cache.
//!
//! Lookup order for a symbol:
//!
//! 1. the persistent cache (a hit calls no provider)
//! 2. the local reference table from the universe file
//! 3. the primary and secondary providers, raced; the first usable name wins
//!
//! Every successful resolution is written to the cache right away. The
//! cache grows without bound unless `max_age` is set, in which case older
//! entries count as misses and get resolved again.

use futures::stream::{self, FuturesUnordered, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::StoreResult;
use crate::providers::is_usable_name;
use crate::store::NameCacheStore;
use crate::traits::NameProvider;
use crate::types::{NameCache, NameEntry, NameSource};
use crate::universe::SymbolUniverse;

/// Configuration for name resolution.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Attempts per provider call
    pub retries: u32,

    /// Base backoff; attempt `n` waits `retry_delay * n`
    pub retry_delay: Duration,

    /// Symbols resolved at once in a batch
    pub concurrency: usize,

    /// Cached entries older than this are resolved again
    pub max_age: Option<Duration>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay: Duration::from_secs(2),
            concurrency: 10,
            max_age: None,
        }
    }
}

impl ResolverConfig {
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }
}

/// Outcome of resolving one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Served from the cache
    Cached(NameEntry),
    /// Freshly resolved and written to the cache
    Resolved(NameEntry),
    /// No source produced a usable name
    Unresolved,
}

impl Resolution {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Cached(entry) | Self::Resolved(entry) => Some(&entry.company_name),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

pub struct NameResolver {
    store: NameCacheStore,
    cache: Mutex<NameCache>,
    local: BTreeMap<String, String>,
    primary: Option<Arc<dyn NameProvider>>,
    secondary: Option<Arc<dyn NameProvider>>,
    config: ResolverConfig,
}

impl NameResolver {
    /// Open the resolver on a cache store, loading whatever it holds.
    pub fn open(store: NameCacheStore, config: ResolverConfig) -> StoreResult<Self> {
        let cache = store.load()?;
        debug!(entries = cache.len(), path = %store.path().display(), "Name cache loaded");
        Ok(Self {
            store,
            cache: Mutex::new(cache),
            local: BTreeMap::new(),
            primary: None,
            secondary: None,
            config,
        })
    }

    /// Use the universe's security names as the local reference table.
    pub fn with_local_names(mut self, universe: &SymbolUniverse) -> Self {
        self.local = universe
            .symbols()
            .filter_map(|s| universe.local_name(s).map(|n| (s.to_string(), n.to_string())))
            .collect();
        self
    }

    pub fn with_primary(mut self, provider: Arc<dyn NameProvider>) -> Self {
        self.primary = Some(provider);
        self
    }

    pub fn with_secondary(mut self, provider: Arc<dyn NameProvider>) -> Self {
        self.secondary = Some(provider);
        self
    }

    /// Company name for `symbol`, if any source knows it.
    pub async fn resolve(&self, symbol: &str) -> Option<String> {
        self.resolve_detailed(symbol)
            .await
            .name()
            .map(str::to_string)
    }

    pub async fn resolve_detailed(&self, symbol: &str) -> Resolution {
        let max_age = self
            .config
            .max_age
            .and_then(|age| chrono::Duration::from_std(age).ok());

        if let Some(entry) = self.cache.lock().await.get_fresh(symbol, max_age) {
            debug!(symbol, provider = %entry.provider, "Name cache hit");
            return Resolution::Cached(entry.clone());
        }

        if let Some(name) = self.local.get(symbol).filter(|n| is_usable_name(symbol, n)) {
            return self
                .record(NameEntry::new(symbol, name.trim(), NameSource::Local))
                .await;
        }

        match self.race_providers(symbol).await {
            Some((name, source)) => self.record(NameEntry::new(symbol, name, source)).await,
            None => {
                warn!(symbol, "No source could resolve company name");
                Resolution::Unresolved
            }
        }
    }

    /// Resolve many symbols with bounded concurrency. One symbol's failure
    /// never affects another.
    pub async fn resolve_batch<I, S>(&self, symbols: I) -> BTreeMap<String, Resolution>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = symbols.into_iter().map(Into::into).collect();
        let total = unique.len();

        let results: BTreeMap<String, Resolution> = stream::iter(unique)
            .map(|symbol| async move {
                let resolution = self.resolve_detailed(&symbol).await;
                (symbol, resolution)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let cached = results
            .values()
            .filter(|r| matches!(r, Resolution::Cached(_)))
            .count();
        let resolved = results
            .values()
            .filter(|r| matches!(r, Resolution::Resolved(_)))
            .count();
        info!(
            total,
            cached,
            resolved,
            unresolved = total - cached - resolved,
            "Name resolution complete"
        );
        results
    }

    /// Snapshot of the in-memory cache.
    pub async fn cache(&self) -> NameCache {
        self.cache.lock().await.clone()
    }

    /// Insert and persist. The lock stays held until the write finishes so
    /// writes land in insertion order; the write itself runs off the runtime.
    async fn record(&self, entry: NameEntry) -> Resolution {
        let mut cache = self.cache.lock().await;
        cache.insert(entry.clone());

        let store = self.store.clone();
        let snapshot = cache.clone();
        match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(symbol = %entry.symbol, error = %e, "Failed to persist name cache"),
            Err(e) => warn!(symbol = %entry.symbol, error = %e, "Name cache write task failed"),
        }
        drop(cache);
        debug!(symbol = %entry.symbol, provider = %entry.provider, "Name resolved");
        Resolution::Resolved(entry)
    }

    async fn race_providers(&self, symbol: &str) -> Option<(String, NameSource)> {
        let mut lookups = FuturesUnordered::new();
        if let Some(primary) = &self.primary {
            lookups.push(lookup_with_retry(
                primary.as_ref(),
                symbol,
                NameSource::PrimaryApi,
                &self.config,
            ));
        }
        if let Some(secondary) = &self.secondary {
            lookups.push(lookup_with_retry(
                secondary.as_ref(),
                symbol,
                NameSource::SecondaryApi,
                &self.config,
            ));
        }

        while let Some(found) = lookups.next().await {
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

/// One provider's answer, retrying errors with linear backoff. A definite
/// "no match" is not retried.
async fn lookup_with_retry(
    provider: &dyn NameProvider,
    symbol: &str,
    source: NameSource,
    config: &ResolverConfig,
) -> Option<(String, NameSource)> {
    let attempts = config.retries.max(1);

    for attempt in 1..=attempts {
        match provider.company_name(symbol).await {
            Ok(Some(name)) if is_usable_name(symbol, &name) => {
                return Some((name.trim().to_string(), source));
            }
            Ok(_) => {
                debug!(provider = provider.name(), symbol, "No match");
                return None;
            }
            Err(e) => {
                warn!(
                    provider = provider.name(),
                    symbol,
                    attempt,
                    error = %e,
                    "Name lookup failed"
                );
                if attempt < attempts {
                    tokio::time::sleep(config.retry_delay * attempt).await;
                }
            }
        }
    }
    None
}
