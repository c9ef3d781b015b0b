//! Two-level crawl: a pool of section workers, each running a pool of
//! thread workers. Workers send their counts over a channel to a single
//! reducer; nothing shares a counter.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{CrawlConfig, SymbolMatcher};
use crate::error::Result;
use crate::traits::ForumSource;
use crate::types::{Run, RunId, SubredditResult};
use crate::universe::SymbolUniverse;

/// Crawls forum sections and reduces the mention counts into a [`Run`].
pub struct CrawlCoordinator {
    forum: Arc<dyn ForumSource>,
    config: CrawlConfig,
}

impl CrawlCoordinator {
    pub fn new(forum: Arc<dyn ForumSource>, config: CrawlConfig) -> Self {
        Self { forum, config }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl every section and return the reduced run.
    ///
    /// Per-thread and per-section failures never fail the crawl; they only
    /// contribute nothing. The only error is a matcher that fails to compile.
    pub async fn crawl(&self, sections: &[String], universe: &SymbolUniverse) -> Result<Run> {
        let matcher = Arc::new(
            SymbolMatcher::new(universe.symbols())?.with_max_text_len(self.config.max_text_len),
        );
        Ok(self.crawl_with(sections, matcher).await)
    }

    /// Crawl with a prebuilt matcher.
    pub async fn crawl_with(&self, sections: &[String], matcher: Arc<SymbolMatcher>) -> Run {
        let started_at = Utc::now();
        let run_id = RunId::at(started_at);
        let cutoff = self.config.cutoff(started_at);
        let sections: BTreeSet<String> = sections.iter().cloned().collect();

        info!(
            run_id = %run_id,
            forum = self.forum.name(),
            sections = sections.len(),
            "Starting crawl"
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<(String, SubredditResult)>();
        let permits = Arc::new(Semaphore::new(self.config.section_workers.max(1)));
        let mut workers = JoinSet::new();

        for section in &sections {
            let section = section.clone();
            let tx = tx.clone();
            let permits = Arc::clone(&permits);
            let forum = Arc::clone(&self.forum);
            let matcher = Arc::clone(&matcher);
            let config = self.config.clone();

            workers.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                let result = crawl_section(forum, &section, matcher, &config, cutoff).await;
                let _ = tx.send((section, result));
            });
        }
        drop(tx);

        // Every requested section appears in the run, even if its worker died.
        let mut stats: BTreeMap<String, SubredditResult> = sections
            .iter()
            .map(|s| (s.clone(), SubredditResult::default()))
            .collect();

        while let Some((section, result)) = rx.recv().await {
            info!(
                section = %section,
                posts = result.posts_checked,
                hits = result.total_hits(),
                "Section done"
            );
            stats.entry(section).or_default().merge(result);
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Section worker failed");
            }
        }

        let run = Run::from_sections(run_id, started_at, stats, self.config.relevance_threshold);
        info!(
            run_id = %run.run_id,
            posts = run.total_posts_checked,
            relevant = run.relevant.len(),
            "Crawl complete"
        );
        run
    }
}

/// Crawl one section. Always yields a result, possibly empty.
async fn crawl_section(
    forum: Arc<dyn ForumSource>,
    section: &str,
    matcher: Arc<SymbolMatcher>,
    config: &CrawlConfig,
    cutoff: DateTime<Utc>,
) -> SubredditResult {
    let deadline = Instant::now() + config.section_timeout;

    let listing = tokio::time::timeout_at(
        deadline,
        forum.recent_threads(section, config.listing_limit),
    )
    .await;
    let threads = match listing {
        Ok(Ok(threads)) => threads,
        Ok(Err(e)) => {
            warn!(section, error = %e, "Listing failed");
            return SubredditResult::default();
        }
        Err(_) => {
            warn!(section, "Listing timed out");
            return SubredditResult::default();
        }
    };

    let listed = threads.len();
    let fresh: Vec<_> = threads
        .into_iter()
        .filter(|t| t.created_at >= cutoff)
        .collect();
    debug!(section, listed, fresh = fresh.len(), "Listing fetched");

    let (tx, mut rx) = mpsc::unbounded_channel::<BTreeMap<String, u64>>();
    let permits = Arc::new(Semaphore::new(config.thread_workers.max(1)));
    let mut workers = JoinSet::new();

    for thread in fresh {
        let tx = tx.clone();
        let permits = Arc::clone(&permits);
        let forum = Arc::clone(&forum);
        let matcher = Arc::clone(&matcher);
        let section = section.to_string();

        workers.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let hits = match forum.fetch_thread(&section, &thread.id).await {
                Ok(content) => matcher.count(&content.full_text()),
                Err(e) => {
                    debug!(section = %section, thread = %thread.id, error = %e, "Thread fetch failed");
                    BTreeMap::new()
                }
            };
            let _ = tx.send(hits);
        });
    }
    drop(tx);

    let mut result = SubredditResult::default();
    let timeout = tokio::time::sleep_until(deadline);
    tokio::pin!(timeout);

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(hits) => result.add_thread(hits),
                None => break,
            },
            _ = &mut timeout => {
                warn!(
                    section,
                    posts = result.posts_checked,
                    "Section timed out, keeping partial counts"
                );
                workers.abort_all();
                break;
            }
        }
    }

    while workers.join_next().await.is_some() {}
    result
}
