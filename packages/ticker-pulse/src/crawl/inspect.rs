//! Single-symbol mention check with per-thread detail.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{CrawlConfig, VariantMatcher};
use crate::error::{PulseError, Result};
use crate::traits::ForumSource;

/// Hits of one symbol in one thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadMentions {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Hits in title and body
    pub post_hits: u64,
    /// Hits across all comments
    pub comment_hits: u64,
    /// Hits per spelling, e.g. `GME` and `$GME`
    pub variants: BTreeMap<String, u64>,
}

impl ThreadMentions {
    pub fn total(&self) -> u64 {
        self.post_hits + self.comment_hits
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MentionReport {
    pub symbol: String,
    pub section: String,
    pub threads_checked: usize,
    /// Threads with at least one hit, most hits first
    pub threads: Vec<ThreadMentions>,
}

impl MentionReport {
    pub fn total(&self) -> u64 {
        self.threads.iter().map(ThreadMentions::total).sum()
    }

    /// Hits per spelling across all threads.
    pub fn variants(&self) -> BTreeMap<String, u64> {
        let mut out = BTreeMap::new();
        for thread in &self.threads {
            for (variant, count) in &thread.variants {
                *out.entry(variant.clone()).or_insert(0) += count;
            }
        }
        out
    }
}

/// Count one symbol's mentions in a section's recent threads.
///
/// Unlike the full crawl, a failed listing is an error here. Failed thread
/// fetches are skipped and not counted as checked.
pub async fn inspect_symbol(
    forum: &dyn ForumSource,
    section: &str,
    symbol: &str,
    config: &CrawlConfig,
) -> Result<MentionReport> {
    let matcher = VariantMatcher::new(symbol)?;
    let cutoff = config.cutoff(Utc::now());

    let threads = forum
        .recent_threads(section, config.listing_limit)
        .await
        .map_err(PulseError::Forum)?;
    let fresh: Vec<_> = threads
        .into_iter()
        .filter(|t| t.created_at >= cutoff)
        .collect();

    let fetched: Vec<_> = stream::iter(fresh)
        .map(|thread| async move {
            match forum.fetch_thread(section, &thread.id).await {
                Ok(content) => Some(content),
                Err(e) => {
                    tracing::warn!(section, thread = %thread.id, error = %e, "Thread fetch failed");
                    None
                }
            }
        })
        .buffer_unordered(config.thread_workers.max(1))
        .collect()
        .await;

    let threads_checked = fetched.iter().filter(|t| t.is_some()).count();
    let mut threads: Vec<ThreadMentions> = fetched
        .into_iter()
        .flatten()
        .map(|content| {
            let post_hits = matcher.count(&content.post_text());
            let comment_hits = content.comments.iter().map(|c| matcher.count(c)).sum();
            ThreadMentions {
                variants: matcher.variants(&content.full_text()),
                id: content.id,
                title: content.title,
                url: content.url,
                created_at: content.created_at,
                post_hits,
                comment_hits,
            }
        })
        .filter(|t| t.total() > 0)
        .collect();

    threads.sort_by(|a, b| b.total().cmp(&a.total()).then_with(|| a.id.cmp(&b.id)));

    tracing::info!(
        symbol,
        section,
        threads_checked,
        threads_with_hits = threads.len(),
        "Mention check complete"
    );

    Ok(MentionReport {
        symbol: symbol.to_string(),
        section: section.to_string(),
        threads_checked,
        threads,
    })
}
