//! Run types - the artifact one crawl invocation produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Format of a run id. Lexicographic order equals chronological order.
pub const RUN_ID_FORMAT: &str = "%y%m%d-%H%M%S";

/// Time-derived run identifier (`YYMMDD-HHMMSS`, UTC).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self(time.format(RUN_ID_FORMAT).to_string())
    }

    /// Parse an id, rejecting anything not in run id format.
    pub fn parse(value: &str) -> Option<Self> {
        chrono::NaiveDateTime::parse_from_str(value, RUN_ID_FORMAT)
            .ok()
            .map(|_| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mention counts of one forum section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubredditResult {
    #[serde(default)]
    pub symbol_hits: BTreeMap<String, u64>,
    #[serde(default)]
    pub posts_checked: u64,
}

impl SubredditResult {
    /// Fold another partial result into this one.
    pub fn merge(&mut self, other: SubredditResult) {
        merge_counts(&mut self.symbol_hits, other.symbol_hits);
        self.posts_checked += other.posts_checked;
    }

    /// Record one scanned thread.
    pub fn add_thread(&mut self, hits: BTreeMap<String, u64>) {
        merge_counts(&mut self.symbol_hits, hits);
        self.posts_checked += 1;
    }

    pub fn total_hits(&self) -> u64 {
        self.symbol_hits.values().sum()
    }
}

/// Add every count of `from` into `into`.
pub fn merge_counts(into: &mut BTreeMap<String, u64>, from: BTreeMap<String, u64>) {
    for (symbol, count) in from {
        *into.entry(symbol).or_insert(0) += count;
    }
}

/// The output of one crawl. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub subreddit_stats: BTreeMap<String, SubredditResult>,
    /// Symbols whose total count exceeds the relevance threshold.
    pub relevant: BTreeMap<String, u64>,
    pub total_posts_checked: u64,
}

impl Run {
    /// Assemble a run from per-section results.
    ///
    /// Sections appearing more than once are merged.
    pub fn from_sections(
        run_id: RunId,
        started_at: DateTime<Utc>,
        sections: impl IntoIterator<Item = (String, SubredditResult)>,
        relevance_threshold: u64,
    ) -> Self {
        let mut subreddit_stats: BTreeMap<String, SubredditResult> = BTreeMap::new();
        for (name, result) in sections {
            subreddit_stats.entry(name).or_default().merge(result);
        }

        let total_posts_checked = subreddit_stats.values().map(|s| s.posts_checked).sum();
        let relevant = relevant_counts(&subreddit_stats, relevance_threshold);

        Self {
            run_id,
            started_at,
            subreddit_stats,
            relevant,
            total_posts_checked,
        }
    }

    /// Per-symbol sum over all sections.
    pub fn total_counts(&self) -> BTreeMap<String, u64> {
        total_counts(&self.subreddit_stats)
    }

    /// The `n` most mentioned relevant symbols, highest count first, ties by symbol.
    pub fn top_symbols(&self, n: usize) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> = self
            .relevant
            .iter()
            .map(|(symbol, count)| (symbol.clone(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    /// Mentions of one symbol per section, sections without hits omitted.
    pub fn section_counts(&self, symbol: &str) -> BTreeMap<String, u64> {
        self.subreddit_stats
            .iter()
            .filter_map(|(name, stats)| {
                stats
                    .symbol_hits
                    .get(symbol)
                    .filter(|count| **count > 0)
                    .map(|count| (name.clone(), *count))
            })
            .collect()
    }
}

/// Per-symbol sum over all sections.
pub fn total_counts(stats: &BTreeMap<String, SubredditResult>) -> BTreeMap<String, u64> {
    let mut totals = BTreeMap::new();
    for result in stats.values() {
        merge_counts(&mut totals, result.symbol_hits.clone());
    }
    totals
}

/// Totals strictly above `threshold`.
pub fn relevant_counts(
    stats: &BTreeMap<String, SubredditResult>,
    threshold: u64,
) -> BTreeMap<String, u64> {
    total_counts(stats)
        .into_iter()
        .filter(|(_, count)| *count > threshold)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hits(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(s, c)| (s.to_string(), *c)).collect()
    }

    fn section(pairs: &[(&str, u64)], posts: u64) -> SubredditResult {
        SubredditResult {
            symbol_hits: hits(pairs),
            posts_checked: posts,
        }
    }

    #[test]
    fn test_run_id_orders_chronologically() {
        let earlier = RunId::at(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap());
        let later = RunId::at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());

        assert_eq!(earlier.as_str(), "241231-235959");
        assert!(earlier < later);
    }

    #[test]
    fn test_run_id_parse() {
        assert!(RunId::parse("250101-120000").is_some());
        assert!(RunId::parse("stats").is_none());
        assert!(RunId::parse("251301-120000").is_none());
    }

    #[test]
    fn test_relevant_is_strictly_above_threshold() {
        let run = Run::from_sections(
            RunId::at(Utc::now()),
            Utc::now(),
            vec![
                ("wallstreetbets".to_string(), section(&[("GME", 3), ("AMC", 5)], 10)),
                ("stocks".to_string(), section(&[("GME", 3), ("TSLA", 1)], 4)),
            ],
            5,
        );

        assert_eq!(run.relevant, hits(&[("GME", 6)]));
        assert_eq!(run.total_posts_checked, 14);
        assert_eq!(run.total_counts(), hits(&[("AMC", 5), ("GME", 6), ("TSLA", 1)]));
    }

    #[test]
    fn test_duplicate_sections_are_merged() {
        let run = Run::from_sections(
            RunId::at(Utc::now()),
            Utc::now(),
            vec![
                ("stocks".to_string(), section(&[("GME", 4)], 2)),
                ("stocks".to_string(), section(&[("GME", 4)], 3)),
            ],
            5,
        );

        assert_eq!(run.subreddit_stats.len(), 1);
        assert_eq!(run.subreddit_stats["stocks"].posts_checked, 5);
        assert_eq!(run.relevant, hits(&[("GME", 8)]));
    }

    #[test]
    fn test_top_symbols_breaks_ties_by_symbol() {
        let run = Run::from_sections(
            RunId::at(Utc::now()),
            Utc::now(),
            vec![("s".to_string(), section(&[("AMC", 9), ("BB", 9), ("GME", 20)], 1))],
            0,
        );

        assert_eq!(
            run.top_symbols(2),
            vec![("GME".to_string(), 20), ("AMC".to_string(), 9)]
        );
    }

    #[test]
    fn test_section_counts() {
        let run = Run::from_sections(
            RunId::at(Utc::now()),
            Utc::now(),
            vec![
                ("a".to_string(), section(&[("GME", 2)], 1)),
                ("b".to_string(), section(&[("AMC", 2)], 1)),
            ],
            0,
        );

        assert_eq!(run.section_counts("GME"), hits(&[("a", 2)]));
    }
}
