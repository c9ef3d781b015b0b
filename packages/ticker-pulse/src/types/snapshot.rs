//! Stats snapshot - the baseline the next run is compared against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{PriceInfo, RunId};

/// Counts and prices of the most recently completed run.
///
/// Always replaced as a whole, never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(default)]
    pub mention_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub price_snapshot: BTreeMap<String, PriceInfo>,
    #[serde(default)]
    pub run_id: Option<RunId>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StatsSnapshot {
    pub fn new(run_id: RunId, mention_counts: BTreeMap<String, u64>) -> Self {
        Self {
            mention_counts,
            price_snapshot: BTreeMap::new(),
            run_id: Some(run_id),
            updated_at: Some(Utc::now()),
        }
    }

    pub fn with_prices(mut self, prices: BTreeMap<String, PriceInfo>) -> Self {
        self.price_snapshot = prices;
        self
    }

    /// Previous count of a symbol; absent symbols count as zero.
    pub fn count(&self, symbol: &str) -> u64 {
        self.mention_counts.get(symbol).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.mention_counts.is_empty()
    }
}
