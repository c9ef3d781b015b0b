//! Run-over-run trend detection.
//!
//! A symbol triggers when its mention count grew enough versus the stats
//! snapshot of the previous completed run:
//!
//! - new symbol (previous count 0): current count reaches `min_abs`
//! - known symbol: grew by at least `min_delta` *and* to at least `ratio`
//!   times the previous count
//!
//! After every evaluation the snapshot is replaced with the current counts,
//! whether or not anything triggered.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::error::StoreResult;
use crate::store::SnapshotStore;
use crate::types::{PriceInfo, RunId, StatsSnapshot, Trigger};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerThresholds {
    /// Minimum growth factor for known symbols
    pub ratio: f64,
    /// Minimum absolute growth for known symbols
    pub min_delta: u64,
    /// Minimum count for symbols absent from the baseline
    pub min_abs: u64,
}

impl Default for TriggerThresholds {
    fn default() -> Self {
        Self {
            ratio: 2.0,
            min_delta: 10,
            min_abs: 20,
        }
    }
}

impl TriggerThresholds {
    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_min_delta(mut self, min_delta: u64) -> Self {
        self.min_delta = min_delta;
        self
    }

    pub fn with_min_abs(mut self, min_abs: u64) -> Self {
        self.min_abs = min_abs;
        self
    }

    /// Whether a move from `prev` to `curr` triggers.
    pub fn fires(&self, prev: u64, curr: u64) -> bool {
        if prev == 0 {
            return curr >= self.min_abs;
        }
        curr.saturating_sub(prev) >= self.min_delta && curr as f64 >= prev as f64 * self.ratio
    }
}

/// Compare current counts against the baseline. Sorted by delta
/// descending, then symbol.
pub fn evaluate(
    current: &BTreeMap<String, u64>,
    baseline: &StatsSnapshot,
    thresholds: &TriggerThresholds,
) -> Vec<Trigger> {
    let mut triggers: Vec<Trigger> = current
        .iter()
        .filter_map(|(symbol, &curr)| {
            let prev = baseline.count(symbol);
            thresholds
                .fires(prev, curr)
                .then(|| Trigger::new(symbol.clone(), prev, curr))
        })
        .collect();

    triggers.sort_by(|a, b| b.delta.cmp(&a.delta).then_with(|| a.symbol.cmp(&b.symbol)));
    triggers
}

/// Evaluates runs against the persisted snapshot.
pub struct TriggerEngine {
    store: SnapshotStore,
    thresholds: TriggerThresholds,
}

/// An evaluated cycle waiting for its snapshot overwrite.
///
/// The baseline has already been read; [`PendingCycle::commit`] writes the
/// new snapshot. Prices can be attached in between.
#[must_use = "a pending cycle must be committed to advance the snapshot"]
pub struct PendingCycle<'a> {
    engine: &'a TriggerEngine,
    run_id: RunId,
    current: BTreeMap<String, u64>,
    pub baseline: StatsSnapshot,
    pub triggers: Vec<Trigger>,
}

impl TriggerEngine {
    pub fn new(store: SnapshotStore, thresholds: TriggerThresholds) -> Self {
        Self { store, thresholds }
    }

    pub fn thresholds(&self) -> &TriggerThresholds {
        &self.thresholds
    }

    /// Read the baseline and evaluate `current` against it.
    ///
    /// An unreadable snapshot is logged and treated as empty.
    pub fn begin(&self, run_id: RunId, current: BTreeMap<String, u64>) -> PendingCycle<'_> {
        let baseline = match self.store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Snapshot unreadable, using empty baseline");
                StatsSnapshot::default()
            }
        };

        let triggers = evaluate(&current, &baseline, &self.thresholds);
        info!(
            run_id = %run_id,
            baseline_run = ?baseline.run_id,
            symbols = current.len(),
            triggers = triggers.len(),
            "Trends evaluated"
        );

        PendingCycle {
            engine: self,
            run_id,
            current,
            baseline,
            triggers,
        }
    }

    /// Read, evaluate and overwrite in one step.
    pub fn cycle(
        &self,
        run_id: RunId,
        current: BTreeMap<String, u64>,
        prices: BTreeMap<String, PriceInfo>,
    ) -> StoreResult<Vec<Trigger>> {
        let pending = self.begin(run_id, current);
        let triggers = pending.triggers.clone();
        pending.commit(prices)?;
        Ok(triggers)
    }
}

impl PendingCycle<'_> {
    pub fn is_triggered(&self) -> bool {
        !self.triggers.is_empty()
    }

    /// Previous count of a symbol in the baseline.
    pub fn previous(&self, symbol: &str) -> u64 {
        self.baseline.count(symbol)
    }

    /// Overwrite the snapshot with the current counts and `prices`.
    pub fn commit(self, prices: BTreeMap<String, PriceInfo>) -> StoreResult<Vec<Trigger>> {
        let snapshot = StatsSnapshot::new(self.run_id, self.current).with_prices(prices);
        self.engine.store.save(&snapshot)?;
        Ok(self.triggers)
    }
}
