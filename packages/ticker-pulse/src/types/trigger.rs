//! Trigger - one symbol whose mention activity crossed the alert thresholds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub symbol: String,
    pub prev_count: u64,
    pub curr_count: u64,
    pub delta: i64,
}

impl Trigger {
    pub fn new(symbol: impl Into<String>, prev_count: u64, curr_count: u64) -> Self {
        Self {
            symbol: symbol.into(),
            prev_count,
            curr_count,
            delta: curr_count as i64 - prev_count as i64,
        }
    }

    /// True when the symbol had no mentions in the baseline.
    pub fn is_new(&self) -> bool {
        self.prev_count == 0
    }
}
