//! Market data attached to a symbol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quote snapshot. Every numeric field is optional since providers omit
/// pre/post-market data outside those sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceInfo {
    pub price: Option<f64>,
    pub previous_close: Option<f64>,
    pub pre_market: Option<f64>,
    pub post_market: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub currency: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl PriceInfo {
    /// Fill `change` and `change_percent` from price and previous close
    /// when the provider did not supply them.
    pub fn with_derived_change(mut self) -> Self {
        if let (Some(price), Some(prev)) = (self.price, self.previous_close) {
            if self.change.is_none() {
                self.change = Some(price - prev);
            }
            if self.change_percent.is_none() && prev != 0.0 {
                self.change_percent = Some((price - prev) / prev * 100.0);
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.pre_market.is_none() && self.post_market.is_none()
    }
}
