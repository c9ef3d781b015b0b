//! Market-data enrichment for the symbols an alert may show.

use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::traits::QuoteProvider;
use crate::types::PriceInfo;

/// Quotes for `symbols`, at most `workers` in flight. Failed or empty
/// quotes are left out.
pub async fn fetch_prices(
    quotes: &dyn QuoteProvider,
    symbols: BTreeSet<String>,
    workers: usize,
) -> BTreeMap<String, PriceInfo> {
    let requested = symbols.len();

    let prices: BTreeMap<String, PriceInfo> = stream::iter(symbols)
        .map(|symbol| async move {
            match quotes.quote(&symbol).await {
                Ok(info) if !info.is_empty() => Some((symbol, info.with_derived_change())),
                Ok(_) => {
                    debug!(symbol = %symbol, "Quote without prices");
                    None
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Quote unavailable");
                    None
                }
            }
        })
        .buffer_unordered(workers.max(1))
        .filter_map(|entry| async move { entry })
        .collect()
        .await;

    debug!(requested, fetched = prices.len(), "Prices fetched");
    prices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockQuoteProvider;

    fn set(symbols: &[&str]) -> BTreeSet<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_skips_failed_and_empty_quotes() {
        let quotes = MockQuoteProvider::new()
            .with_price("GME", 23.5)
            .with_quote("AMC", PriceInfo::default());

        let prices = fetch_prices(&quotes, set(&["GME", "AMC", "BB"]), 3).await;

        assert_eq!(prices.keys().collect::<Vec<_>>(), vec!["GME"]);
        assert_eq!(prices["GME"].price, Some(23.5));

        let mut calls = quotes.calls();
        calls.sort();
        assert_eq!(calls, vec!["AMC", "BB", "GME"]);
    }

    #[tokio::test]
    async fn test_derives_change() {
        let quotes = MockQuoteProvider::new().with_quote(
            "GME",
            PriceInfo {
                price: Some(22.0),
                previous_close: Some(20.0),
                ..Default::default()
            },
        );

        let prices = fetch_prices(&quotes, set(&["GME"]), 0).await;
        assert_eq!(prices["GME"].change_percent, Some(10.0));
    }
}
