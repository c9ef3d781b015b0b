//! Market-data provider traits.

use async_trait::async_trait;

use crate::error::{ProviderError, ProviderResult};
use crate::types::PriceInfo;

/// Looks up the company name behind a ticker symbol.
///
/// A lookup is split into steps that each cost exactly one request, so a
/// wrapper metering requests can wrap the steps. `company_name` composes
/// them and is not meant to be overridden.
#[async_trait]
pub trait NameProvider: Send + Sync {
    /// The provider's direct lookup. `Ok(None)` means no usable name there.
    async fn lookup_name(&self, symbol: &str) -> ProviderResult<Option<String>>;

    /// Whether `search_name` issues a request.
    fn has_search(&self) -> bool {
        false
    }

    /// A broader search, tried when the direct lookup finds nothing.
    async fn search_name(&self, _symbol: &str) -> ProviderResult<Option<String>> {
        Ok(None)
    }

    /// Direct lookup, then search. `Ok(None)` means the provider has no
    /// match for the symbol. A throttled lookup is not followed by a search.
    async fn company_name(&self, symbol: &str) -> ProviderResult<Option<String>> {
        let failure = match self.lookup_name(symbol).await {
            Ok(Some(name)) => return Ok(Some(name)),
            Ok(None) => None,
            Err(e @ ProviderError::Throttled { .. }) => return Err(e),
            Err(e) => Some(e),
        };

        if !self.has_search() {
            return failure.map_or(Ok(None), Err);
        }
        if let Some(e) = &failure {
            tracing::debug!(provider = self.name(), symbol, error = %e, "Lookup failed, trying search");
        }
        self.search_name(symbol).await
    }

    fn name(&self) -> &str;
}

/// Supplies quotes and news headlines for a symbol.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn quote(&self, symbol: &str) -> ProviderResult<PriceInfo>;

    /// Recent headlines mentioning the symbol. Empty by default.
    async fn headlines(&self, _symbol: &str) -> ProviderResult<Vec<String>> {
        Ok(Vec::new())
    }
}
