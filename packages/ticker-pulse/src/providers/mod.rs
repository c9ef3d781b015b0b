//! Market-data and company-name providers.
//!
//! Yahoo Finance is the primary source for quotes, headlines and names.
//! Alpha Vantage is the secondary name source and is only constructed when
//! an API key is configured.

pub mod alpha_vantage;
pub mod yahoo;

pub use alpha_vantage::AlphaVantage;
pub use yahoo::YahooFinance;

use std::time::Duration;

/// Browser-like agent; Yahoo rejects requests without one.
pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) ticker-pulse/0.1";

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// A name is usable when it is non-empty and not just the symbol again.
pub fn is_usable_name(symbol: &str, name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && !name.eq_ignore_ascii_case(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_usable_name() {
        assert!(is_usable_name("GME", "GameStop Corp."));
        assert!(!is_usable_name("GME", "  "));
        assert!(!is_usable_name("GME", "GME"));
        assert!(!is_usable_name("GME", "gme"));
    }
}
