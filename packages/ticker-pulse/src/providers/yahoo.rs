//! Yahoo Finance chart and search endpoints.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;

use super::{http_client, is_usable_name};
use crate::error::{ProviderError, ProviderResult};
use crate::traits::{NameProvider, QuoteProvider};
use crate::types::PriceInfo;

const PROVIDER: &str = "yahoo";
const BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Headlines explicitly tagged with the symbol come first; general ones
/// top the list up to this many.
const MIN_HEADLINES: usize = 5;
const MAX_HEADLINES: usize = 20;

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    currency: Option<String>,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_time: Option<i64>,
    pre_market_price: Option<f64>,
    post_market_price: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
    #[serde(default)]
    news: Vec<SearchNews>,
}

#[derive(Debug, Deserialize)]
struct SearchQuote {
    #[serde(default)]
    symbol: String,
    shortname: Option<String>,
    longname: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNews {
    title: Option<String>,
    #[serde(default)]
    related_tickers: Vec<String>,
}

/// Primary market-data provider.
pub struct YahooFinance {
    client: reqwest::Client,
    base_url: String,
}

impl Default for YahooFinance {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooFinance {
    pub fn new() -> Self {
        Self {
            client: http_client(Duration::from_secs(15)),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> ProviderResult<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).query(query).send().await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::Throttled {
                provider: PROVIDER,
                message: resp.text().await.unwrap_or_default(),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(resp.json().await?)
    }

    async fn chart_meta(&self, symbol: &str) -> ProviderResult<ChartMeta> {
        let value = self
            .get(
                &format!("/v8/finance/chart/{}", symbol),
                &[("range", "1d".into()), ("interval", "1d".into())],
            )
            .await?;
        parse_chart(value)
    }

    async fn search(&self, symbol: &str) -> ProviderResult<SearchResponse> {
        let value = self
            .get(
                "/v1/finance/search",
                &[
                    ("q", symbol.to_string()),
                    ("quotesCount", "5".into()),
                    ("newsCount", MAX_HEADLINES.to_string()),
                ],
            )
            .await?;
        serde_json::from_value(value).map_err(|e| ProviderError::Parse {
            provider: PROVIDER,
            message: e.to_string(),
        })
    }
}

fn parse_chart(value: serde_json::Value) -> ProviderResult<ChartMeta> {
    let envelope: ChartEnvelope = serde_json::from_value(value).map_err(|e| ProviderError::Parse {
        provider: PROVIDER,
        message: e.to_string(),
    })?;

    if let Some(error) = envelope.chart.error {
        return Err(ProviderError::Api {
            provider: PROVIDER,
            status: 404,
            message: format!("{}: {}", error.code, error.description),
        });
    }

    envelope
        .chart
        .result
        .and_then(|mut results| (!results.is_empty()).then(|| results.remove(0)))
        .map(|r| r.meta)
        .ok_or_else(|| ProviderError::Parse {
            provider: PROVIDER,
            message: "chart has no result".into(),
        })
}

fn price_info(meta: &ChartMeta) -> PriceInfo {
    PriceInfo {
        price: meta.regular_market_price,
        previous_close: meta.chart_previous_close.or(meta.previous_close),
        pre_market: meta.pre_market_price,
        post_market: meta.post_market_price,
        change: None,
        change_percent: None,
        currency: meta.currency.clone(),
        timestamp: meta
            .regular_market_time
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
    }
    .with_derived_change()
}

fn chart_name(symbol: &str, meta: &ChartMeta) -> Option<String> {
    [&meta.long_name, &meta.short_name]
        .into_iter()
        .flatten()
        .find(|name| is_usable_name(symbol, name))
        .map(|name| name.trim().to_string())
}

fn search_name(symbol: &str, search: &SearchResponse) -> Option<String> {
    search
        .quotes
        .iter()
        .filter(|q| q.symbol == symbol)
        .flat_map(|q| [&q.shortname, &q.longname])
        .flatten()
        .find(|name| is_usable_name(symbol, name))
        .map(|name| name.trim().to_string())
}

fn select_headlines(symbol: &str, news: &[SearchNews]) -> Vec<String> {
    let mut headlines: Vec<String> = news
        .iter()
        .filter(|n| n.related_tickers.iter().any(|t| t == symbol))
        .filter_map(|n| n.title.clone())
        .collect();

    if headlines.len() < MIN_HEADLINES {
        let extra: Vec<String> = news
            .iter()
            .filter_map(|n| n.title.clone())
            .filter(|t| !headlines.contains(t))
            .take(MIN_HEADLINES - headlines.len())
            .collect();
        headlines.extend(extra);
    }

    headlines.truncate(MAX_HEADLINES);
    headlines
}

#[async_trait]
impl NameProvider for YahooFinance {
    /// Long or short name from the chart metadata.
    async fn lookup_name(&self, symbol: &str) -> ProviderResult<Option<String>> {
        let meta = self.chart_meta(symbol).await?;
        Ok(chart_name(symbol, &meta))
    }

    fn has_search(&self) -> bool {
        true
    }

    async fn search_name(&self, symbol: &str) -> ProviderResult<Option<String>> {
        let search = self.search(symbol).await?;
        Ok(search_name(symbol, &search))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[async_trait]
impl QuoteProvider for YahooFinance {
    async fn quote(&self, symbol: &str) -> ProviderResult<PriceInfo> {
        let meta = self.chart_meta(symbol).await?;
        Ok(price_info(&meta))
    }

    async fn headlines(&self, symbol: &str) -> ProviderResult<Vec<String>> {
        let search = self.search(symbol).await?;
        Ok(select_headlines(symbol, &search.news))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart() -> serde_json::Value {
        json!({
            "chart": {
                "result": [{
                    "meta": {
                        "currency": "USD",
                        "symbol": "GME",
                        "regularMarketPrice": 25.0,
                        "chartPreviousClose": 20.0,
                        "regularMarketTime": 1700000000,
                        "longName": "GameStop Corp.",
                        "shortName": "GameStop Corporation"
                    },
                    "timestamp": [1700000000]
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_parse_chart_into_price_info() {
        let meta = parse_chart(chart()).unwrap();
        let info = price_info(&meta);

        assert_eq!(info.price, Some(25.0));
        assert_eq!(info.previous_close, Some(20.0));
        assert_eq!(info.change, Some(5.0));
        assert_eq!(info.change_percent, Some(25.0));
        assert_eq!(info.currency.as_deref(), Some("USD"));
        assert_eq!(info.timestamp.map(|t| t.timestamp()), Some(1_700_000_000));
        assert_eq!(info.pre_market, None);
    }

    #[test]
    fn test_chart_error_is_api_error() {
        let value = json!({
            "chart": { "result": null, "error": { "code": "Not Found", "description": "No data found" } }
        });
        assert!(matches!(parse_chart(value), Err(ProviderError::Api { .. })));
    }

    #[test]
    fn test_chart_name_prefers_long_name() {
        let meta = parse_chart(chart()).unwrap();
        assert_eq!(chart_name("GME", &meta), Some("GameStop Corp.".to_string()));

        let bare = ChartMeta {
            long_name: Some("GME".into()),
            ..Default::default()
        };
        assert_eq!(chart_name("GME", &bare), None);
    }

    #[test]
    fn test_search_name_requires_exact_symbol() {
        let search: SearchResponse = serde_json::from_value(json!({
            "quotes": [
                { "symbol": "GMEV", "shortname": "Other" },
                { "symbol": "GME", "shortname": "GameStop Corporation" }
            ]
        }))
        .unwrap();

        assert_eq!(search_name("GME", &search), Some("GameStop Corporation".to_string()));
        assert_eq!(search_name("AMC", &search), None);
    }

    #[test]
    fn test_headlines_prefer_related() {
        let news: Vec<SearchNews> = serde_json::from_value(json!([
            { "title": "Market wrap", "relatedTickers": ["SPY"] },
            { "title": "GameStop rallies", "relatedTickers": ["GME"] },
            { "title": "Fed minutes" },
            { "title": "GameStop earnings", "relatedTickers": ["GME", "AMC"] }
        ]))
        .unwrap();

        assert_eq!(
            select_headlines("GME", &news),
            vec!["GameStop rallies", "GameStop earnings", "Market wrap", "Fed minutes"]
        );
    }
}
