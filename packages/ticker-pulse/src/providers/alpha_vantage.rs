//! Alpha Vantage company lookups (secondary name source).

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{http_client, is_usable_name};
use crate::credentials::SecretString;
use crate::error::{ProviderError, ProviderResult};
use crate::traits::NameProvider;

const PROVIDER: &str = "alpha_vantage";
const BASE_URL: &str = "https://www.alphavantage.co/query";

pub struct AlphaVantage {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl AlphaVantage {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: http_client(Duration::from_secs(15)),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn query(&self, params: &[(&str, &str)]) -> ProviderResult<Value> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", self.api_key.expose())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        let value: Value = resp.json().await?;
        check_throttle(&value)?;
        Ok(value)
    }
}

/// Alpha Vantage reports quota exhaustion with a 200 and a `Note` or
/// `Information` field.
fn check_throttle(value: &Value) -> ProviderResult<()> {
    for key in ["Note", "Information"] {
        if let Some(message) = value.get(key).and_then(Value::as_str) {
            return Err(ProviderError::Throttled {
                provider: PROVIDER,
                message: message.to_string(),
            });
        }
    }
    Ok(())
}

fn overview_name(symbol: &str, value: &Value) -> Option<String> {
    value
        .get("Name")
        .and_then(Value::as_str)
        .filter(|name| is_usable_name(symbol, name))
        .map(|name| name.trim().to_string())
}

fn search_name(symbol: &str, value: &Value) -> Option<String> {
    value
        .get("bestMatches")
        .and_then(Value::as_array)?
        .iter()
        .filter(|m| m.get("1. symbol").and_then(Value::as_str) == Some(symbol))
        .filter_map(|m| m.get("2. name").and_then(Value::as_str))
        .find(|name| is_usable_name(symbol, name))
        .map(|name| name.trim().to_string())
}

#[async_trait]
impl NameProvider for AlphaVantage {
    /// Company overview.
    async fn lookup_name(&self, symbol: &str) -> ProviderResult<Option<String>> {
        let overview = self
            .query(&[("function", "OVERVIEW"), ("symbol", symbol)])
            .await?;
        Ok(overview_name(symbol, &overview))
    }

    fn has_search(&self) -> bool {
        true
    }

    async fn search_name(&self, symbol: &str) -> ProviderResult<Option<String>> {
        let search = self
            .query(&[("function", "SYMBOL_SEARCH"), ("keywords", symbol)])
            .await?;
        Ok(search_name(symbol, &search))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overview_name() {
        let value = json!({ "Symbol": "IBM", "Name": "International Business Machines" });
        assert_eq!(
            overview_name("IBM", &value),
            Some("International Business Machines".to_string())
        );
        assert_eq!(overview_name("IBM", &json!({})), None);
    }

    #[test]
    fn test_search_name_exact_symbol_only() {
        let value = json!({
            "bestMatches": [
                { "1. symbol": "GMEV", "2. name": "Other Co" },
                { "1. symbol": "GME", "2. name": "GameStop Corp" }
            ]
        });
        assert_eq!(search_name("GME", &value), Some("GameStop Corp".to_string()));
        assert_eq!(search_name("AMC", &value), None);
    }

    #[test]
    fn test_throttle_note_is_error() {
        let value = json!({ "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute" });
        assert!(matches!(
            check_throttle(&value),
            Err(ProviderError::Throttled { .. })
        ));
        assert!(check_throttle(&json!({ "Name": "x" })).is_ok());
    }

    #[test]
    fn test_key_not_in_debug() {
        let provider = AlphaVantage::new(SecretString::new("demo-key"));
        assert!(!format!("{:?}", provider.api_key).contains("demo-key"));
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        let provider = AlphaVantage::new(SecretString::new("SECRETKEY"))
            .with_base_url("http://127.0.0.1:1/query");

        let err = provider.lookup_name("IBM").await.unwrap_err();

        assert!(matches!(err, ProviderError::Http(_)));
        assert!(!err.to_string().contains("SECRETKEY"));
        assert!(!format!("{:?}", err).contains("SECRETKEY"));
    }
}
