//! Summarization seam.
//!
//! The pipeline only assembles the context and embeds whatever text comes
//! back. Quality of the synopsis is up to the implementation.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::error::SummaryError;
use crate::types::PriceInfo;

/// Everything a summarizer gets to see about one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryContext {
    pub symbol: String,
    pub company_name: Option<String>,
    /// Mentions per forum section in the current run.
    pub mentions: BTreeMap<String, u64>,
    pub price: Option<PriceInfo>,
    pub headlines: Vec<String>,
}

impl SummaryContext {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            company_name: None,
            mentions: BTreeMap::new(),
            price: None,
            headlines: Vec::new(),
        }
    }

    pub fn with_company_name(mut self, name: Option<String>) -> Self {
        self.company_name = name;
        self
    }

    pub fn with_mentions(mut self, mentions: BTreeMap<String, u64>) -> Self {
        self.mentions = mentions;
        self
    }

    pub fn with_price(mut self, price: Option<PriceInfo>) -> Self {
        self.price = price;
        self
    }

    pub fn with_headlines(mut self, headlines: Vec<String>) -> Self {
        self.headlines = headlines;
        self
    }

    /// Plain-text rendering suitable as model input.
    pub fn render(&self) -> String {
        let mut out = String::new();
        match &self.company_name {
            Some(name) => {
                let _ = writeln!(out, "Ticker: {} ({})", self.symbol, name);
            }
            None => {
                let _ = writeln!(out, "Ticker: {}", self.symbol);
            }
        }

        if !self.mentions.is_empty() {
            out.push_str("Mentions:\n");
            for (section, count) in &self.mentions {
                let _ = writeln!(out, "- r/{}: {}", section, count);
            }
        }

        match self.price.as_ref().and_then(|p| p.price.map(|price| (p, price))) {
            Some((info, price)) => {
                let currency = info.currency.as_deref().unwrap_or("");
                let _ = write!(out, "Price: {:.2} {}", price, currency);
                if let Some(pct) = info.change_percent {
                    let _ = write!(out, " ({:+.2}%)", pct);
                }
                out.push('\n');
            }
            None => out.push_str("Price: unavailable\n"),
        }

        if self.headlines.is_empty() {
            out.push_str("No recent headlines available.\n");
        } else {
            out.push_str("Recent headlines:\n");
            for headline in &self.headlines {
                let _ = writeln!(out, "- {}", headline);
            }
        }
        out
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// A short synopsis for the alert message. Empty means "nothing to add".
    async fn summarize(&self, context: &SummaryContext) -> Result<String, SummaryError>;
}

#[async_trait]
impl<S: Summarizer + ?Sized> Summarizer for std::sync::Arc<S> {
    async fn summarize(&self, context: &SummaryContext) -> Result<String, SummaryError> {
        (**self).summarize(context).await
    }
}

/// Summarizer that never produces a synopsis.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSummarizer;

#[async_trait]
impl Summarizer for NoopSummarizer {
    async fn summarize(&self, _context: &SummaryContext) -> Result<String, SummaryError> {
        Ok(String::new())
    }
}
