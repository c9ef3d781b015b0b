//! Alert messages and the channels that deliver them.

pub mod discord;

pub use discord::DiscordWebhook;

use std::fmt::Write;

use crate::types::{PriceInfo, RunId, Trigger};

/// Hard cap of the notification channel.
pub const DEFAULT_MAX_LEN: usize = 2000;

const ELLIPSIS: char = '…';

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Messages are truncated to this many characters
    pub max_len: usize,

    /// Symbols enriched with market data besides the triggered ones
    pub top_n: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
            top_n: 5,
        }
    }
}

impl NotifyConfig {
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }
}

/// Everything shown about the headline ticker of an alert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerDetail {
    pub symbol: String,
    pub company_name: Option<String>,
    pub count: u64,
    pub previous: u64,
    pub price: Option<PriceInfo>,
    pub synopsis: Option<String>,
}

impl TickerDetail {
    pub fn new(symbol: impl Into<String>, previous: u64, count: u64) -> Self {
        Self {
            symbol: symbol.into(),
            previous,
            count,
            ..Default::default()
        }
    }

    pub fn with_company_name(mut self, name: Option<String>) -> Self {
        self.company_name = name;
        self
    }

    pub fn with_price(mut self, price: Option<PriceInfo>) -> Self {
        self.price = price;
        self
    }

    /// Blank synopses are dropped.
    pub fn with_synopsis(mut self, synopsis: Option<String>) -> Self {
        self.synopsis = synopsis.filter(|s| !s.trim().is_empty());
        self
    }
}

/// Alert for one run: which symbols triggered plus a detail block.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub run_id: RunId,
    pub triggers: Vec<Trigger>,
    pub detail: Option<TickerDetail>,
}

impl AlertMessage {
    pub fn new(run_id: RunId, triggers: Vec<Trigger>) -> Self {
        Self {
            run_id,
            triggers,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: TickerDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "**Ticker Pulse** run `{}`", self.run_id);

        if !self.triggers.is_empty() {
            let listed: Vec<String> = self.triggers.iter().map(describe_trigger).collect();
            let _ = writeln!(out, "Mention spike: {}", listed.join(", "));
        }

        if let Some(detail) = &self.detail {
            out.push('\n');
            render_detail(&mut out, detail);
        }

        out.trim_end().to_string()
    }

    /// Rendered and capped at `max_len` characters.
    pub fn render_capped(&self, max_len: usize) -> String {
        truncate_message(&self.render(), max_len)
    }
}

fn describe_trigger(trigger: &Trigger) -> String {
    if trigger.is_new() {
        format!("{} ({}, new)", trigger.symbol, trigger.curr_count)
    } else {
        format!(
            "{} ({} → {}, {:+})",
            trigger.symbol, trigger.prev_count, trigger.curr_count, trigger.delta
        )
    }
}

fn render_detail(out: &mut String, detail: &TickerDetail) {
    match &detail.company_name {
        Some(name) => {
            let _ = writeln!(out, "**{}** {}", detail.symbol, name);
        }
        None => {
            let _ = writeln!(out, "**{}**", detail.symbol);
        }
    }

    let delta = detail.count as i64 - detail.previous as i64;
    let _ = writeln!(
        out,
        "Mentions: {} ({:+} vs. previous run)",
        detail.count, delta
    );

    if let Some(line) = detail.price.as_ref().and_then(price_line) {
        let _ = writeln!(out, "{}", line);
    }

    if let Some(synopsis) = &detail.synopsis {
        out.push('\n');
        let _ = writeln!(out, "{}", synopsis.trim());
    }
}

/// `Price: 23.50 USD (+4.25%) | pre 23.10 | post 23.80`, or `None` when the
/// quote holds no prices at all.
pub fn price_line(info: &PriceInfo) -> Option<String> {
    if info.is_empty() {
        return None;
    }

    let mut parts = Vec::new();
    if let Some(price) = info.price {
        let mut head = format!("Price: {:.2}", price);
        if let Some(currency) = &info.currency {
            let _ = write!(head, " {}", currency);
        }
        if let Some(pct) = info.change_percent {
            let _ = write!(head, " ({:+.2}%)", pct);
        }
        parts.push(head);
    } else {
        parts.push("Price: n/a".to_string());
    }
    if let Some(pre) = info.pre_market {
        parts.push(format!("pre {:.2}", pre));
    }
    if let Some(post) = info.post_market {
        parts.push(format!("post {:.2}", post));
    }
    Some(parts.join(" | "))
}

/// Cut `text` to at most `max_len` characters, ending in `…` when cut.
pub fn truncate_message(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    if max_len == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(max_len - 1).collect();
    cut.push(ELLIPSIS);
    cut
}
