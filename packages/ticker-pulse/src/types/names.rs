//! Name cache types - resolved company names keyed by symbol.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Where a company name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameSource {
    /// Security name from the symbol universe file.
    Local,
    /// Primary market-data provider.
    PrimaryApi,
    /// Secondary financial-data provider.
    SecondaryApi,
}

impl NameSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "Local",
            Self::PrimaryApi => "PrimaryApi",
            Self::SecondaryApi => "SecondaryApi",
        }
    }
}

impl fmt::Display for NameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameEntry {
    pub symbol: String,
    pub company_name: String,
    pub provider: NameSource,
    pub resolved_at: DateTime<Utc>,
}

impl NameEntry {
    pub fn new(symbol: impl Into<String>, company_name: impl Into<String>, provider: NameSource) -> Self {
        Self {
            symbol: symbol.into(),
            company_name: company_name.into(),
            provider,
            resolved_at: Utc::now(),
        }
    }

    pub fn is_fresh(&self, max_age: Option<Duration>, now: DateTime<Utc>) -> bool {
        match max_age {
            Some(max_age) => now - self.resolved_at <= max_age,
            None => true,
        }
    }
}

/// Every resolved name. Grows without bound unless a max age is applied
/// on lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameCache {
    entries: BTreeMap<String, NameEntry>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry, treating entries older than `max_age` as misses.
    pub fn get_fresh(&self, symbol: &str, max_age: Option<Duration>) -> Option<&NameEntry> {
        let now = Utc::now();
        self.entries
            .get(symbol)
            .filter(|entry| entry.is_fresh(max_age, now))
    }

    pub fn get(&self, symbol: &str) -> Option<&NameEntry> {
        self.entries.get(symbol)
    }

    pub fn insert(&mut self, entry: NameEntry) {
        self.entries.insert(entry.symbol.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in symbol order.
    pub fn entries(&self) -> impl Iterator<Item = &NameEntry> {
        self.entries.values()
    }
}
