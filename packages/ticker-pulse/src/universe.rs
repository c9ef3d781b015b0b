//! The symbol universe: which tickers the crawler looks for.
//!
//! Loaded from either a CSV with `Symbol` and `Security Name` (or
//! `Company Name`) columns, or a plain list with one symbol per line.
//! Funds, trusts, warrants and similar instruments are dropped by name,
//! as are blacklisted symbols that mostly occur as ordinary words.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::crawl::matcher::is_valid_symbol;
use crate::error::{PulseError, Result};
use crate::tabular;

/// Symbols that are common words or slang on the forums.
pub const DEFAULT_BLACKLIST: &[&str] = &["AI", "IT", "TV", "NO", "GO", "BE", "SO", "OP", "DD"];

/// Matched case-insensitively anywhere in the security name.
const EXCLUDED_NAME_TERMS: &[&str] = &[
    "etf", "fund", "trust", "warrant", "test", "notes", "depositary", "spac",
];

const NAME_COLUMNS: &[&str] = &["Security Name", "Company Name", "Company", "Name"];

pub fn default_blacklist() -> BTreeSet<String> {
    DEFAULT_BLACKLIST.iter().map(|s| s.to_string()).collect()
}

/// Active symbols plus the local reference names they came with.
#[derive(Debug, Clone, Default)]
pub struct SymbolUniverse {
    /// Symbol -> security name (empty when the source had none)
    entries: BTreeMap<String, String>,
}

impl SymbolUniverse {
    /// Build from `(symbol, name)` pairs, applying validity, blacklist and
    /// instrument-name filters. The first entry of a duplicated symbol wins.
    pub fn from_entries<I>(entries: I, blacklist: &BTreeSet<String>) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut out = BTreeMap::new();
        let mut dropped = 0usize;

        for (symbol, name) in entries {
            let symbol = symbol.trim().to_string();
            let name = name.map(|n| n.trim().to_string()).unwrap_or_default();

            if !is_valid_symbol(&symbol)
                || blacklist.contains(&symbol)
                || is_excluded_name(&name)
            {
                dropped += 1;
                continue;
            }
            out.entry(symbol).or_insert(name);
        }

        tracing::debug!(symbols = out.len(), dropped, "Symbol universe built");
        Self { entries: out }
    }

    /// Load from a CSV or plain list file.
    pub fn load(path: &Path, blacklist: &BTreeSet<String>) -> Result<Self> {
        if !path.exists() {
            tracing::error!(path = %path.display(), "Symbol universe file missing");
            return Err(PulseError::MissingUniverse {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| {
            PulseError::Store(crate::error::StoreError::io(path, source))
        })?;
        let universe = Self::parse(&content, blacklist);

        if universe.is_empty() {
            return Err(PulseError::EmptyUniverse {
                path: path.to_path_buf(),
            });
        }

        tracing::info!(path = %path.display(), symbols = universe.len(), "Loaded symbol universe");
        Ok(universe)
    }

    /// Parse file content. A first line containing a `Symbol` column marks
    /// a CSV; anything else is read as one symbol per line.
    pub fn parse(content: &str, blacklist: &BTreeSet<String>) -> Self {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty()).peekable();

        let header = lines.peek().map(|first| tabular::split_line(first));
        let symbol_col = header
            .as_ref()
            .and_then(|h| h.iter().position(|c| c.trim() == "Symbol"));

        let Some(symbol_col) = symbol_col else {
            let entries = lines.map(|line| (line.to_string(), None));
            return Self::from_entries(entries, blacklist);
        };

        let header = header.unwrap_or_default();
        let name_col = NAME_COLUMNS
            .iter()
            .find_map(|wanted| header.iter().position(|c| c.trim() == *wanted));
        lines.next();

        let entries = lines.filter_map(|line| {
            let fields = tabular::split_line(line);
            let symbol = fields.get(symbol_col)?.clone();
            let name = name_col.and_then(|col| fields.get(col).cloned());
            Some((symbol, name))
        });
        Self::from_entries(entries, blacklist)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    /// Security name from the universe file, if it had one.
    pub fn local_name(&self, symbol: &str) -> Option<&str> {
        self.entries
            .get(symbol)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_excluded_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    EXCLUDED_NAME_TERMS.iter().any(|term| lower.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_filters_instruments_and_blacklist() {
        let csv = "Symbol,Security Name,Exchange\n\
                   GME,GameStop Corp. Class A,NYSE\n\
                   SPY,SPDR S&P 500 ETF Trust,NYSE\n\
                   AI,C3.ai Inc.,NYSE\n\
                   AAPL,\"Apple Inc., Common Stock\",NASDAQ\n\
                   BRK.B,Berkshire Hathaway,NYSE\n\
                   XFND,Some Income fund,NASDAQ\n";

        let universe = SymbolUniverse::parse(csv, &default_blacklist());
        let symbols: Vec<_> = universe.symbols().collect();

        assert_eq!(symbols, vec!["AAPL", "GME"]);
        assert_eq!(universe.local_name("AAPL"), Some("Apple Inc., Common Stock"));
    }

    #[test]
    fn test_parse_company_name_column() {
        let csv = "Company Name,Symbol\nGameStop,GME\n";
        let universe = SymbolUniverse::parse(csv, &BTreeSet::new());
        assert_eq!(universe.local_name("GME"), Some("GameStop"));
    }

    #[test]
    fn test_parse_plain_list() {
        let universe = SymbolUniverse::parse("GME\nAMC\n\nDD\n", &default_blacklist());
        let symbols: Vec<_> = universe.symbols().collect();

        assert_eq!(symbols, vec!["AMC", "GME"]);
        assert_eq!(universe.local_name("GME"), None);
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = SymbolUniverse::load(&dir.path().join("nope.csv"), &default_blacklist());
        assert!(matches!(result, Err(PulseError::MissingUniverse { .. })));
    }

    #[test]
    fn test_load_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symbols.txt");
        std::fs::write(&path, "DD\nAI\n").unwrap();

        let result = SymbolUniverse::load(&path, &default_blacklist());
        assert!(matches!(result, Err(PulseError::EmptyUniverse { .. })));
    }
}
