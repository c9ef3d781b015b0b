//! Symbol matching over thread text.
//!
//! A symbol counts once per standalone occurrence, optionally prefixed with
//! `$`. "Standalone" means no word character directly before or after it,
//! so `GME` matches in `$GME!` and `(GME)` but not in `GMEX` or `AGME`.
//! Matching is case-sensitive.

use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;

/// Default cap on scanned text, in characters.
pub const DEFAULT_MAX_TEXT_LEN: usize = 50_000;

/// Compiled alternation of every active symbol.
#[derive(Debug, Clone)]
pub struct SymbolMatcher {
    regex: Option<Regex>,
    max_text_len: usize,
}

impl SymbolMatcher {
    /// Build a matcher for `symbols`. Symbols that are not purely
    /// alphanumeric are skipped.
    pub fn new<I, S>(symbols: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut symbols: Vec<String> = symbols
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| is_valid_symbol(s))
            .collect();
        symbols.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        symbols.dedup();

        if symbols.is_empty() {
            return Ok(Self {
                regex: None,
                max_text_len: DEFAULT_MAX_TEXT_LEN,
            });
        }

        let alternation = symbols
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        let regex = RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
            .size_limit(64 * (1 << 20))
            .dfa_size_limit(64 * (1 << 20))
            .build()?;

        tracing::debug!(symbols = symbols.len(), "Compiled symbol matcher");
        Ok(Self {
            regex: Some(regex),
            max_text_len: DEFAULT_MAX_TEXT_LEN,
        })
    }

    pub fn with_max_text_len(mut self, max_text_len: usize) -> Self {
        self.max_text_len = max_text_len;
        self
    }

    /// Occurrences of each symbol in `text`, truncated to the length cap.
    /// Symbols without a hit are absent.
    pub fn count(&self, text: &str) -> BTreeMap<String, u64> {
        let mut hits = BTreeMap::new();
        let Some(regex) = &self.regex else {
            return hits;
        };

        for m in regex.find_iter(truncate_chars(text, self.max_text_len)) {
            *hits.entry(m.as_str().to_string()).or_insert(0) += 1;
        }
        hits
    }
}

/// Matches of a single symbol, distinguishing `$SYM` from bare `SYM`.
#[derive(Debug, Clone)]
pub struct VariantMatcher {
    regex: Regex,
}

impl VariantMatcher {
    pub fn new(symbol: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(r"\$?\b{}\b", regex::escape(symbol)))?;
        Ok(Self { regex })
    }

    /// Occurrence count per spelling (`GME`, `$GME`).
    pub fn variants(&self, text: &str) -> BTreeMap<String, u64> {
        let mut out = BTreeMap::new();
        for m in self.regex.find_iter(text) {
            *out.entry(m.as_str().to_string()).or_insert(0) += 1;
        }
        out
    }

    pub fn count(&self, text: &str) -> u64 {
        self.regex.find_iter(text).count() as u64
    }
}

/// Ticker symbols are non-empty ASCII alphanumerics.
pub fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty() && symbol.chars().all(|c| c.is_ascii_alphanumeric())
}

/// The first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(s, c)| (s.to_string(), *c)).collect()
    }

    #[test]
    fn test_counts_every_occurrence() {
        let matcher = SymbolMatcher::new(["GME", "AMC"]).unwrap();
        let hits = matcher.count("GME GME $GME and AMC. gme");

        assert_eq!(hits, counts(&[("AMC", 1), ("GME", 3)]));
    }

    #[test]
    fn test_requires_word_boundaries() {
        let matcher = SymbolMatcher::new(["GME", "BB"]).unwrap();

        assert!(matcher.count("GMEX AGME BBB _GME GME_ 1GME").is_empty());
        assert_eq!(matcher.count("(GME), GME! \"BB\""), counts(&[("BB", 1), ("GME", 2)]));
    }

    #[test]
    fn test_prefers_longer_symbols() {
        let matcher = SymbolMatcher::new(["A", "AA", "AAL"]).unwrap();
        assert_eq!(matcher.count("AAL AA A"), counts(&[("A", 1), ("AA", 1), ("AAL", 1)]));
    }

    #[test]
    fn test_skips_invalid_symbols() {
        let matcher = SymbolMatcher::new(["BRK.B", "", "GME"]).unwrap();
        assert_eq!(matcher.count("BRK.B GME"), counts(&[("GME", 1)]));
    }

    #[test]
    fn test_truncates_text() {
        let matcher = SymbolMatcher::new(["GME"]).unwrap().with_max_text_len(8);
        // "ééé GME " is 8 chars, the second GME falls outside
        assert_eq!(matcher.count("ééé GME GME"), counts(&[("GME", 1)]));
    }

    #[test]
    fn test_empty_universe_matches_nothing() {
        let matcher = SymbolMatcher::new(Vec::<String>::new()).unwrap();
        assert!(matcher.count("GME AMC").is_empty());
    }

    #[test]
    fn test_variant_matcher() {
        let matcher = VariantMatcher::new("GME").unwrap();
        let text = "$GME GME GMEX $GME";

        assert_eq!(matcher.variants(text), counts(&[("$GME", 2), ("GME", 1)]));
        assert_eq!(matcher.count(text), 3);
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("äöü", 2), "äö");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
