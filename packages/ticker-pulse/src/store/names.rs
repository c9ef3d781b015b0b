//! Persistent name cache (`ticker_names.json`) with a CSV export next to it.

use std::path::{Path, PathBuf};

use super::{read_json, write_atomic, write_json};
use crate::error::StoreResult;
use crate::tabular;
use crate::types::NameCache;

const CSV_HEADER: [&str; 4] = ["Ticker", "Company", "Provider", "ResolvedAt"];

#[derive(Debug, Clone)]
pub struct NameCacheStore {
    path: PathBuf,
    csv_path: Option<PathBuf>,
}

impl NameCacheStore {
    /// Store at `path`; the CSV export goes to the same path with a `.csv`
    /// extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let csv_path = Some(path.with_extension("csv"));
        Self { path, csv_path }
    }

    /// Skip the CSV export.
    pub fn without_export(mut self) -> Self {
        self.csv_path = None;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn csv_path(&self) -> Option<&Path> {
        self.csv_path.as_deref()
    }

    pub fn load(&self) -> StoreResult<NameCache> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    /// Write the whole cache, then refresh the CSV export.
    pub fn save(&self, cache: &NameCache) -> StoreResult<()> {
        write_json(&self.path, cache)?;
        if let Some(csv_path) = &self.csv_path {
            write_atomic(csv_path, render_csv(cache).as_bytes())?;
        }
        Ok(())
    }
}

/// Tabular export: `Ticker,Company,Provider,ResolvedAt`, one row per symbol.
pub fn render_csv(cache: &NameCache) -> String {
    let mut out = tabular::join_line(CSV_HEADER);
    out.push('\n');
    for entry in cache.entries() {
        let resolved_at = entry.resolved_at.to_rfc3339();
        out.push_str(&tabular::join_line([
            entry.symbol.as_str(),
            entry.company_name.as_str(),
            entry.provider.as_str(),
            resolved_at.as_str(),
        ]));
        out.push('\n');
    }
    out
}
