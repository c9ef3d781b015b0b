//! File-backed stores: run artifacts, the stats snapshot and the name cache.
//!
//! All writes go through a temp file followed by a rename, so readers see
//! either the old or the new content. Single process, single writer.

pub mod names;
pub mod runs;
pub mod snapshot;

pub use names::NameCacheStore;
pub use runs::{RunStore, DEFAULT_HANDOFF_TIMEOUT};
pub use snapshot::SnapshotStore;

use serde::{de::DeserializeOwned, Serialize};
use std::io::Write;
use std::path::Path;

use crate::error::{StoreError, StoreResult};

/// Write `bytes` to `path` atomically, creating parent directories.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    let mut file = std::fs::File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
    file.write_all(bytes).map_err(|e| StoreError::io(&tmp, e))?;
    file.sync_all().map_err(|e| StoreError::io(&tmp, e))?;
    drop(file);

    std::fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

/// Serialize `value` as pretty JSON and write it atomically.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::json(path, e))?;
    write_atomic(path, &bytes)
}

/// Read a JSON file. A missing file is `Ok(None)`.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::json(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_write_then_read_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("value.json");

        let mut value = BTreeMap::new();
        value.insert("GME".to_string(), 40u64);
        write_json(&path, &value).unwrap();

        let read: Option<BTreeMap<String, u64>> = read_json(&path).unwrap();
        assert_eq!(read, Some(value));
        assert!(!dir.path().join("nested").join("value.json.tmp").exists());
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let read: Option<BTreeMap<String, u64>> = read_json(&dir.path().join("nope.json")).unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn test_read_corrupt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let read: StoreResult<Option<BTreeMap<String, u64>>> = read_json(&path);
        assert!(matches!(read, Err(StoreError::Json { .. })));
    }
}
