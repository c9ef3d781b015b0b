//! Run artifact store: one append-only JSON file per run.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

use super::{read_json, write_json};
use crate::error::{StoreError, StoreResult};
use crate::types::{Run, RunId};

const SUFFIX: &str = "_crawl.json";

/// Default time the consumer waits for a fresh run before falling back.
pub const DEFAULT_HANDOFF_TIMEOUT: Duration = Duration::from_secs(12);
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RunStore {
    dir: PathBuf,
    poll_interval: Duration,
}

impl RunStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, run_id: &RunId) -> PathBuf {
        self.dir.join(format!("{}{}", run_id, SUFFIX))
    }

    /// Persist a run. Existing runs are never overwritten.
    pub fn save(&self, run: &Run) -> StoreResult<PathBuf> {
        let path = self.path_for(&run.run_id);
        if path.exists() {
            return Err(StoreError::RunExists {
                run_id: run.run_id.to_string(),
            });
        }
        write_json(&path, run)?;
        tracing::info!(run_id = %run.run_id, path = %path.display(), "Run saved");
        Ok(path)
    }

    pub fn load(&self, run_id: &RunId) -> StoreResult<Option<Run>> {
        read_json(&self.path_for(run_id))
    }

    /// Ids of every stored run, oldest first.
    pub fn list_ids(&self) -> StoreResult<Vec<RunId>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut ids: Vec<RunId> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let name = name.to_str()?;
                RunId::parse(name.strip_suffix(SUFFIX)?)
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    pub fn latest_id(&self) -> StoreResult<Option<RunId>> {
        Ok(self.list_ids()?.pop())
    }

    pub fn latest(&self) -> StoreResult<Option<Run>> {
        match self.latest_id()? {
            Some(id) => self.load(&id),
            None => Ok(None),
        }
    }

    /// Wait for a run newer than `after` (any run when `None`).
    ///
    /// On timeout falls back to the newest run available, which may be
    /// `after` itself or nothing at all.
    pub async fn wait_for_newer(
        &self,
        after: Option<&RunId>,
        timeout: Duration,
    ) -> StoreResult<Option<Run>> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(latest) = self.latest_id()? {
                if after.map_or(true, |after| latest > *after) {
                    return self.load(&latest);
                }
            }

            if Instant::now() >= deadline {
                tracing::warn!(
                    after = ?after,
                    timeout_secs = timeout.as_secs(),
                    "No newer run appeared, falling back to latest"
                );
                return self.latest();
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubredditResult;
    use chrono::{TimeZone, Utc};

    fn run_at(secs: i64) -> Run {
        let started = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        Run::from_sections(
            RunId::at(started),
            started,
            vec![("stocks".to_string(), SubredditResult::default())],
            5,
        )
    }

    #[test]
    fn test_save_is_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path());
        let run = run_at(0);

        store.save(&run).unwrap();
        assert!(matches!(store.save(&run), Err(StoreError::RunExists { .. })));
        assert_eq!(store.load(&run.run_id).unwrap(), Some(run));
    }

    #[test]
    fn test_list_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path());
        let older = run_at(0);
        let newer = run_at(60);

        store.save(&newer).unwrap();
        store.save(&older).unwrap();
        std::fs::write(dir.path().join("stats.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes_crawl.json"), "{}").unwrap();

        assert_eq!(store.list_ids().unwrap(), vec![older.run_id, newer.run_id.clone()]);
        assert_eq!(store.latest().unwrap().map(|r| r.run_id), Some(newer.run_id));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path().join("runs"));
        assert!(store.list_ids().unwrap().is_empty());
        assert!(store.latest().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_newer_run_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path());
        let older = run_at(0);
        let newer = run_at(60);
        store.save(&older).unwrap();
        store.save(&newer).unwrap();

        let start = Instant::now();
        let found = store
            .wait_for_newer(Some(&older.run_id), DEFAULT_HANDOFF_TIMEOUT)
            .await
            .unwrap();

        assert_eq!(found.map(|r| r.run_id), Some(newer.run_id));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_falls_back_to_latest_on_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path());
        let only = run_at(0);
        store.save(&only).unwrap();

        let start = Instant::now();
        let found = store
            .wait_for_newer(Some(&only.run_id), Duration::from_secs(12))
            .await
            .unwrap();

        assert_eq!(found.map(|r| r.run_id), Some(only.run_id));
        assert!(start.elapsed() >= Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_with_no_runs_times_out_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path());

        let found = store.wait_for_newer(None, Duration::from_secs(3)).await.unwrap();
        assert!(found.is_none());
    }
}
