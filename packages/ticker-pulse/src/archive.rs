//! Content-addressed log archiving.
//!
//! At process exit the crawl log is moved into an archive directory under a
//! timestamped name, unless an archived file of the same base name already
//! has the same fingerprint. Optionally only the newest `keep_last`
//! archives of that base name are kept.

use chrono::{DateTime, Local, Utc};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

use crate::error::{ArchiveError, ArchiveResult};

/// Files larger than two chunks are fingerprinted by head and tail only.
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
const TIMESTAMP_LEN: usize = 15;

/// One archived log file.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedLogEntry {
    /// SHA-256 fingerprint, lowercase hex
    pub content_hash: String,
    pub file_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveOutcome {
    /// Moved into the archive; `pruned` lists archives removed by retention.
    Archived {
        entry: ArchivedLogEntry,
        pruned: Vec<PathBuf>,
    },
    /// An identical archive exists; the source was left in place.
    Duplicate { existing: PathBuf },
    /// Nothing to archive.
    Missing,
}

#[derive(Debug, Clone)]
pub struct LogArchiver {
    chunk_size: u64,
}

impl Default for LogArchiver {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl LogArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// SHA-256 of the whole file, or of its first and last chunk when it is
    /// larger than two chunks.
    pub fn fingerprint(&self, path: &Path) -> std::io::Result<String> {
        let mut file = File::open(path)?;
        let size = file.metadata()?.len();
        let mut hasher = Sha256::new();

        if size > 2 * self.chunk_size {
            let mut chunk = vec![0u8; self.chunk_size as usize];
            file.read_exact(&mut chunk)?;
            hasher.update(&chunk);
            file.seek(SeekFrom::End(-(self.chunk_size as i64)))?;
            file.read_exact(&mut chunk)?;
            hasher.update(&chunk);
        } else {
            let mut data = Vec::with_capacity(size as usize);
            file.read_to_end(&mut data)?;
            hasher.update(&data);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    pub fn archive(
        &self,
        log_path: &Path,
        archive_dir: &Path,
        keep_last: Option<usize>,
    ) -> ArchiveResult<ArchiveOutcome> {
        self.archive_at(log_path, archive_dir, keep_last, Local::now())
    }

    /// Archive using `now` for the timestamped name.
    pub fn archive_at(
        &self,
        log_path: &Path,
        archive_dir: &Path,
        keep_last: Option<usize>,
        now: DateTime<Local>,
    ) -> ArchiveResult<ArchiveOutcome> {
        if !log_path.exists() {
            debug!(path = %log_path.display(), "No log file to archive");
            return Ok(ArchiveOutcome::Missing);
        }

        let name = BaseName::of(log_path)?;
        std::fs::create_dir_all(archive_dir).map_err(|e| ArchiveError::io(archive_dir, e))?;

        let content_hash = self
            .fingerprint(log_path)
            .map_err(|e| ArchiveError::io(log_path, e))?;

        for existing in name.archived_in(archive_dir)? {
            match self.fingerprint(&existing) {
                Ok(hash) if hash == content_hash => {
                    info!(
                        existing = %existing.display(),
                        "Identical log already archived, skipping"
                    );
                    return Ok(ArchiveOutcome::Duplicate { existing });
                }
                Ok(_) => {}
                Err(e) => debug!(path = %existing.display(), error = %e, "Cannot fingerprint archive"),
            }
        }

        let target = name.target_in(archive_dir, &now.format(TIMESTAMP_FORMAT).to_string());
        move_file(log_path, &target)?;
        info!(target = %target.display(), hash = %content_hash, "Log archived");

        let pruned = match keep_last {
            Some(keep) => name.prune(archive_dir, keep)?,
            None => Vec::new(),
        };

        Ok(ArchiveOutcome::Archived {
            entry: ArchivedLogEntry {
                content_hash,
                file_path: target,
                created_at: now.with_timezone(&Utc),
            },
            pruned,
        })
    }
}

/// Stem and extension of the log being archived.
struct BaseName {
    stem: String,
    ext: Option<String>,
}

impl BaseName {
    fn of(path: &Path) -> ArchiveResult<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ArchiveError::InvalidPath(path.to_path_buf()))?;
        let ext = path.extension().and_then(|e| e.to_str());
        Ok(Self {
            stem: stem.to_string(),
            ext: ext.map(str::to_string),
        })
    }

    fn file_name(&self, timestamp: &str) -> String {
        match &self.ext {
            Some(ext) => format!("{}_{}.{}", self.stem, timestamp, ext),
            None => format!("{}_{}", self.stem, timestamp),
        }
    }

    /// Timestamp and collision suffix of `<stem>_<timestamp>[-N].<ext>`.
    /// Any other file name, including longer stems, is not ours.
    fn parse<'a>(&self, file_name: &'a str) -> Option<(&'a str, u32)> {
        let rest = file_name.strip_prefix(self.stem.as_str())?.strip_prefix('_')?;
        let middle = match &self.ext {
            Some(ext) => rest.strip_suffix(ext.as_str())?.strip_suffix('.')?,
            None => rest,
        };

        let (timestamp, suffix) = match middle.get(TIMESTAMP_LEN..)? {
            "" => (middle, 0),
            tail => {
                let digits = tail.strip_prefix('-')?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                (&middle[..TIMESTAMP_LEN], digits.parse().ok()?)
            }
        };
        is_timestamp(timestamp).then_some((timestamp, suffix))
    }

    /// Unused archive path for `timestamp`, adding `-1`, `-2`, ... on collision.
    fn target_in(&self, dir: &Path, timestamp: &str) -> PathBuf {
        let mut candidate = dir.join(self.file_name(timestamp));
        let mut n = 1;
        while candidate.exists() {
            candidate = dir.join(self.file_name(&format!("{}-{}", timestamp, n)));
            n += 1;
        }
        candidate
    }

    fn archived_in(&self, dir: &Path) -> ArchiveResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir).map_err(|e| ArchiveError::io(dir, e))?;
        Ok(entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|e| e.file_name().to_str().is_some_and(|n| self.parse(n).is_some()))
            .map(|e| e.path())
            .collect())
    }

    /// Delete all but the newest `keep` archives: by mtime, then name
    /// timestamp, then collision suffix.
    fn prune(&self, dir: &Path, keep: usize) -> ArchiveResult<Vec<PathBuf>> {
        let mut archived: Vec<(SystemTime, String, u32, PathBuf)> = self
            .archived_in(dir)?
            .into_iter()
            .filter_map(|path| {
                let (timestamp, suffix) = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| self.parse(n))
                    .map(|(timestamp, suffix)| (timestamp.to_string(), suffix))?;
                let modified = std::fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, timestamp, suffix, path))
            })
            .collect();
        archived.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| b.2.cmp(&a.2))
        });

        let mut pruned = Vec::new();
        for (_, _, _, path) in archived.into_iter().skip(keep) {
            std::fs::remove_file(&path).map_err(|e| ArchiveError::io(&path, e))?;
            info!(path = %path.display(), "Old log archive removed");
            pruned.push(path);
        }
        Ok(pruned)
    }
}

fn is_timestamp(s: &str) -> bool {
    s.len() == TIMESTAMP_LEN
        && s.bytes()
            .enumerate()
            .all(|(i, b)| if i == 8 { b == b'-' } else { b.is_ascii_digit() })
}

/// Rename, falling back to copy and delete across filesystems.
fn move_file(from: &Path, to: &Path) -> ArchiveResult<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to).map_err(|e| ArchiveError::io(to, e))?;
    std::fs::remove_file(from).map_err(|e| ArchiveError::io(from, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 1, h, m, s).unwrap()
    }

    fn write_log(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("crawler.log");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn archived(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = LogArchiver::new()
            .archive(&dir.path().join("crawler.log"), &dir.path().join("archive"), None)
            .unwrap();
        assert_eq!(outcome, ArchiveOutcome::Missing);
    }

    #[test]
    fn test_archives_with_timestamp_name() {
        let dir = tempfile::tempdir().unwrap();
        let archive_dir = dir.path().join("archive");
        let log = write_log(dir.path(), "run 1\n");

        let outcome = LogArchiver::new()
            .archive_at(&log, &archive_dir, None, at(12, 0, 0))
            .unwrap();

        match outcome {
            ArchiveOutcome::Archived { entry, pruned } => {
                assert_eq!(entry.file_path, archive_dir.join("crawler_20250301-120000.log"));
                assert_eq!(entry.content_hash.len(), 64);
                assert!(pruned.is_empty());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!log.exists());
    }

    #[test]
    fn test_same_bytes_archived_once() {
        let dir = tempfile::tempdir().unwrap();
        let archive_dir = dir.path().join("archive");
        let archiver = LogArchiver::new();

        let log = write_log(dir.path(), "identical\n");
        archiver.archive_at(&log, &archive_dir, None, at(12, 0, 0)).unwrap();

        let log = write_log(dir.path(), "identical\n");
        let outcome = archiver.archive_at(&log, &archive_dir, None, at(13, 0, 0)).unwrap();

        assert!(matches!(outcome, ArchiveOutcome::Duplicate { .. }));
        assert!(log.exists());
        assert_eq!(archived(&archive_dir), vec!["crawler_20250301-120000.log"]);
    }

    #[test]
    fn test_same_second_collision_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let archive_dir = dir.path().join("archive");
        let archiver = LogArchiver::new();

        archiver
            .archive_at(&write_log(dir.path(), "a"), &archive_dir, None, at(12, 0, 0))
            .unwrap();
        archiver
            .archive_at(&write_log(dir.path(), "b"), &archive_dir, None, at(12, 0, 0))
            .unwrap();

        assert_eq!(
            archived(&archive_dir),
            vec!["crawler_20250301-120000-1.log", "crawler_20250301-120000.log"]
        );
    }

    #[test]
    fn test_keep_last_prunes_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let archive_dir = dir.path().join("archive");
        std::fs::create_dir_all(&archive_dir).unwrap();

        let base = SystemTime::now() - Duration::from_secs(3600);
        for (i, name) in ["crawler_20250101-000000.log", "crawler_20250102-000000.log"]
            .iter()
            .enumerate()
        {
            let path = archive_dir.join(name);
            std::fs::write(&path, format!("old {}", i)).unwrap();
            File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(base + Duration::from_secs(i as u64 * 60))
                .unwrap();
        }
        std::fs::write(archive_dir.join("other_20250101-000000.log"), "x").unwrap();

        let outcome = LogArchiver::new()
            .archive_at(&write_log(dir.path(), "new"), &archive_dir, Some(2), at(12, 0, 0))
            .unwrap();

        match outcome {
            ArchiveOutcome::Archived { pruned, .. } => {
                assert_eq!(pruned, vec![archive_dir.join("crawler_20250101-000000.log")]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            archived(&archive_dir),
            vec![
                "crawler_20250102-000000.log",
                "crawler_20250301-120000.log",
                "other_20250101-000000.log",
            ]
        );
    }

    fn touch(path: &Path, content: &str, modified: SystemTime) {
        std::fs::write(path, content).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    #[test]
    fn test_prune_tie_keeps_highest_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let archive_dir = dir.path().join("archive");
        std::fs::create_dir_all(&archive_dir).unwrap();

        let same = SystemTime::now() - Duration::from_secs(3600);
        for (i, name) in [
            "crawler_20250301-120000.log",
            "crawler_20250301-120000-1.log",
            "crawler_20250301-120000-2.log",
        ]
        .iter()
        .enumerate()
        {
            touch(&archive_dir.join(name), &format!("log {}", i), same);
        }

        let outcome = LogArchiver::new()
            .archive_at(&write_log(dir.path(), "new"), &archive_dir, Some(2), at(13, 0, 0))
            .unwrap();

        match outcome {
            ArchiveOutcome::Archived { pruned, .. } => assert_eq!(
                pruned,
                vec![
                    archive_dir.join("crawler_20250301-120000-1.log"),
                    archive_dir.join("crawler_20250301-120000.log"),
                ]
            ),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            archived(&archive_dir),
            vec!["crawler_20250301-120000-2.log", "crawler_20250301-130000.log"]
        );
    }

    #[test]
    fn test_prune_ignores_logs_sharing_the_stem() {
        let dir = tempfile::tempdir().unwrap();
        let archive_dir = dir.path().join("archive");
        std::fs::create_dir_all(&archive_dir).unwrap();

        let old = SystemTime::now() - Duration::from_secs(3600);
        touch(&archive_dir.join("crawler_debug_20250101-000000.log"), "debug", old);
        touch(&archive_dir.join("crawler_notes.log"), "notes", old);
        touch(&archive_dir.join("crawler_20250101-000000.log.gz"), "gz", old);
        touch(&archive_dir.join("crawler_20250101-000000.log"), "old", old);

        let outcome = LogArchiver::new()
            .archive_at(&write_log(dir.path(), "new"), &archive_dir, Some(1), at(12, 0, 0))
            .unwrap();

        match outcome {
            ArchiveOutcome::Archived { pruned, .. } => {
                assert_eq!(pruned, vec![archive_dir.join("crawler_20250101-000000.log")]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            archived(&archive_dir),
            vec![
                "crawler_20250101-000000.log.gz",
                "crawler_20250301-120000.log",
                "crawler_debug_20250101-000000.log",
                "crawler_notes.log",
            ]
        );
    }

    #[test]
    fn test_large_files_fingerprint_head_and_tail() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = LogArchiver::new().with_chunk_size(4);

        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        std::fs::write(&a, "HEADxxxxxxxxTAIL").unwrap();
        std::fs::write(&b, "HEADyyyyyyyyTAIL").unwrap();

        assert_eq!(archiver.fingerprint(&a).unwrap(), archiver.fingerprint(&b).unwrap());

        let small = dir.path().join("small.log");
        std::fs::write(&small, "HEADTAIL").unwrap();
        assert_eq!(
            archiver.fingerprint(&small).unwrap(),
            hex::encode(Sha256::digest(b"HEADTAIL"))
        );
    }
}
