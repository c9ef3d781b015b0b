//! Tracing setup: stdout plus an optional plain-text copy in the crawl log.
//!
//! The log file is written through a [`LogFile`] handle that can be closed
//! before the file is archived, so nothing logged afterwards lands in the
//! archived copy.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,ticker_pulse=debug";

/// Shared, closable append handle on the crawl log.
#[derive(Clone)]
pub struct LogFile {
    file: Arc<Mutex<Option<File>>>,
}

impl LogFile {
    /// Open `path` for appending, creating it and its directory.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        Ok(Self {
            file: Arc::new(Mutex::new(Some(file))),
        })
    }

    /// Flush and release the file. Later writes are dropped.
    pub fn close(&self) {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut file) = guard.take() {
            let _ = file.flush();
        }
    }

    pub fn is_open(&self) -> bool {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self
            .file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self
            .file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install the global subscriber. With `log_path` set, events are also
/// appended to that file and the returned handle closes it.
pub fn init_tracing(log_path: Option<&Path>) -> Result<Option<LogFile>> {
    let log_file = log_path.map(LogFile::open).transpose()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());
    let file_layer = log_file.clone().map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(file_layer)
        .init();
    Ok(log_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_after_close_miss_the_moved_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("crawler.log");
        let log = LogFile::open(&path).unwrap();

        log.make_writer().write_all(b"before archive\n").unwrap();
        log.close();
        assert!(!log.is_open());

        let moved = dir.path().join("crawler_archived.log");
        std::fs::rename(&path, &moved).unwrap();
        log.make_writer().write_all(b"after archive\n").unwrap();

        assert_eq!(std::fs::read_to_string(&moved).unwrap(), "before archive\n");
        assert!(!path.exists());
    }

    #[test]
    fn test_open_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawler.log");
        std::fs::write(&path, "first\n").unwrap();

        let log = LogFile::open(&path).unwrap();
        log.make_writer().write_all(b"second\n").unwrap();
        log.close();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
