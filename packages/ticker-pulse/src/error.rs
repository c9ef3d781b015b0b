//! Typed errors for the ticker-pulse library.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Only the binary and
//! configuration loading reach for `anyhow`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort or degrade a pipeline run.
#[derive(Debug, Error)]
pub enum PulseError {
    /// The symbol universe file does not exist. Fatal for a run.
    #[error("symbol universe not found: {path}")]
    MissingUniverse { path: PathBuf },

    /// The symbol universe file exists but contains no usable symbols
    #[error("symbol universe is empty: {path}")]
    EmptyUniverse { path: PathBuf },

    /// Forum backend failure
    #[error("forum error: {0}")]
    Forum(#[from] ForumError),

    /// Persistent store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The symbol matcher could not be compiled
    #[error("matcher error: {0}")]
    Matcher(#[from] regex::Error),
}

/// Errors from a discussion-forum backend.
#[derive(Debug, Error)]
pub enum ForumError {
    /// Reddit API failure
    #[error("reddit: {0}")]
    Reddit(#[from] reddit_client::RedditError),

    /// Section or thread not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend could not serve the request
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Errors from market-data and company-name providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed. Built through `From`, which drops the URL.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Provider answered with a non-success status
    #[error("{provider} returned {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// Provider signalled that its quota is exhausted
    #[error("{provider} throttled: {message}")]
    Throttled {
        provider: &'static str,
        message: String,
    },

    /// Response did not have the expected shape
    #[error("{provider} response not understood: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },
}

// Request URLs carry API keys and webhook tokens, and these errors end up
// in the log.
impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

/// Errors from the file-backed stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored JSON is unreadable
    #[error("malformed JSON at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Runs are append-only
    #[error("run already recorded: {run_id}")]
    RunExists { run_id: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Errors from the log archiver.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Log path has no file name to derive an archive name from
    #[error("not a log file path: {0}")]
    InvalidPath(PathBuf),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed. Built through `From`, which drops the URL.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Webhook rejected the message
    #[error("webhook rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

/// Errors from a summarization backend.
#[derive(Debug, Error)]
#[error("summarizer error: {0}")]
pub struct SummaryError(pub String);

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PulseError>;

/// Result type alias for forum operations.
pub type ForumResult<T> = std::result::Result<T, ForumError>;

/// Result type alias for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for archive operations.
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// Result type alias for notification operations.
pub type NotifyResult<T> = std::result::Result<T, NotifyError>;
