//! Forum trait for listing and fetching discussion threads.

use async_trait::async_trait;

use crate::error::ForumResult;
use crate::types::{ThreadContent, ThreadSummary};

/// A discussion forum organised in sections (subreddits).
#[async_trait]
pub trait ForumSource: Send + Sync {
    /// Newest threads of a section, newest first.
    async fn recent_threads(&self, section: &str, limit: u32) -> ForumResult<Vec<ThreadSummary>>;

    /// A thread with its post text and loaded comments.
    async fn fetch_thread(&self, section: &str, id: &str) -> ForumResult<ThreadContent>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "forum"
    }
}
