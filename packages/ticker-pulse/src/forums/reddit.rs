//! Reddit-backed forum source.

use async_trait::async_trait;
use reddit_client::{Link, RedditClient};

use crate::credentials::RedditCredentials;
use crate::error::ForumResult;
use crate::traits::ForumSource;
use crate::types::{ThreadContent, ThreadSummary};

/// Subreddits as forum sections.
pub struct RedditForum {
    client: RedditClient,
}

impl RedditForum {
    pub fn new(credentials: &RedditCredentials) -> Self {
        Self {
            client: RedditClient::new(credentials.to_client_credentials()),
        }
    }

    /// Wrap an already configured client.
    pub fn with_client(client: RedditClient) -> Self {
        Self { client }
    }
}

fn summarize(section: &str, link: Link) -> ThreadSummary {
    let url = link.url();
    ThreadSummary::new(link.id.clone(), section, link.title.clone(), link.created_at()).with_url(url)
}

#[async_trait]
impl ForumSource for RedditForum {
    async fn recent_threads(&self, section: &str, limit: u32) -> ForumResult<Vec<ThreadSummary>> {
        let links = self.client.new_posts(section, limit).await?;
        Ok(links.into_iter().map(|link| summarize(section, link)).collect())
    }

    async fn fetch_thread(&self, section: &str, id: &str) -> ForumResult<ThreadContent> {
        let thread = self.client.thread(section, id).await?;
        Ok(ThreadContent::from(thread))
    }

    fn name(&self) -> &str {
        "reddit"
    }
}
