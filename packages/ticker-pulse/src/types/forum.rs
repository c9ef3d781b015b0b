//! Forum thread types, independent of any particular backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A thread as it appears in a section listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: String,
    pub section: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ThreadSummary {
    pub fn new(
        id: impl Into<String>,
        section: impl Into<String>,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            section: section.into(),
            title: title.into(),
            created_at,
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A fetched thread: the post itself plus every loaded comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadContent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub comments: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub score: i64,
}

impl ThreadContent {
    pub fn new(id: impl Into<String>, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: String::new(),
            comments: Vec::new(),
            created_at,
            url: None,
            score: 0,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Title and body joined with a space.
    pub fn post_text(&self) -> String {
        format!("{} {}", self.title, self.body)
    }

    /// Post text followed by every comment, space separated.
    pub fn full_text(&self) -> String {
        let mut text = self.post_text();
        for comment in &self.comments {
            text.push(' ');
            text.push_str(comment);
        }
        text
    }
}

impl From<reddit_client::Thread> for ThreadContent {
    fn from(thread: reddit_client::Thread) -> Self {
        let created_at = thread.link.created_at();
        let url = thread.link.url();
        Self {
            id: thread.link.id,
            title: thread.link.title,
            body: thread.link.selftext,
            comments: thread.comments.into_iter().map(|c| c.body).collect(),
            created_at,
            url: Some(url),
            score: thread.link.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_text_joins_post_and_comments() {
        let thread = ThreadContent::new("t1", "GME squeeze", Utc::now())
            .with_body("loaded up")
            .with_comment("same")
            .with_comment("AMC too");

        assert_eq!(thread.post_text(), "GME squeeze loaded up");
        assert_eq!(thread.full_text(), "GME squeeze loaded up same AMC too");
    }
}
