use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{RedditError, Result};

/// OAuth token response from `/api/v1/access_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// Generic listing envelope. Children stay untyped until their `kind` is known.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<RawThing>,
    pub after: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawThing {
    pub kind: String,
    pub data: Value,
}

/// A submission (`t3`).
#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u64,
}

impl Link {
    pub fn created_at(&self) -> DateTime<Utc> {
        epoch_to_utc(self.created_utc)
    }

    pub fn url(&self) -> String {
        format!("https://reddit.com{}", self.permalink)
    }
}

/// A comment (`t1`). `replies` is either an empty string or a nested listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub replies: Value,
}

/// A thread with its comment tree flattened depth-first.
#[derive(Debug, Clone)]
pub struct Thread {
    pub link: Link,
    pub comments: Vec<Comment>,
}

impl Thread {
    /// Build a thread from the two-listing array returned by `/comments/{id}`.
    pub fn from_response(value: Value) -> Result<Self> {
        let mut listings: Vec<Listing> = serde_json::from_value(value)?;
        if listings.len() < 2 {
            return Err(RedditError::Shape(format!(
                "expected 2 listings, got {}",
                listings.len()
            )));
        }
        let comment_listing = listings.remove(1);
        let post_listing = listings.remove(0);

        let link = post_listing
            .data
            .children
            .into_iter()
            .find(|c| c.kind == "t3")
            .ok_or_else(|| RedditError::Shape("thread listing has no t3 child".into()))
            .and_then(|c| serde_json::from_value::<Link>(c.data).map_err(RedditError::from))?;

        let mut comments = Vec::new();
        flatten_comments(comment_listing.data.children, &mut comments);

        Ok(Self { link, comments })
    }
}

/// Collect `t1` children recursively. `more` stubs are not expanded.
pub fn flatten_comments(children: Vec<RawThing>, out: &mut Vec<Comment>) {
    for child in children {
        if child.kind != "t1" {
            continue;
        }
        let Ok(mut comment) = serde_json::from_value::<Comment>(child.data) else {
            continue;
        };
        let replies = std::mem::take(&mut comment.replies);
        out.push(comment);

        if replies.is_object() {
            if let Ok(listing) = serde_json::from_value::<Listing>(replies) {
                flatten_comments(listing.data.children, out);
            }
        }
    }
}

pub(crate) fn epoch_to_utc(secs: f64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs as i64, 0)
        .single()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn comment(id: &str, body: &str, replies: Value) -> Value {
        json!({ "kind": "t1", "data": { "id": id, "body": body, "created_utc": 1.0, "replies": replies } })
    }

    #[test]
    fn test_thread_flattens_nested_replies() {
        let nested = json!({
            "kind": "Listing",
            "data": { "children": [comment("c2", "second", json!(""))], "after": null }
        });
        let response = json!([
            {
                "kind": "Listing",
                "data": {
                    "children": [{
                        "kind": "t3",
                        "data": { "id": "p1", "title": "GME to the moon", "selftext": "body", "created_utc": 1700000000.0 }
                    }],
                    "after": null
                }
            },
            {
                "kind": "Listing",
                "data": {
                    "children": [
                        comment("c1", "first", nested),
                        { "kind": "more", "data": { "count": 12, "children": ["x", "y"] } },
                        comment("c3", "third", json!(""))
                    ],
                    "after": null
                }
            }
        ]);

        let thread = Thread::from_response(response).unwrap();

        assert_eq!(thread.link.id, "p1");
        let ids: Vec<_> = thread.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(thread.link.selftext, "body");
    }

    #[test]
    fn test_thread_rejects_single_listing() {
        let response = json!([{ "kind": "Listing", "data": { "children": [], "after": null } }]);
        assert!(matches!(
            Thread::from_response(response),
            Err(RedditError::Shape(_))
        ));
    }

    #[test]
    fn test_link_created_at() {
        let link: Link = serde_json::from_value(json!({
            "id": "abc", "title": "t", "created_utc": 1700000000.0, "permalink": "/r/x/comments/abc/t/"
        }))
        .unwrap();

        assert_eq!(link.created_at().timestamp(), 1_700_000_000);
        assert_eq!(link.url(), "https://reddit.com/r/x/comments/abc/t/");
        assert!(link.selftext.is_empty());
    }
}
