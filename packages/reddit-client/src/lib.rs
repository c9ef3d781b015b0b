//! Pure Reddit REST API client.
//!
//! A minimal read-only client using application-only OAuth
//! (client credentials). Supports listing the newest submissions of a
//! subreddit and fetching a submission with its comment tree.
//!
//! # Example
//!
//! ```rust,ignore
//! use reddit_client::{Credentials, RedditClient};
//!
//! let client = RedditClient::new(Credentials {
//!     client_id: "id".into(),
//!     client_secret: "secret".into(),
//!     user_agent: "ticker-pulse/0.1".into(),
//! });
//!
//! for link in client.new_posts("wallstreetbets", 100).await? {
//!     let thread = client.thread("wallstreetbets", &link.id).await?;
//!     println!("{} ({} comments)", thread.link.title, thread.comments.len());
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{RedditError, Result};
pub use types::{Comment, Link, Thread};

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use types::{Listing, TokenResponse};

const AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_URL: &str = "https://oauth.reddit.com";

/// Refresh the token this long before Reddit would expire it.
const TOKEN_SLACK: Duration = Duration::from_secs(60);

/// Per-request timeout of the default HTTP client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct RedditClient {
    client: reqwest::Client,
    credentials: Credentials,
    api_url: String,
    auth_url: String,
    token: Mutex<Option<AccessToken>>,
    /// Bound on a token refresh, which holds the token lock
    auth_timeout: Duration,
}

impl RedditClient {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            client: http_client(DEFAULT_TIMEOUT),
            credentials,
            api_url: API_URL.to_string(),
            auth_url: AUTH_URL.to_string(),
            token: Mutex::new(None),
            auth_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Point the client at different endpoints.
    pub fn with_base_urls(mut self, api_url: impl Into<String>, auth_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self.auth_url = auth_url.into();
        self
    }

    /// Bound a token refresh. Other requests wait for the refresh, so
    /// this also bounds how long they can be stalled by it.
    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Return a valid bearer token, fetching a new one when missing or about to expire.
    async fn bearer(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_SLACK {
                return Ok(token.value.clone());
            }
        }

        let token = tokio::time::timeout(self.auth_timeout, self.request_token())
            .await
            .map_err(|_| {
                RedditError::Auth(format!("token request timed out after {:?}", self.auth_timeout))
            })??;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn request_token(&self) -> Result<AccessToken> {
        tracing::debug!("Requesting Reddit access token");
        let resp = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .header(reqwest::header::USER_AGENT, &self.credentials.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RedditError::Auth(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let token: TokenResponse = resp.json().await?;
        Ok(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        let token = self.bearer().await?;
        let url = format!("{}{}", self.api_url, path);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, &self.credentials.user_agent)
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RedditError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    /// Newest submissions of a subreddit, newest first.
    pub async fn new_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<Link>> {
        let path = format!("/r/{}/new", subreddit);
        let value = self
            .get_json(&path, &[("limit", limit.to_string()), ("raw_json", "1".into())])
            .await?;
        let listing: Listing = serde_json::from_value(value)?;

        let links: Vec<Link> = listing
            .data
            .children
            .into_iter()
            .filter(|c| c.kind == "t3")
            .filter_map(|c| serde_json::from_value(c.data).ok())
            .collect();

        tracing::debug!(subreddit, count = links.len(), "Fetched new posts");
        Ok(links)
    }

    /// A submission with its full (already loaded) comment tree.
    pub async fn thread(&self, subreddit: &str, id: &str) -> Result<Thread> {
        let path = format!("/r/{}/comments/{}", subreddit, id);
        let value = self
            .get_json(&path, &[("limit", "500".into()), ("raw_json", "1".into())])
            .await?;
        Thread::from_response(value)
    }
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}
