//! Credential handling with secure memory.
//!
//! Uses the `secrecy` crate so API keys and webhook URLs never show up in
//! logs, debug output, or error messages.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// A secret string that won't be logged or displayed.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the secret value. Only call this at the point of use.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Reddit application-only OAuth credentials.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub user_agent: String,
}

impl RedditCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret),
            user_agent: user_agent.into(),
        }
    }

    /// Credentials in the shape the REST client expects.
    pub fn to_client_credentials(&self) -> reddit_client::Credentials {
        reddit_client::Credentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.expose().to_string(),
            user_agent: self.user_agent.clone(),
        }
    }
}

impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_not_in_debug_or_display() {
        let secret = SecretString::new("https://discord.com/api/webhooks/123/abc");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose(), "https://discord.com/api/webhooks/123/abc");
    }

    #[test]
    fn test_reddit_credentials_debug_redacts_secret() {
        let creds = RedditCredentials::new("my-id", "hunter2", "ticker-pulse/0.1");
        let debug = format!("{:?}", creds);

        assert!(debug.contains("my-id"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(creds.to_client_credentials().client_secret, "hunter2");
    }
}
