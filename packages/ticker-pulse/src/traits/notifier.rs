//! Notification channel trait.

use async_trait::async_trait;

use crate::error::NotifyResult;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver an already formatted message.
    async fn notify(&self, message: &str) -> NotifyResult<()>;

    /// Upper bound on message length in characters.
    fn max_len(&self) -> usize {
        2000
    }
}
