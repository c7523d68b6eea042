//! Recipient directory seam.

use async_trait::async_trait;
use beacon_db::repositories::{RecipientProfile, RecipientRepository};

/// Recipient storage as seen by the handlers.
///
/// Implementations retry internally; `None` and empty results mean the
/// storage stayed unavailable, which handlers treat as non-fatal.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Create or refresh a recipient. Returns whether it was created.
    async fn enroll(&self, profile: RecipientProfile) -> Option<bool>;

    /// Ids of every enrolled recipient.
    async fn recipient_ids(&self) -> Vec<i64>;
}

#[async_trait]
impl Directory for RecipientRepository {
    async fn enroll(&self, profile: RecipientProfile) -> Option<bool> {
        Self::enroll(self, profile).await.map(|e| e.created)
    }

    async fn recipient_ids(&self) -> Vec<i64> {
        self.list_all()
            .await
            .into_iter()
            .map(|r| r.telegram_user_id)
            .collect()
    }
}
