use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::recipient_tokens::InsertRecipientTokenEntity;

#[automock]
#[async_trait]
pub trait RecipientTokenRepository {
    /// Inserts a token row; returns `None` when the short code collided
    /// with any row ever created so the caller can resample.
    async fn insert_token(&self, token: InsertRecipientTokenEntity) -> Result<Option<i64>>;

    async fn revoke_active_tokens(&self, recipient_id: i64) -> Result<()>;

    async fn find_active_recipient_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<i64>>;

    async fn find_active_recipient_by_code(&self, code_short: &str) -> Result<Option<i64>>;
}
