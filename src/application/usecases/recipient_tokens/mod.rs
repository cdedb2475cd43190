use std::sync::Arc;

use anyhow::Result;
use rand::{CryptoRng, Rng, rngs::OsRng};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::domain::{
    entities::recipient_tokens::InsertRecipientTokenEntity,
    repositories::recipient_tokens::RecipientTokenRepository,
};

// Excludes 0/O and 1/I so codes can be read aloud and typed back.
pub const SHORT_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const SHORT_CODE_LENGTH: usize = 7;

const TOKEN_BYTES: usize = 24;

/// The raw token is handed back exactly once; only its keyed hash is ever
/// persisted.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub code_short: String,
}

pub struct RecipientTokenUseCase<R>
where
    R: RecipientTokenRepository + Send + Sync + 'static,
{
    recipient_token_repository: Arc<R>,
    signing_secret: String,
}

impl<R> RecipientTokenUseCase<R>
where
    R: RecipientTokenRepository + Send + Sync + 'static,
{
    pub fn new(recipient_token_repository: Arc<R>, signing_secret: String) -> Self {
        Self {
            recipient_token_repository,
            signing_secret,
        }
    }

    pub fn hash_token(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hasher.update(self.signing_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn create_for_recipient(&self, recipient_id: i64) -> Result<IssuedToken> {
        let token = generate_token(&mut OsRng);
        let token_hash = self.hash_token(&token);

        // Rejection sampling against every code ever issued: the insert
        // itself is the uniqueness check, so concurrent issuance cannot
        // hand out the same code twice.
        loop {
            let code_short = generate_short_code(&mut OsRng);
            let inserted = self
                .recipient_token_repository
                .insert_token(InsertRecipientTokenEntity {
                    recipient_id,
                    token_hash: token_hash.clone(),
                    code_short: code_short.clone(),
                    active: true,
                })
                .await?;

            if inserted.is_some() {
                info!(
                    recipient_id,
                    code_short = %code_short,
                    "recipient tokens: issued new lookup token"
                );
                return Ok(IssuedToken { token, code_short });
            }

            debug!(recipient_id, "recipient tokens: short code collision, resampling");
        }
    }

    pub async fn revoke_active(&self, recipient_id: i64) -> Result<()> {
        self.recipient_token_repository
            .revoke_active_tokens(recipient_id)
            .await?;
        info!(recipient_id, "recipient tokens: active tokens revoked");
        Ok(())
    }

    /// Admin rotation: revoke everything active, then issue a fresh token,
    /// leaving exactly one active row for the recipient.
    pub async fn rotate_for_recipient(&self, recipient_id: i64) -> Result<IssuedToken> {
        self.revoke_active(recipient_id).await?;
        self.create_for_recipient(recipient_id).await
    }

    pub async fn find_recipient_by_token(&self, token: &str) -> Result<Option<i64>> {
        let token_hash = self.hash_token(token);
        self.recipient_token_repository
            .find_active_recipient_by_token_hash(&token_hash)
            .await
    }

    pub async fn find_recipient_by_code(&self, code: &str) -> Result<Option<i64>> {
        let code_short = code.trim().to_uppercase();
        self.recipient_token_repository
            .find_active_recipient_by_code(&code_short)
            .await
    }
}

pub fn generate_token<T: Rng + CryptoRng>(rng: &mut T) -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn generate_short_code<T: Rng + CryptoRng>(rng: &mut T) -> String {
    (0..SHORT_CODE_LENGTH)
        .map(|_| {
            let index = rng.gen_range(0..SHORT_CODE_ALPHABET.len());
            SHORT_CODE_ALPHABET[index] as char
        })
        .collect()
}
