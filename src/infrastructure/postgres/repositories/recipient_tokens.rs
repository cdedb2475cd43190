use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};

use crate::{
    domain::{
        entities::recipient_tokens::InsertRecipientTokenEntity,
        repositories::recipient_tokens::RecipientTokenRepository,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::recipient_tokens},
};

pub struct RecipientTokenPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl RecipientTokenPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl RecipientTokenRepository for RecipientTokenPostgres {
    async fn insert_token(&self, token: InsertRecipientTokenEntity) -> Result<Option<i64>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // The unique code_short constraint is the collision check; a
        // conflicting draw inserts nothing and the caller resamples.
        let inserted = insert_into(recipient_tokens::table)
            .values(&token)
            .on_conflict(recipient_tokens::code_short)
            .do_nothing()
            .returning(recipient_tokens::id)
            .get_result::<i64>(&mut conn)
            .optional()?;

        Ok(inserted)
    }

    async fn revoke_active_tokens(&self, recipient_id: i64) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(
            recipient_tokens::table
                .filter(recipient_tokens::recipient_id.eq(recipient_id))
                .filter(recipient_tokens::active.eq(true)),
        )
        .set((
            recipient_tokens::active.eq(false),
            recipient_tokens::revoked_at.eq(Some(Utc::now())),
        ))
        .execute(&mut conn)?;

        Ok(())
    }

    async fn find_active_recipient_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<i64>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let recipient_id = recipient_tokens::table
            .filter(recipient_tokens::token_hash.eq(token_hash))
            .filter(recipient_tokens::active.eq(true))
            .order(recipient_tokens::created_at.desc())
            .select(recipient_tokens::recipient_id)
            .first::<i64>(&mut conn)
            .optional()?;

        Ok(recipient_id)
    }

    async fn find_active_recipient_by_code(&self, code_short: &str) -> Result<Option<i64>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let recipient_id = recipient_tokens::table
            .filter(recipient_tokens::code_short.eq(code_short))
            .filter(recipient_tokens::active.eq(true))
            .order(recipient_tokens::created_at.desc())
            .select(recipient_tokens::recipient_id)
            .first::<i64>(&mut conn)
            .optional()?;

        Ok(recipient_id)
    }
}
