use diesel::prelude::*;

use crate::infrastructure::postgres::schema::recipient_tokens;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = recipient_tokens)]
pub struct InsertRecipientTokenEntity {
    pub recipient_id: i64,
    pub token_hash: String,
    pub code_short: String,
    pub active: bool,
}
