use diesel::prelude::*;

use crate::infrastructure::postgres::schema::wallet_ledger;

// Append-only rows; `(ref_type, ref_id)` carries the dedup constraint.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = wallet_ledger)]
pub struct InsertLedgerEntryEntity {
    pub recipient_id: i64,
    pub entry_type: String,
    pub amount_cents: i64,
    pub category: String,
    pub ref_type: String,
    pub ref_id: String,
}
