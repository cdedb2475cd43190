use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infrastructure::postgres::schema::donations;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = donations)]
pub struct DonationEntity {
    pub id: i64,
    pub donor_id: Option<i64>,
    pub recipient_id: i64,
    pub amount_cents: i64,
    pub currency: String,
    pub provider_payment_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
