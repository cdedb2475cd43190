use diesel::prelude::*;

use crate::infrastructure::postgres::schema::subscriptions;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub donor_id: Option<i64>,
    pub recipient_id: i64,
    pub billing_interval: String,
    pub amount_cents: i64,
    pub provider_subscription_id: String,
    pub status: String,
}
