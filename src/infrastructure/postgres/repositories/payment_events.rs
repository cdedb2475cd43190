use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::{Connection, OptionalExtension, PgConnection, RunQueryDsl, insert_into, prelude::*, update};

use crate::{
    domain::{
        entities::{
            donations::DonationEntity, subscriptions::InsertSubscriptionEntity,
            wallet_ledger::InsertLedgerEntryEntity,
        },
        repositories::payment_events::{LedgerCreditOutcome, PaymentEventRepository},
        value_objects::{
            enums::{
                donation_statuses::DonationStatus,
                ledger_entries::{LedgerCategory, LedgerEntryType, LedgerRefType},
                subscription_statuses::SubscriptionStatus,
            },
            payment_events::{InvoiceCredit, SubscriptionCheckout},
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{donations, donors, subscriptions, wallet_ledger},
    },
};

pub struct PaymentEventPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentEventPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentEventRepository for PaymentEventPostgres {
    async fn apply_donation_succeeded(
        &self,
        provider_payment_id: &str,
    ) -> Result<LedgerCreditOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let outcome = conn.transaction::<LedgerCreditOutcome, anyhow::Error, _>(|conn| {
            let donation = donations::table
                .filter(donations::provider_payment_id.eq(provider_payment_id))
                .select(DonationEntity::as_select())
                .first::<DonationEntity>(conn)
                .optional()?;

            let Some(donation) = donation else {
                return Ok(LedgerCreditOutcome::NotTracked);
            };

            if donation.status != DonationStatus::Succeeded.as_str() {
                update(donations::table.filter(donations::id.eq(donation.id)))
                    .set(donations::status.eq(DonationStatus::Succeeded.as_str()))
                    .execute(conn)?;
            }

            insert_ledger_credit(
                conn,
                InsertLedgerEntryEntity {
                    recipient_id: donation.recipient_id,
                    entry_type: LedgerEntryType::Credit.to_string(),
                    amount_cents: donation.amount_cents,
                    category: LedgerCategory::Donation.to_string(),
                    ref_type: LedgerRefType::Donation.to_string(),
                    ref_id: donation.id.to_string(),
                },
            )
        })?;

        Ok(outcome)
    }

    async fn mark_donation_failed(&self, provider_payment_id: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // A donation that already succeeded keeps its terminal status even
        // when a stale failure event arrives afterwards.
        update(
            donations::table
                .filter(donations::provider_payment_id.eq(provider_payment_id))
                .filter(donations::status.ne(DonationStatus::Succeeded.as_str())),
        )
        .set(donations::status.eq(DonationStatus::Failed.as_str()))
        .execute(&mut conn)?;

        Ok(())
    }

    async fn upsert_subscription_checkout(&self, checkout: SubscriptionCheckout) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<(), anyhow::Error, _>(|conn| {
            let donor_id = match checkout.donor_email.as_deref() {
                Some(email) => Some(find_or_create_donor(conn, email)?),
                None => None,
            };

            insert_into(subscriptions::table)
                .values(&InsertSubscriptionEntity {
                    donor_id,
                    recipient_id: checkout.recipient_id,
                    billing_interval: checkout.billing_interval.clone(),
                    amount_cents: checkout.amount_cents,
                    provider_subscription_id: checkout.provider_subscription_id.clone(),
                    status: SubscriptionStatus::Active.as_str().to_string(),
                })
                .on_conflict(subscriptions::provider_subscription_id)
                .do_update()
                .set((
                    subscriptions::status.eq(SubscriptionStatus::Active.as_str()),
                    subscriptions::donor_id.eq(donor_id),
                ))
                .execute(conn)?;

            Ok(())
        })?;

        Ok(())
    }

    async fn credit_invoice(&self, invoice: InvoiceCredit) -> Result<LedgerCreditOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let outcome = conn.transaction::<LedgerCreditOutcome, anyhow::Error, _>(|conn| {
            let subscription = subscriptions::table
                .filter(
                    subscriptions::provider_subscription_id
                        .eq(&invoice.provider_subscription_id),
                )
                .select(subscriptions::recipient_id)
                .first::<i64>(conn)
                .optional()?;

            let Some(recipient_id) = subscription else {
                return Ok(LedgerCreditOutcome::NotTracked);
            };

            insert_ledger_credit(
                conn,
                InsertLedgerEntryEntity {
                    recipient_id,
                    entry_type: LedgerEntryType::Credit.to_string(),
                    amount_cents: invoice.amount_cents,
                    category: LedgerCategory::Subscription.to_string(),
                    ref_type: LedgerRefType::Invoice.to_string(),
                    ref_id: invoice.invoice_id.clone(),
                },
            )
        })?;

        Ok(outcome)
    }

    async fn update_subscription_status(
        &self,
        provider_subscription_id: &str,
        status: &str,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(
            subscriptions::table
                .filter(subscriptions::provider_subscription_id.eq(provider_subscription_id)),
        )
        .set(subscriptions::status.eq(status))
        .execute(&mut conn)?;

        Ok(())
    }
}

// The existence check and the insert are a single statement: the unique
// (ref_type, ref_id) constraint decides, so concurrent redeliveries cannot
// both credit.
fn insert_ledger_credit(
    conn: &mut PgConnection,
    entry: InsertLedgerEntryEntity,
) -> Result<LedgerCreditOutcome> {
    let inserted = insert_into(wallet_ledger::table)
        .values(&entry)
        .on_conflict((wallet_ledger::ref_type, wallet_ledger::ref_id))
        .do_nothing()
        .execute(conn)?;

    Ok(if inserted == 0 {
        LedgerCreditOutcome::AlreadyCredited
    } else {
        LedgerCreditOutcome::Credited
    })
}

fn find_or_create_donor(conn: &mut PgConnection, email: &str) -> Result<i64> {
    insert_into(donors::table)
        .values(donors::email.eq(email))
        .on_conflict(donors::email)
        .do_nothing()
        .execute(conn)?;

    let donor_id = donors::table
        .filter(donors::email.eq(email))
        .select(donors::id)
        .first::<i64>(conn)?;

    Ok(donor_id)
}
