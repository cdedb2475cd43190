use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::payment_events::{InvoiceCredit, SubscriptionCheckout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerCreditOutcome {
    /// A new ledger entry was written.
    Credited,
    /// An entry with the same reference already existed; nothing changed.
    AlreadyCredited,
    /// The event does not reference a record this service tracks.
    NotTracked,
}

/// Storage unit for applying one verified payment event. Every method that
/// touches more than one row runs its work inside a single transaction, so
/// a failure never leaves a status update without its paired ledger entry.
#[automock]
#[async_trait]
pub trait PaymentEventRepository {
    async fn apply_donation_succeeded(
        &self,
        provider_payment_id: &str,
    ) -> Result<LedgerCreditOutcome>;

    async fn mark_donation_failed(&self, provider_payment_id: &str) -> Result<()>;

    async fn upsert_subscription_checkout(&self, checkout: SubscriptionCheckout) -> Result<()>;

    async fn credit_invoice(&self, invoice: InvoiceCredit) -> Result<LedgerCreditOutcome>;

    async fn update_subscription_status(
        &self,
        provider_subscription_id: &str,
        status: &str,
    ) -> Result<()>;
}
