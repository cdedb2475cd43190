use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum::http::StatusCode;

use super::*;
use crate::domain::repositories::payment_events::MockPaymentEventRepository;
use crate::domain::value_objects::payment_events::{InvoiceCredit, SubscriptionCheckout};
use crate::payments::stripe_client::MockWebhookVerifier;

fn verifier(accept: bool) -> Arc<MockWebhookVerifier> {
    let mut webhook_verifier = MockWebhookVerifier::new();
    webhook_verifier
        .expect_verify()
        .returning(move |_, _| accept);
    Arc::new(webhook_verifier)
}

const SIGNATURE: &str = "t=1700000000,v1=deadbeef";

// In-memory stand-in that mirrors the storage contract: one ledger row per
// (ref_type, ref_id), succeeded donations never regress, subscription
// status is last-write-wins.
#[derive(Default)]
struct FakeStore {
    donations: Mutex<HashMap<String, FakeDonation>>,
    subscriptions: Mutex<HashMap<String, FakeSubscription>>,
    ledger: Mutex<Vec<FakeLedgerEntry>>,
}

#[derive(Clone)]
struct FakeDonation {
    id: i64,
    recipient_id: i64,
    amount_cents: i64,
    status: String,
}

#[derive(Clone)]
struct FakeSubscription {
    recipient_id: i64,
    status: String,
    donor_email: Option<String>,
}

#[derive(Clone)]
struct FakeLedgerEntry {
    recipient_id: i64,
    amount_cents: i64,
    ref_type: String,
    ref_id: String,
}

impl FakeStore {
    fn with_donation(self, provider_payment_id: &str, donation: FakeDonation) -> Self {
        self.donations
            .lock()
            .unwrap()
            .insert(provider_payment_id.to_string(), donation);
        self
    }

    fn with_subscription(self, provider_subscription_id: &str, recipient_id: i64) -> Self {
        self.subscriptions.lock().unwrap().insert(
            provider_subscription_id.to_string(),
            FakeSubscription {
                recipient_id,
                status: "active".to_string(),
                donor_email: None,
            },
        );
        self
    }

    fn insert_ledger_if_absent(&self, entry: FakeLedgerEntry) -> LedgerCreditOutcome {
        let mut ledger = self.ledger.lock().unwrap();
        let exists = ledger
            .iter()
            .any(|row| row.ref_type == entry.ref_type && row.ref_id == entry.ref_id);
        if exists {
            return LedgerCreditOutcome::AlreadyCredited;
        }
        ledger.push(entry);
        LedgerCreditOutcome::Credited
    }

    fn ledger_rows(&self) -> Vec<FakeLedgerEntry> {
        self.ledger.lock().unwrap().clone()
    }

    fn ledger_sum(&self) -> i64 {
        self.ledger.lock().unwrap().iter().map(|row| row.amount_cents).sum()
    }
}

#[async_trait]
impl PaymentEventRepository for FakeStore {
    async fn apply_donation_succeeded(
        &self,
        provider_payment_id: &str,
    ) -> Result<LedgerCreditOutcome> {
        let mut donations = self.donations.lock().unwrap();
        let Some(donation) = donations.get_mut(provider_payment_id) else {
            return Ok(LedgerCreditOutcome::NotTracked);
        };

        if donation.status != "succeeded" {
            donation.status = "succeeded".to_string();
        }

        let entry = FakeLedgerEntry {
            recipient_id: donation.recipient_id,
            amount_cents: donation.amount_cents,
            ref_type: "donation".to_string(),
            ref_id: donation.id.to_string(),
        };
        drop(donations);

        Ok(self.insert_ledger_if_absent(entry))
    }

    async fn mark_donation_failed(&self, provider_payment_id: &str) -> Result<()> {
        let mut donations = self.donations.lock().unwrap();
        if let Some(donation) = donations.get_mut(provider_payment_id) {
            if donation.status != "succeeded" {
                donation.status = "failed".to_string();
            }
        }
        Ok(())
    }

    async fn upsert_subscription_checkout(&self, checkout: SubscriptionCheckout) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        subscriptions
            .entry(checkout.provider_subscription_id.clone())
            .and_modify(|subscription| {
                subscription.status = "active".to_string();
                subscription.donor_email = checkout.donor_email.clone();
            })
            .or_insert(FakeSubscription {
                recipient_id: checkout.recipient_id,
                status: "active".to_string(),
                donor_email: checkout.donor_email.clone(),
            });
        Ok(())
    }

    async fn credit_invoice(&self, invoice: InvoiceCredit) -> Result<LedgerCreditOutcome> {
        let subscriptions = self.subscriptions.lock().unwrap();
        let Some(subscription) = subscriptions.get(&invoice.provider_subscription_id) else {
            return Ok(LedgerCreditOutcome::NotTracked);
        };

        let entry = FakeLedgerEntry {
            recipient_id: subscription.recipient_id,
            amount_cents: invoice.amount_cents,
            ref_type: "invoice".to_string(),
            ref_id: invoice.invoice_id.clone(),
        };
        drop(subscriptions);

        Ok(self.insert_ledger_if_absent(entry))
    }

    async fn update_subscription_status(
        &self,
        provider_subscription_id: &str,
        status: &str,
    ) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if let Some(subscription) = subscriptions.get_mut(provider_subscription_id) {
            subscription.status = status.to_string();
        }
        Ok(())
    }
}

fn donation_succeeded_payload(provider_payment_id: &str) -> Vec<u8> {
    serde_json::json!({
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": provider_payment_id } }
    })
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn donation_success_credits_once_despite_redelivery() {
    let store = Arc::new(FakeStore::default().with_donation(
        "pi_123",
        FakeDonation {
            id: 42,
            recipient_id: 9,
            amount_cents: 500,
            status: "pending".to_string(),
        },
    ));
    let usecase = PaymentEventUseCase::new(Arc::clone(&store), verifier(true));

    let payload = donation_succeeded_payload("pi_123");
    for _ in 0..3 {
        let ack = usecase.handle_webhook(&payload, SIGNATURE).await.unwrap();
        assert!(ack.received);
    }

    let rows = store.ledger_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].recipient_id, 9);
    assert_eq!(rows[0].amount_cents, 500);
    assert_eq!(rows[0].ref_type, "donation");
    assert_eq!(rows[0].ref_id, "42");
    assert_eq!(store.ledger_sum(), 500);

    let donations = store.donations.lock().unwrap();
    assert_eq!(donations.get("pi_123").unwrap().status, "succeeded");
}

#[tokio::test]
async fn unrelated_donation_event_is_acknowledged_without_effect() {
    let store = Arc::new(FakeStore::default());
    let usecase = PaymentEventUseCase::new(Arc::clone(&store), verifier(true));

    let payload = donation_succeeded_payload("pi_unknown");
    let ack = usecase.handle_webhook(&payload, SIGNATURE).await.unwrap();

    assert!(ack.received);
    assert!(store.ledger_rows().is_empty());
}

#[tokio::test]
async fn unknown_event_kind_is_acknowledged_without_effect() {
    let store = Arc::new(FakeStore::default());
    let usecase = PaymentEventUseCase::new(Arc::clone(&store), verifier(true));

    let payload = serde_json::json!({
        "type": "charge.refunded",
        "data": { "object": { "id": "ch_1" } }
    })
    .to_string()
    .into_bytes();

    let ack = usecase.handle_webhook(&payload, SIGNATURE).await.unwrap();
    assert!(ack.received);
    assert!(store.ledger_rows().is_empty());
    assert!(store.donations.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_event_never_regresses_a_succeeded_donation() {
    let store = Arc::new(FakeStore::default().with_donation(
        "pi_123",
        FakeDonation {
            id: 42,
            recipient_id: 9,
            amount_cents: 500,
            status: "succeeded".to_string(),
        },
    ));
    let usecase = PaymentEventUseCase::new(Arc::clone(&store), verifier(true));

    let payload = serde_json::json!({
        "type": "payment_intent.payment_failed",
        "data": { "object": { "id": "pi_123" } }
    })
    .to_string()
    .into_bytes();

    usecase.handle_webhook(&payload, SIGNATURE).await.unwrap();

    let donations = store.donations.lock().unwrap();
    assert_eq!(donations.get("pi_123").unwrap().status, "succeeded");
}

#[tokio::test]
async fn failed_event_marks_pending_donation_failed() {
    let store = Arc::new(FakeStore::default().with_donation(
        "pi_77",
        FakeDonation {
            id: 7,
            recipient_id: 3,
            amount_cents: 250,
            status: "pending".to_string(),
        },
    ));
    let usecase = PaymentEventUseCase::new(Arc::clone(&store), verifier(true));

    let payload = serde_json::json!({
        "type": "payment_intent.canceled",
        "data": { "object": { "id": "pi_77" } }
    })
    .to_string()
    .into_bytes();

    usecase.handle_webhook(&payload, SIGNATURE).await.unwrap();

    let donations = store.donations.lock().unwrap();
    assert_eq!(donations.get("pi_77").unwrap().status, "failed");
    assert!(store.ledger_rows().is_empty());
}

#[tokio::test]
async fn invoice_credit_is_idempotent_across_redelivery() {
    let store = Arc::new(FakeStore::default().with_subscription("sub_abc", 5));
    let usecase = PaymentEventUseCase::new(Arc::clone(&store), verifier(true));

    let payload = serde_json::json!({
        "type": "invoice.paid",
        "data": { "object": {
            "id": "in_55",
            "subscription": "sub_abc",
            "amount_paid": 1000
        } }
    })
    .to_string()
    .into_bytes();

    usecase.handle_webhook(&payload, SIGNATURE).await.unwrap();
    usecase.handle_webhook(&payload, SIGNATURE).await.unwrap();

    let rows = store.ledger_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].ref_type, "invoice");
    assert_eq!(rows[0].ref_id, "in_55");
    assert_eq!(rows[0].recipient_id, 5);
    assert_eq!(store.ledger_sum(), 1000);
}

#[tokio::test]
async fn invoice_for_unknown_subscription_is_acknowledged_without_credit() {
    let store = Arc::new(FakeStore::default());
    let usecase = PaymentEventUseCase::new(Arc::clone(&store), verifier(true));

    let payload = serde_json::json!({
        "type": "invoice.paid",
        "data": { "object": {
            "id": "in_55",
            "subscription": "sub_missing",
            "amount_paid": 1000
        } }
    })
    .to_string()
    .into_bytes();

    let ack = usecase.handle_webhook(&payload, SIGNATURE).await.unwrap();
    assert!(ack.received);
    assert!(store.ledger_rows().is_empty());
}

#[tokio::test]
async fn checkout_then_lifecycle_events_follow_last_write_wins() {
    let store = Arc::new(FakeStore::default());
    let usecase = PaymentEventUseCase::new(Arc::clone(&store), verifier(true));

    let checkout = serde_json::json!({
        "type": "checkout.session.completed",
        "data": { "object": {
            "mode": "subscription",
            "subscription": "sub_abc",
            "metadata": { "recipient_id": "5", "amount_cents": "1000", "interval": "month" },
            "customer_email": "donor@example.com"
        } }
    })
    .to_string()
    .into_bytes();

    usecase.handle_webhook(&checkout, SIGNATURE).await.unwrap();
    usecase.handle_webhook(&checkout, SIGNATURE).await.unwrap();

    {
        let subscriptions = store.subscriptions.lock().unwrap();
        assert_eq!(subscriptions.len(), 1);
        let subscription = subscriptions.get("sub_abc").unwrap();
        assert_eq!(subscription.status, "active");
        assert_eq!(subscription.donor_email.as_deref(), Some("donor@example.com"));
    }

    let deleted = serde_json::json!({
        "type": "customer.subscription.deleted",
        "data": { "object": { "id": "sub_abc", "status": "canceled" } }
    })
    .to_string()
    .into_bytes();

    usecase.handle_webhook(&deleted, SIGNATURE).await.unwrap();

    let subscriptions = store.subscriptions.lock().unwrap();
    assert_eq!(subscriptions.get("sub_abc").unwrap().status, "canceled");
}

#[tokio::test]
async fn invalid_signature_is_rejected_before_any_state_change() {
    let store = Arc::new(FakeStore::default().with_donation(
        "pi_123",
        FakeDonation {
            id: 42,
            recipient_id: 9,
            amount_cents: 500,
            status: "pending".to_string(),
        },
    ));
    let usecase = PaymentEventUseCase::new(Arc::clone(&store), verifier(false));

    let payload = donation_succeeded_payload("pi_123");
    let err = usecase.handle_webhook(&payload, SIGNATURE).await.unwrap_err();

    assert!(matches!(err, WebhookError::SignatureInvalid));
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert!(store.ledger_rows().is_empty());
    assert_eq!(
        store.donations.lock().unwrap().get("pi_123").unwrap().status,
        "pending"
    );
}

#[tokio::test]
async fn unparseable_payload_is_rejected() {
    let store = Arc::new(FakeStore::default());
    let usecase = PaymentEventUseCase::new(store, verifier(true));

    let err = usecase
        .handle_webhook(b"{not json", SIGNATURE)
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::MalformedPayload(_)));
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn donation_success_dispatches_to_repository() {
    let mut repository = MockPaymentEventRepository::new();
    repository
        .expect_apply_donation_succeeded()
        .withf(|provider_payment_id| provider_payment_id == "pi_123")
        .times(1)
        .returning(|_| Ok(LedgerCreditOutcome::Credited));

    let usecase = PaymentEventUseCase::new(Arc::new(repository), verifier(true));
    let payload = donation_succeeded_payload("pi_123");

    let ack = usecase.handle_webhook(&payload, SIGNATURE).await.unwrap();
    assert!(ack.received);
}

#[tokio::test]
async fn storage_failure_surfaces_as_retryable_error() {
    let mut repository = MockPaymentEventRepository::new();
    repository
        .expect_apply_donation_succeeded()
        .returning(|_| Err(anyhow!("connection reset")));

    let usecase = PaymentEventUseCase::new(Arc::new(repository), verifier(true));
    let payload = donation_succeeded_payload("pi_123");

    let err = usecase.handle_webhook(&payload, SIGNATURE).await.unwrap_err();
    assert!(matches!(err, WebhookError::Transient(_)));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}
