use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    domain::{
        repositories::payment_events::{LedgerCreditOutcome, PaymentEventRepository},
        value_objects::payment_events::PaymentEvent,
    },
    payments::stripe_client::WebhookVerifier,
};

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    SignatureInvalid,

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// Storage failed mid-application; the transaction rolled back and the
    /// processor may safely redeliver the event.
    #[error(transparent)]
    Transient(#[from] anyhow::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::SignatureInvalid | WebhookError::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Transient(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

pub struct PaymentEventUseCase<R, V>
where
    R: PaymentEventRepository + Send + Sync + 'static,
    V: WebhookVerifier + 'static,
{
    payment_event_repository: Arc<R>,
    webhook_verifier: Arc<V>,
}

impl<R, V> PaymentEventUseCase<R, V>
where
    R: PaymentEventRepository + Send + Sync + 'static,
    V: WebhookVerifier + 'static,
{
    pub fn new(payment_event_repository: Arc<R>, webhook_verifier: Arc<V>) -> Self {
        Self {
            payment_event_repository,
            webhook_verifier,
        }
    }

    /// Verifies, decodes and applies one webhook delivery. The ack is only
    /// returned once the event's effects are durably committed (or the
    /// event turned out to be a no-op), so an acked delivery is never lost.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookAck, WebhookError> {
        if !self.webhook_verifier.verify(payload, signature_header) {
            warn!("payment events: webhook signature verification failed");
            return Err(WebhookError::SignatureInvalid);
        }

        let event = PaymentEvent::parse(payload).map_err(|err| {
            warn!(error = %err, "payment events: webhook payload failed to decode");
            WebhookError::MalformedPayload(err.to_string())
        })?;

        self.apply(event).await?;

        Ok(WebhookAck { received: true })
    }

    /// Applies a decoded event. Redelivering the same event any number of
    /// times leaves ledger rows and terminal statuses unchanged after the
    /// first successful application.
    pub async fn apply(&self, event: PaymentEvent) -> Result<(), WebhookError> {
        match event {
            PaymentEvent::DonationSucceeded {
                provider_payment_id,
            } => {
                let outcome = self
                    .payment_event_repository
                    .apply_donation_succeeded(&provider_payment_id)
                    .await
                    .map_err(|err| {
                        error!(
                            %provider_payment_id,
                            db_error = ?err,
                            "payment events: failed to apply donation success"
                        );
                        WebhookError::Transient(err)
                    })?;
                log_credit_outcome("donation", &provider_payment_id, outcome);
            }
            PaymentEvent::DonationFailed {
                provider_payment_id,
            } => {
                self.payment_event_repository
                    .mark_donation_failed(&provider_payment_id)
                    .await
                    .map_err(|err| {
                        error!(
                            %provider_payment_id,
                            db_error = ?err,
                            "payment events: failed to mark donation failed"
                        );
                        WebhookError::Transient(err)
                    })?;
                info!(%provider_payment_id, "payment events: donation marked failed");
            }
            PaymentEvent::SubscriptionCheckoutCompleted(checkout) => {
                let provider_subscription_id = checkout.provider_subscription_id.clone();
                self.payment_event_repository
                    .upsert_subscription_checkout(checkout)
                    .await
                    .map_err(|err| {
                        error!(
                            %provider_subscription_id,
                            db_error = ?err,
                            "payment events: failed to upsert subscription from checkout"
                        );
                        WebhookError::Transient(err)
                    })?;
                info!(
                    %provider_subscription_id,
                    "payment events: subscription checkout applied"
                );
            }
            PaymentEvent::InvoicePaid(invoice) => {
                let invoice_id = invoice.invoice_id.clone();
                let outcome = self
                    .payment_event_repository
                    .credit_invoice(invoice)
                    .await
                    .map_err(|err| {
                        error!(
                            %invoice_id,
                            db_error = ?err,
                            "payment events: failed to credit invoice"
                        );
                        WebhookError::Transient(err)
                    })?;
                log_credit_outcome("invoice", &invoice_id, outcome);
            }
            PaymentEvent::SubscriptionStatusChanged {
                provider_subscription_id,
                status,
            } => {
                self.payment_event_repository
                    .update_subscription_status(&provider_subscription_id, &status)
                    .await
                    .map_err(|err| {
                        error!(
                            %provider_subscription_id,
                            status = %status,
                            db_error = ?err,
                            "payment events: failed to update subscription status"
                        );
                        WebhookError::Transient(err)
                    })?;
                info!(
                    %provider_subscription_id,
                    status = %status,
                    "payment events: subscription status updated"
                );
            }
            PaymentEvent::Ignored { event_type } => {
                info!(event_type = %event_type, "payment events: event acknowledged without effect");
            }
        }

        Ok(())
    }
}

fn log_credit_outcome(ref_type: &str, ref_id: &str, outcome: LedgerCreditOutcome) {
    match outcome {
        LedgerCreditOutcome::Credited => {
            info!(ref_type, ref_id, "payment events: ledger credited");
        }
        LedgerCreditOutcome::AlreadyCredited => {
            info!(
                ref_type,
                ref_id, "payment events: ledger entry already exists, skipping"
            );
        }
        LedgerCreditOutcome::NotTracked => {
            info!(
                ref_type,
                ref_id, "payment events: no matching record, acknowledged as no-op"
            );
        }
    }
}

#[cfg(test)]
mod tests;
