use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;

#[derive(Debug, Error)]
#[error("malformed payment event: {0}")]
pub struct MalformedEvent(pub String);

/// A payment-processor webhook payload decoded once at the boundary.
///
/// Every payload that is well-formed JSON decodes into exactly one variant;
/// kinds this service does not react to (and recognized kinds whose
/// essential identifiers are absent) fold into `Ignored`, which callers
/// acknowledge as success so the processor stops redelivering.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    DonationSucceeded {
        provider_payment_id: String,
    },
    DonationFailed {
        provider_payment_id: String,
    },
    SubscriptionCheckoutCompleted(SubscriptionCheckout),
    InvoicePaid(InvoiceCredit),
    SubscriptionStatusChanged {
        provider_subscription_id: String,
        status: String,
    },
    Ignored {
        event_type: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionCheckout {
    pub provider_subscription_id: String,
    pub recipient_id: i64,
    pub amount_cents: i64,
    pub billing_interval: String,
    pub donor_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceCredit {
    pub invoice_id: String,
    pub provider_subscription_id: String,
    pub amount_cents: i64,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    type_: String,
    #[serde(default)]
    data: RawEventData,
}

#[derive(Deserialize, Default)]
struct RawEventData {
    #[serde(default)]
    object: Value,
}

#[derive(Deserialize)]
struct PaymentIntentObject {
    id: Option<String>,
}

#[derive(Deserialize)]
struct CheckoutSessionObject {
    mode: Option<String>,
    subscription: Option<String>,
    metadata: Option<HashMap<String, String>>,
    customer_details: Option<CustomerDetails>,
    customer_email: Option<String>,
}

#[derive(Deserialize)]
struct CustomerDetails {
    email: Option<String>,
}

#[derive(Deserialize)]
struct InvoiceObject {
    id: Option<String>,
    subscription: Option<String>,
    amount_paid: Option<i64>,
}

#[derive(Deserialize)]
struct SubscriptionObject {
    id: Option<String>,
    status: Option<String>,
}

impl PaymentEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, MalformedEvent> {
        let event: RawEvent = serde_json::from_slice(payload)
            .map_err(|err| MalformedEvent(err.to_string()))?;

        let RawEvent { type_, data } = event;
        let object = data.object;

        let decoded = match type_.as_str() {
            "payment_intent.succeeded" => payment_intent_id(&object).map(|provider_payment_id| {
                PaymentEvent::DonationSucceeded {
                    provider_payment_id,
                }
            }),
            "payment_intent.payment_failed" | "payment_intent.canceled" => {
                payment_intent_id(&object).map(|provider_payment_id| {
                    PaymentEvent::DonationFailed {
                        provider_payment_id,
                    }
                })
            }
            "checkout.session.completed" => {
                subscription_checkout(&object).map(PaymentEvent::SubscriptionCheckoutCompleted)
            }
            "invoice.paid" => invoice_credit(&object).map(PaymentEvent::InvoicePaid),
            "customer.subscription.updated" | "customer.subscription.deleted" => {
                subscription_status_change(&object).map(|(provider_subscription_id, status)| {
                    PaymentEvent::SubscriptionStatusChanged {
                        provider_subscription_id,
                        status,
                    }
                })
            }
            _ => None,
        };

        Ok(decoded.unwrap_or(PaymentEvent::Ignored { event_type: type_ }))
    }
}

fn payment_intent_id(object: &Value) -> Option<String> {
    let intent: PaymentIntentObject = serde_json::from_value(object.clone()).ok()?;
    non_empty(intent.id)
}

fn subscription_checkout(object: &Value) -> Option<SubscriptionCheckout> {
    let session: CheckoutSessionObject = serde_json::from_value(object.clone()).ok()?;

    if session.mode.as_deref() != Some("subscription") {
        return None;
    }

    let provider_subscription_id = non_empty(session.subscription)?;
    let metadata = session.metadata.unwrap_or_default();
    let recipient_id = metadata
        .get("recipient_id")
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(0);
    let amount_cents = metadata
        .get("amount_cents")
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(0);
    let billing_interval = metadata
        .get("interval")
        .cloned()
        .unwrap_or_else(|| "month".to_string());
    let donor_email = session
        .customer_details
        .and_then(|details| non_empty(details.email))
        .or_else(|| non_empty(session.customer_email));

    Some(SubscriptionCheckout {
        provider_subscription_id,
        recipient_id,
        amount_cents,
        billing_interval,
        donor_email,
    })
}

fn invoice_credit(object: &Value) -> Option<InvoiceCredit> {
    let invoice: InvoiceObject = serde_json::from_value(object.clone()).ok()?;

    let invoice_id = non_empty(invoice.id)?;
    let provider_subscription_id = non_empty(invoice.subscription)?;
    let amount_cents = invoice.amount_paid.filter(|amount| *amount > 0)?;

    Some(InvoiceCredit {
        invoice_id,
        provider_subscription_id,
        amount_cents,
    })
}

fn subscription_status_change(object: &Value) -> Option<(String, String)> {
    let subscription: SubscriptionObject = serde_json::from_value(object.clone()).ok()?;

    let provider_subscription_id = non_empty(subscription.id)?;
    let status = non_empty(subscription.status)
        .unwrap_or_else(|| SubscriptionStatus::Inactive.as_str().to_string());

    Some((provider_subscription_id, status))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
