use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

// Replay window for signed webhook deliveries.
const SIGNATURE_TOLERANCE_SECONDS: i64 = 300;

/// Verifies inbound webhook payloads against the processor's shared secret.
#[cfg_attr(test, mockall::automock)]
pub trait WebhookVerifier: Send + Sync {
    fn verify(&self, payload: &[u8], signature_header: &str) -> bool;
}

pub struct StripeWebhookVerifier {
    webhook_secret: String,
}

impl StripeWebhookVerifier {
    pub fn new(webhook_secret: String) -> Self {
        Self { webhook_secret }
    }
}

impl WebhookVerifier for StripeWebhookVerifier {
    fn verify(&self, payload: &[u8], signature_header: &str) -> bool {
        verify_signature_at(
            payload,
            signature_header,
            &self.webhook_secret,
            Utc::now().timestamp(),
        )
    }
}

struct SignatureHeader {
    timestamp: i64,
    candidates: Vec<String>,
}

// Header form: `t=<unix-seconds>,v1=<hex-hmac>[,v1=<hex-hmac>...]`.
// All v1 entries are kept; Stripe sends more than one while a secret is
// being rolled, and any single match must verify.
fn parse_signature_header(header: &str) -> Option<SignatureHeader> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<String> = Vec::new();

    for part in header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = rest.parse::<i64>().ok();
        } else if let Some(rest) = part.strip_prefix("v1=") {
            candidates.push(rest.to_string());
        }
    }

    let timestamp = timestamp?;
    if candidates.is_empty() {
        return None;
    }

    Some(SignatureHeader {
        timestamp,
        candidates,
    })
}

/// Verifies the webhook signature against a caller-supplied clock.
/// https://stripe.com/docs/webhooks/signatures
pub fn verify_signature_at(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
    now_unix: i64,
) -> bool {
    let Some(header) = parse_signature_header(signature_header) else {
        return false;
    };

    if (now_unix - header.timestamp).abs() > SIGNATURE_TOLERANCE_SECONDS {
        return false;
    }

    let signed_payload = format!(
        "{}.{}",
        header.timestamp,
        String::from_utf8_lossy(payload)
    );

    header.candidates.iter().any(|candidate| {
        let Ok(provided) = hex::decode(candidate) else {
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(webhook_secret.as_bytes()) else {
            return false;
        };
        mac.update(signed_payload.as_bytes());

        // verify_slice compares in constant time.
        mac.verify_slice(&provided).is_ok()
    })
}
