pub mod payment_webhook;
pub mod recipient_tokens;
pub mod recipients;
