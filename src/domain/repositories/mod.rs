pub mod payment_events;
pub mod recipient_tokens;
pub mod throttle;
