pub mod donations;
pub mod recipient_tokens;
pub mod subscriptions;
pub mod throttle;
pub mod wallet_ledger;
