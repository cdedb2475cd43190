pub mod donation_statuses;
pub mod ledger_entries;
pub mod subscription_statuses;
