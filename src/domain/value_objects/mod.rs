pub mod enums;
pub mod payment_events;
pub mod throttle;
