use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::throttle::ThrottleDecision;

#[automock]
#[async_trait]
pub trait ThrottleRepository {
    /// Registers one hit against `key` and decides whether it is allowed.
    /// The increment-and-compare must be atomic per key under concurrent
    /// callers.
    async fn hit(
        &self,
        key: &str,
        max_attempts: i32,
        window_seconds: i64,
    ) -> Result<ThrottleDecision>;

    async fn clear(&self, key: &str) -> Result<()>;
}
