use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::domain::{
    repositories::throttle::ThrottleRepository, value_objects::throttle::ThrottleDecision,
};

pub struct ThrottleUseCase<R>
where
    R: ThrottleRepository + Send + Sync + 'static,
{
    throttle_repository: Arc<R>,
}

impl<R> ThrottleUseCase<R>
where
    R: ThrottleRepository + Send + Sync + 'static,
{
    pub fn new(throttle_repository: Arc<R>) -> Self {
        Self { throttle_repository }
    }

    pub async fn hit(
        &self,
        key: &str,
        max_attempts: i32,
        window_seconds: i64,
    ) -> Result<ThrottleDecision> {
        let decision = self
            .throttle_repository
            .hit(key, max_attempts, window_seconds)
            .await?;

        if !decision.allowed {
            warn!(
                key,
                retry_after = decision.retry_after,
                "throttle: request denied"
            );
        }

        Ok(decision)
    }

    /// Drops the counter for `key` entirely, forgiving earlier hits. Called
    /// after a successful authentication so prior failed attempts stop
    /// counting against the caller.
    pub async fn clear(&self, key: &str) -> Result<()> {
        self.throttle_repository.clear(key).await?;
        info!(key, "throttle: counter cleared");
        Ok(())
    }
}
