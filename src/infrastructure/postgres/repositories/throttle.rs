use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use diesel::{Connection, RunQueryDsl, delete, insert_into, prelude::*, update};

use crate::{
    domain::{
        entities::throttle::{InsertThrottleEntity, ThrottleEntity},
        repositories::throttle::ThrottleRepository,
        value_objects::throttle::{ThrottleDecision, ThrottleWindow, advance_window},
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::throttle},
};

pub struct ThrottlePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ThrottlePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ThrottleRepository for ThrottlePostgres {
    async fn hit(
        &self,
        key: &str,
        max_attempts: i32,
        window_seconds: i64,
    ) -> Result<ThrottleDecision> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        // Seed an empty window if the key is new, then lock the row so the
        // read-increment-write below is serialized per key.
        let decision = conn.transaction::<ThrottleDecision, anyhow::Error, _>(|conn| {
            insert_into(throttle::table)
                .values(&InsertThrottleEntity {
                    key: key.to_string(),
                    count: 0,
                    reset_at: now + Duration::seconds(window_seconds),
                })
                .on_conflict(throttle::key)
                .do_nothing()
                .execute(conn)?;

            let row = throttle::table
                .filter(throttle::key.eq(key))
                .select(ThrottleEntity::as_select())
                .for_update()
                .first::<ThrottleEntity>(conn)?;

            let (next, decision) = advance_window(
                ThrottleWindow {
                    count: row.count,
                    reset_at: row.reset_at,
                },
                now,
                max_attempts,
                window_seconds,
            );

            update(throttle::table.filter(throttle::key.eq(key)))
                .set((
                    throttle::count.eq(next.count),
                    throttle::reset_at.eq(next.reset_at),
                    throttle::updated_at.eq(now),
                ))
                .execute(conn)?;

            Ok(decision)
        })?;

        Ok(decision)
    }

    async fn clear(&self, key: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        delete(throttle::table.filter(throttle::key.eq(key))).execute(&mut conn)?;

        Ok(())
    }
}
