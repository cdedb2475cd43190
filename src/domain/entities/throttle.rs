use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infrastructure::postgres::schema::throttle;

#[derive(Debug, Clone, Selectable, Queryable)]
#[diesel(table_name = throttle)]
pub struct ThrottleEntity {
    pub key: String,
    pub count: i32,
    pub reset_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = throttle)]
pub struct InsertThrottleEntity {
    pub key: String,
    pub count: i32,
    pub reset_at: DateTime<Utc>,
}
