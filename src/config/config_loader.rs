use anyhow::Result;

use super::config_model::{Database, DotEnvyConfig, RateLimit, RecipientToken, Server, Stripe};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let stripe = Stripe {
        webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
            .expect("STRIPE_WEBHOOK_SECRET is invalid"),
    };

    let recipient_token = RecipientToken {
        signing_secret: std::env::var("TOKEN_SIGNING_SECRET")
            .expect("TOKEN_SIGNING_SECRET is invalid"),
    };

    let rate_limit = RateLimit {
        lookup_max: env_i32_or("RATE_LIMIT_LOOKUP_MAX", 60)?,
        lookup_window: env_i64_or("RATE_LIMIT_LOOKUP_WINDOW", 60)?,
        signup_max: env_i32_or("RATE_LIMIT_SIGNUP_MAX", 6)?,
        signup_window: env_i64_or("RATE_LIMIT_SIGNUP_WINDOW", 3600)?,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        stripe,
        recipient_token,
        rate_limit,
    })
}

fn env_i32_or(key: &str, default: i32) -> Result<i32> {
    match std::env::var(key) {
        Ok(value) => Ok(value.parse()?),
        Err(_) => Ok(default),
    }
}

fn env_i64_or(key: &str, default: i64) -> Result<i64> {
    match std::env::var(key) {
        Ok(value) => Ok(value.parse()?),
        Err(_) => Ok(default),
    }
}
