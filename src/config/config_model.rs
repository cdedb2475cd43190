#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub stripe: Stripe,
    pub recipient_token: RecipientToken,
    pub rate_limit: RateLimit,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub webhook_secret: String,
}

#[derive(Debug, Clone)]
pub struct RecipientToken {
    pub signing_secret: String,
}

#[derive(Debug, Clone)]
pub struct RateLimit {
    pub lookup_max: i32,
    pub lookup_window: i64,
    pub signup_max: i32,
    pub signup_window: i64,
}
