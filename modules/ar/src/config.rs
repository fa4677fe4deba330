use config_validator::{env_or, env_str_or, require_env, ConfigError};

/// Application configuration parsed from environment variables, via the
/// shared [`config_validator`] builder rather than a hand-rolled
/// `env::var(...).unwrap_or(...)` chain per module.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bus_type: String,
    pub nats_url: String,
    pub host: String,
    pub port: u16,
    /// HMAC key for minting/verifying the anonymous invoice public-link
    /// token (spec §6 `POST .../public-link` / `GET /public/invoices/{token}`).
    pub public_link_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            bus_type: env_str_or("BUS_TYPE", "inmemory"),
            nats_url: env_str_or("NATS_URL", "nats://localhost:4222"),
            host: env_str_or("HOST", "0.0.0.0"),
            port: env_or("PORT", 8091u16),
            public_link_secret: require_env("PUBLIC_LINK_SECRET")?,
        })
    }
}
