use config_validator::{env_or, env_str_or, require_env, ConfigError};

/// Application configuration parsed from environment variables, via the
/// shared [`config_validator`] builder. `integration_keys` is the
/// comma-separated `X-Integration-Key` allowlist C9's POS endpoints check
/// callers against (spec §6) — static shared secrets, not per-user tokens.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bus_type: String,
    pub nats_url: String,
    pub host: String,
    pub port: u16,
    pub integration_keys: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let integration_keys = env_str_or("INTEGRATION_KEYS", "")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            bus_type: env_str_or("BUS_TYPE", "inmemory"),
            nats_url: env_str_or("NATS_URL", "nats://localhost:4222"),
            host: env_str_or("HOST", "0.0.0.0"),
            port: env_or("PORT", 8093u16),
            integration_keys,
        })
    }
}
