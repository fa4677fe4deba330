use config_validator::{env_or, env_str_or, require_env, ConfigError};

/// Application configuration parsed from environment variables, via the
/// shared [`config_validator`] builder.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            host: env_str_or("HOST", "0.0.0.0"),
            port: env_or("PORT", 8097u16),
        })
    }
}
