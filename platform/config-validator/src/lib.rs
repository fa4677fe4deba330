//! Shared environment-variable config builder.
//!
//! Every module's `config.rs` (see `gl-rs`'s `Config::from_env`) repeats the
//! same pattern: read a handful of required vars with a `"X must be set"`
//! error, and a handful of defaulted vars parsed with `unwrap_or_else`. This
//! crate pulls that pattern into one reusable builder so the duplication
//! doesn't have to be hand-rolled per module.

use std::env;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(String),
    #[error("{0} is set but could not be parsed: {1}")]
    Invalid(String, String),
}

/// Reads a required environment variable, failing with the same message
/// shape every hand-written `Config::from_env` used:
/// `format!("{name} must be set")`.
pub fn require_env(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name.to_string()))
}

/// Reads and parses a required environment variable.
pub fn require_env_parsed<T: FromStr>(name: &str) -> Result<T, ConfigError> {
    let raw = require_env(name)?;
    raw.parse::<T>()
        .map_err(|_| ConfigError::Invalid(name.to_string(), raw))
}

/// Reads an optional environment variable, parsing it if present or falling
/// back to `default`.
pub fn env_or<T: FromStr + Clone>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Reads an optional environment variable as a raw string.
pub fn env_str_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}
