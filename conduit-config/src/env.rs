// Environment variable overrides

use crate::{ConfigError, ProxyOptions, Result};
use std::env;
use std::str::FromStr;

/// Applies `{PREFIX}_*` environment variables on top of loaded options.
///
/// Recognised keys (with the default `CONDUIT` prefix):
///
/// | variable                               | field                        |
/// |----------------------------------------|------------------------------|
/// | `CONDUIT_MAX_RETRIES`                  | `max_retries`                |
/// | `CONDUIT_RETRY_BASE_DELAY_MS`          | `retry_base_delay_ms`        |
/// | `CONDUIT_TIMEOUT_MS`                   | `timeout_ms`                 |
/// | `CONDUIT_BREAKER_FAILURE_THRESHOLD`    | `breaker_failure_threshold`  |
/// | `CONDUIT_BREAKER_OPEN_DURATION_MS`     | `breaker_open_duration_ms`   |
/// | `CONDUIT_CACHE_TTL_SECS`               | `cache_ttl_secs`             |
/// | `CONDUIT_CACHE_BY_DEFAULT`             | `cache_by_default`           |
pub struct EnvOverrides {
    prefix: String,
}

impl EnvOverrides {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Full variable name for a key.
    pub fn var_name(&self, key: &str) -> String {
        format!("{}_{}", self.prefix, key.to_uppercase())
    }

    /// Apply overrides from the process environment.
    pub fn apply(&self, options: &mut ProxyOptions) -> Result<usize> {
        self.apply_from(options, |key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; returns how many were applied.
    pub fn apply_from<F>(&self, options: &mut ProxyOptions, lookup: F) -> Result<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        let mut read = |key: &str| {
            let value = lookup(&self.var_name(key));
            if value.is_some() {
                applied += 1;
            }
            value
        };

        if let Some(v) = read("MAX_RETRIES") {
            options.max_retries = parse(&self.var_name("MAX_RETRIES"), &v)?;
        }
        if let Some(v) = read("RETRY_BASE_DELAY_MS") {
            options.retry_base_delay_ms = parse(&self.var_name("RETRY_BASE_DELAY_MS"), &v)?;
        }
        if let Some(v) = read("TIMEOUT_MS") {
            options.timeout_ms = parse(&self.var_name("TIMEOUT_MS"), &v)?;
        }
        if let Some(v) = read("BREAKER_FAILURE_THRESHOLD") {
            options.breaker_failure_threshold =
                parse(&self.var_name("BREAKER_FAILURE_THRESHOLD"), &v)?;
        }
        if let Some(v) = read("BREAKER_OPEN_DURATION_MS") {
            options.breaker_open_duration_ms =
                parse(&self.var_name("BREAKER_OPEN_DURATION_MS"), &v)?;
        }
        if let Some(v) = read("CACHE_TTL_SECS") {
            options.cache_ttl_secs = parse(&self.var_name("CACHE_TTL_SECS"), &v)?;
        }
        if let Some(v) = read("CACHE_BY_DEFAULT") {
            options.cache_by_default = parse_bool(&self.var_name("CACHE_BY_DEFAULT"), &v)?;
        }

        Ok(applied)
    }
}

impl Default for EnvOverrides {
    fn default() -> Self {
        Self::new("CONDUIT")
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}
