// Options validation

use crate::{ConfigError, ProxyOptions, Result, RouteOptions};

/// Longest backoff base delay accepted, in milliseconds.
pub const MAX_RETRY_BASE_DELAY_MS: u64 = 30_000;

/// Longest cache TTL accepted, in seconds.
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validator with rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate that a number is within an inclusive range
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<()>
    where
        T: PartialOrd + std::fmt::Display,
    {
        if value < min || value > max {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between {} and {}, got {}",
                field, min, max, value
            )));
        }
        Ok(())
    }

    /// Validate that a number is at least `min`
    pub fn at_least<T>(value: T, min: T, field: &str) -> Result<()>
    where
        T: PartialOrd + std::fmt::Display,
    {
        if value < min {
            return Err(ConfigError::ValidationError(format!(
                "{} must be at least {}, got {}",
                field, min, value
            )));
        }
        Ok(())
    }
}

impl Validate for ProxyOptions {
    fn validate(&self) -> Result<()> {
        ConfigValidator::in_range(
            self.retry_base_delay_ms,
            0,
            MAX_RETRY_BASE_DELAY_MS,
            "retry_base_delay_ms",
        )?;
        ConfigValidator::at_least(self.timeout_ms, 1, "timeout_ms")?;
        ConfigValidator::at_least(self.breaker_failure_threshold, 1, "breaker_failure_threshold")?;
        ConfigValidator::at_least(self.breaker_open_duration_ms, 1, "breaker_open_duration_ms")?;
        ConfigValidator::in_range(self.cache_ttl_secs, 1, MAX_CACHE_TTL_SECS, "cache_ttl_secs")?;

        for (name, route) in &self.routes {
            ConfigValidator::not_empty(name, "route name")?;
            validate_route(name, route)?;
        }

        Ok(())
    }
}

fn validate_route(name: &str, route: &RouteOptions) -> Result<()> {
    let field = |f: &str| format!("routes.{}.{}", name, f);

    if let Some(timeout) = route.timeout_ms {
        ConfigValidator::at_least(timeout, 1, &field("timeout_ms"))?;
    }
    if let Some(threshold) = route.breaker_failure_threshold {
        ConfigValidator::at_least(threshold, 1, &field("breaker_failure_threshold"))?;
    }
    if let Some(open) = route.breaker_open_duration_ms {
        ConfigValidator::at_least(open, 1, &field("breaker_open_duration_ms"))?;
    }
    if let Some(ttl) = route.cache_ttl_secs {
        ConfigValidator::in_range(ttl, 1, MAX_CACHE_TTL_SECS, &field("cache_ttl_secs"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("", "field").is_err());
        assert!(ConfigValidator::not_empty("  ", "field").is_err());
    }

    #[test]
    fn test_range_validation() {
        assert!(ConfigValidator::in_range(5, 1, 10, "field").is_ok());
        assert!(ConfigValidator::in_range(0, 1, 10, "field").is_err());
        assert!(ConfigValidator::in_range(11, 1, 10, "field").is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(ProxyOptions::default().validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let options = ProxyOptions {
            breaker_failure_threshold: 0,
            ..Default::default()
        };
        let err = options.validate().unwrap_err().to_string();
        assert!(err.contains("breaker_failure_threshold"));
    }

    #[test]
    fn test_zero_retries_allowed() {
        let options = ProxyOptions {
            max_retries: 0,
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_route_errors_name_the_route() {
        let options = ProxyOptions::default().with_route(
            "orders.get",
            RouteOptions {
                cache_ttl_secs: Some(0),
                ..Default::default()
            },
        );
        let err = options.validate().unwrap_err().to_string();
        assert!(err.contains("routes.orders.get.cache_ttl_secs"));
    }
}
