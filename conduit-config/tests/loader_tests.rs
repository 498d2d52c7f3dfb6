//! Integration tests for layered options loading.

use conduit_config::{ConfigError, OptionsLoader};
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_toml_file_then_env_override() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conduit.toml");
    fs::write(
        &path,
        r#"
max_retries = 1
timeout_ms = 5000

[routes."inventory.lookup"]
cacheable = true
cache_ttl_secs = 30
"#,
    )
    .unwrap();

    let vars = env(&[("CONDUIT_MAX_RETRIES", "4")]);
    let options = OptionsLoader::new()
        .required_file(&path)
        .load_with_lookup(|k| vars.get(k).cloned())
        .unwrap();

    assert_eq!(options.max_retries, 4);
    assert_eq!(options.timeout(), Duration::from_secs(5));
    assert!(options.is_cacheable("inventory.lookup"));
    assert_eq!(
        options.cache_ttl_for("inventory.lookup"),
        Duration::from_secs(30)
    );
}

#[test]
fn test_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conduit.json");
    fs::write(&path, r#"{"breaker_failure_threshold": 2}"#).unwrap();

    let options = OptionsLoader::new()
        .file(&path)
        .load_with_lookup(|_| None)
        .unwrap();

    assert_eq!(options.breaker_failure_threshold, 2);
}

#[test]
fn test_invalid_file_values_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conduit.toml");
    fs::write(&path, "timeout_ms = 0\n").unwrap();

    let result = OptionsLoader::new().file(&path).load_with_lookup(|_| None);
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_env_can_invalidate_file() {
    let vars = env(&[("CONDUIT_CACHE_TTL_SECS", "0")]);
    let result = OptionsLoader::new().load_with_lookup(|k| vars.get(k).cloned());
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conduit.yaml");
    fs::write(&path, "max_retries: 1\n").unwrap();

    let result = OptionsLoader::new().file(&path).load_with_lookup(|_| None);
    assert!(matches!(result, Err(ConfigError::LoadError(_))));
}
