// Options file loaders

use crate::{ConfigError, EnvOverrides, ProxyOptions, Result, Validate};
use std::fs;
use std::path::{Path, PathBuf};

/// Supported options file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// Parses a single options file.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file extension
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::LoadError(format!("Unsupported format: {}", ext)))?;

        Ok(Self::new(format))
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Parse options from a string. Missing fields keep their defaults.
    pub fn parse_options(&self, content: &str) -> Result<ProxyOptions> {
        match self.format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e))),
            FileFormat::Toml => toml::from_str(content)
                .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e))),
        }
    }

    /// Read and parse an options file.
    pub fn load_options(&self, path: impl AsRef<Path>) -> Result<ProxyOptions> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        self.parse_options(&content)
    }
}

/// Layered options loading: defaults, then an optional file, then
/// environment overrides, then validation.
pub struct OptionsLoader {
    file: Option<PathBuf>,
    required: bool,
    env_prefix: Option<String>,
    dotenv: bool,
}

impl OptionsLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            required: false,
            env_prefix: Some("CONDUIT".to_string()),
            dotenv: false,
        }
    }

    /// Read options from a file if it exists.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self.required = false;
        self
    }

    /// Read options from a file; loading fails if it is missing.
    pub fn required_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self.required = true;
        self
    }

    /// Change the environment prefix, or disable overrides with `None`.
    pub fn env_prefix(mut self, prefix: Option<&str>) -> Self {
        self.env_prefix = prefix.map(str::to_string);
        self
    }

    /// Load a `.env` file into the process environment before reading overrides.
    pub fn dotenv(mut self, enabled: bool) -> Self {
        self.dotenv = enabled;
        self
    }

    /// Load using the process environment.
    pub fn load(self) -> Result<ProxyOptions> {
        if self.dotenv {
            match dotenvy::dotenv() {
                Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
                Err(e) if e.not_found() => {}
                Err(e) => return Err(ConfigError::LoadError(e.to_string())),
            }
        }

        self.load_with_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary environment lookup.
    pub fn load_with_lookup<F>(self, lookup: F) -> Result<ProxyOptions>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = match &self.file {
            Some(path) if path.exists() => {
                let options = ConfigLoader::auto(path)?.load_options(path)?;
                tracing::debug!(path = %path.display(), "Loaded proxy options file");
                options
            }
            Some(path) if self.required => {
                return Err(ConfigError::LoadError(format!(
                    "Options file not found: {}",
                    path.display()
                )));
            }
            _ => ProxyOptions::default(),
        };

        if let Some(prefix) = &self.env_prefix {
            let applied = EnvOverrides::new(prefix.clone()).apply_from(&mut options, lookup)?;
            if applied > 0 {
                tracing::debug!(prefix = %prefix, applied, "Applied environment overrides");
            }
        }

        options.validate()?;
        Ok(options)
    }
}

impl Default for OptionsLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_options() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let options = loader
            .parse_options(r#"{"max_retries": 1, "routes": {"users.get": {"cacheable": true}}}"#)
            .unwrap();

        assert_eq!(options.max_retries, 1);
        assert_eq!(options.timeout_ms, 30_000);
        assert!(options.is_cacheable("users.get"));
    }

    #[test]
    fn test_parse_toml_options() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let options = loader
            .parse_options(
                r#"
                timeout_ms = 2000

                [routes."users.get"]
                timeout_ms = 250
                cache_ttl_secs = 60
            "#,
            )
            .unwrap();

        assert_eq!(options.timeout_ms, 2000);
        assert_eq!(options.timeout_for("users.get").as_millis(), 250);
        assert_eq!(options.cache_ttl_for("users.get").as_secs(), 60);
    }

    #[test]
    fn test_parse_error() {
        let loader = ConfigLoader::new(FileFormat::Json);
        assert!(matches!(
            loader.parse_options("{ not json"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("TOML"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("yaml"), None);
        assert!(ConfigLoader::auto("conduit").is_err());
        assert_eq!(
            ConfigLoader::auto("conduit.toml").unwrap().format(),
            FileFormat::Toml
        );
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let options = OptionsLoader::new()
            .file("/definitely/not/here.toml")
            .load_with_lookup(|_| None)
            .unwrap();
        assert_eq!(options, ProxyOptions::default());
    }

    #[test]
    fn test_missing_required_file_fails() {
        let result = OptionsLoader::new()
            .required_file("/definitely/not/here.toml")
            .load_with_lookup(|_| None);
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn test_env_prefix_disabled() {
        let options = OptionsLoader::new()
            .env_prefix(None)
            .load_with_lookup(|_| Some("0".to_string()))
            .unwrap();
        assert_eq!(options.max_retries, 3);
    }
}
