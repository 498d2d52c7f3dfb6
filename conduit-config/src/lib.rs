//! Options for the Conduit proxy pipeline.
//!
//! The pipeline itself only needs a small options object: retry count and
//! base delay, call timeout, circuit breaker threshold and open duration,
//! and the default cache TTL. This crate defines that object, loads it from
//! TOML or JSON files, layers `CONDUIT_*` environment overrides on top, and
//! validates the result.
//!
//! ```no_run
//! use conduit_config::OptionsLoader;
//!
//! # fn main() -> Result<(), conduit_config::ConfigError> {
//! let options = OptionsLoader::new()
//!     .file("conduit.toml")
//!     .dotenv(true)
//!     .load()?;
//!
//! println!("retrying up to {} times", options.max_retries);
//! # Ok(())
//! # }
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod options;
pub mod validation;

pub use env::EnvOverrides;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat, OptionsLoader};
pub use options::{ProxyOptions, RouteOptions};
pub use validation::{ConfigValidator, Validate};
