//! Cache stores for the Conduit proxy pipeline.
//!
//! The caching interceptor stores successful results as JSON strings under
//! deterministic keys. Any backend implementing [`CacheStore`] can sit behind
//! it; [`InMemoryCache`] is the process-local default.
//!
//! # Examples
//!
//! ```
//! use conduit_cache::{CacheStore, InMemoryCache};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), conduit_cache::CacheError> {
//! let cache = InMemoryCache::new();
//! cache.set_json("user:1", r#"{"name":"Ada"}"#.to_string(), Some(Duration::from_secs(60))).await?;
//!
//! assert!(cache.exists("user:1").await?);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod helpers;
pub mod memory;
pub mod traits;

pub use error::{CacheError, CacheResult};
pub use helpers::{get, set};
pub use memory::InMemoryCache;
pub use traits::CacheStore;
