// Conduit - an ordered interceptor pipeline for outbound proxy calls
//
// Calls travel through retry, circuit breaking, timeouts, caching, auditing
// and the other interceptors before a pluggable transport performs the I/O.

// Re-export the pipeline
pub use conduit_proxy::*;

// Re-export member crates
pub use conduit_audit as audit;
pub use conduit_cache as cache;
pub use conduit_config as config;

#[cfg(feature = "log")]
pub use conduit_log as log;

pub use conduit_audit::{AuditOutcome, AuditRecord, AuditSink, MemorySink};
pub use conduit_cache::{CacheStore, InMemoryCache};
pub use conduit_config::{OptionsLoader, ProxyOptions, RouteOptions};

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AuditSink,
        CacheStore,
        CallOptions,
        ErrorKind,
        InMemoryCache,
        Interceptor,
        Next,
        ProxyClient,
        ProxyContext,
        ProxyError,
        ProxyOptions,
        Response,
        Transport,
        async_trait,
        order,
    };

    #[cfg(feature = "http")]
    pub use crate::HttpTransport;
}
