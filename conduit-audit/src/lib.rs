//! Audit records for proxied calls.
//!
//! The auditing interceptor builds one [`AuditRecord`] per completed call
//! and hands it to every registered [`AuditSink`]. Sink failures never fail
//! the call; the interceptor logs and moves on.
//!
//! # Sinks
//!
//! - [`MemorySink`] - keeps records in memory (tests, diagnostics)
//! - [`FileSink`] - appends JSON lines to a file
//! - [`TracingSink`] - emits a `tracing` event per record
//!
//! ```
//! use conduit_audit::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), AuditSinkError> {
//! let sink = MemorySink::new();
//! sink.write(&AuditRecord::new("orders.get").outcome(AuditOutcome::Success)).await?;
//!
//! assert_eq!(sink.len().await, 1);
//! # Ok(())
//! # }
//! ```

mod record;
mod sink;

pub use record::{AuditOutcome, AuditRecord};
pub use sink::{AuditSink, AuditSinkError, FileSink, MemorySink, TracingSink};
