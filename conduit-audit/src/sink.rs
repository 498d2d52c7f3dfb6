//! Audit record sinks

use crate::AuditRecord;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Write one record
    async fn write(&self, record: &AuditRecord) -> Result<(), AuditSinkError>;

    /// Flush any pending writes
    async fn flush(&self) -> Result<(), AuditSinkError> {
        Ok(())
    }

    /// Name used in diagnostics
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Audit sink errors
#[derive(Debug, thiserror::Error)]
pub enum AuditSinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink error: {0}")]
    Other(String),
}

/// File sink
///
/// Appends records to a file, one JSON object per line.
pub struct FileSink {
    path: PathBuf,
    // Serializes appends so concurrent calls never interleave lines.
    lock: Mutex<()>,
}

impl FileSink {
    /// Create a new file sink
    ///
    /// ```no_run
    /// use conduit_audit::FileSink;
    ///
    /// let sink = FileSink::new("audit.jsonl");
    /// ```
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for FileSink {
    async fn write(&self, record: &AuditRecord) -> Result<(), AuditSinkError> {
        let mut line = record.to_json()?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// In-memory sink, mostly for tests.
///
/// Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records written so far, oldest first
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.records.lock().await.clear();
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn write(&self, record: &AuditRecord) -> Result<(), AuditSinkError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Emits each record as an `info` event on the `conduit::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl AuditSink for TracingSink {
    async fn write(&self, record: &AuditRecord) -> Result<(), AuditSinkError> {
        tracing::info!(
            target: "conduit::audit",
            id = %record.id,
            action = %record.action,
            outcome = %record.outcome,
            correlation_id = record.correlation_id.as_deref().unwrap_or(""),
            duration_ms = record.duration_ms,
            error_kind = record.error_kind.as_deref().unwrap_or(""),
            cache_hit = record.cache_hit,
            attempt = record.attempt,
            "audit"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}
