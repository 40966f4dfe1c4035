/// Audit trail for notification and chat message history.
///
/// The sink itself is an external collaborator. The relay only promises to
/// call it once per dispatch, off the delivery path, and to swallow any
/// failure it reports.
use crate::models::{AuditRecord, MessageRecord};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_notification(&self, record: AuditRecord) -> Result<(), AuditError>;

    async fn record_message(&self, record: MessageRecord) -> Result<(), AuditError>;
}

/// Writes audit records as structured log lines on the `audit` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record_notification(&self, record: AuditRecord) -> Result<(), AuditError> {
        let payload = serde_json::to_string(&record)?;
        tracing::info!(
            target: "audit",
            kind = "notification",
            status = record.status.as_str(),
            user_id = ?record.user_id,
            room = ?record.room,
            record = %payload,
            "notification recorded"
        );
        Ok(())
    }

    async fn record_message(&self, record: MessageRecord) -> Result<(), AuditError> {
        let payload = serde_json::to_string(&record)?;
        tracing::info!(
            target: "audit",
            kind = "message",
            status = record.status.as_str(),
            record = %payload,
            "message recorded"
        );
        Ok(())
    }
}

/// Fire-and-forget front for an `AuditSink`.
///
/// Sink calls are spawned on the runtime captured at construction, so a
/// producer on any thread still gets its record attempted.
#[derive(Clone)]
pub struct AuditTrail {
    sink: Arc<dyn AuditSink>,
    runtime: Handle,
}

impl AuditTrail {
    pub fn new(sink: Arc<dyn AuditSink>, runtime: Handle) -> Self {
        Self { sink, runtime }
    }

    pub fn notification(&self, record: AuditRecord) {
        let sink = Arc::clone(&self.sink);
        self.runtime.spawn(async move {
            if let Err(e) = sink.record_notification(record).await {
                tracing::warn!(error = %e, "Audit sink rejected notification record");
            }
        });
    }

    pub fn message(&self, record: MessageRecord) {
        let sink = Arc::clone(&self.sink);
        self.runtime.spawn(async move {
            if let Err(e) = sink.record_message(record).await {
                tracing::warn!(error = %e, "Audit sink rejected message record");
            }
        });
    }
}
