use async_trait::async_trait;
use thiserror::Error;

use crate::audit::models::NewAuditEntry;
use crate::audit::models::NewSecurityEvent;

/// Error for audit persistence operations.
#[derive(Debug, Clone, Error)]
pub enum AuditStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Append-only persistence for audit entries and security events.
///
/// No update or delete operations exist at this boundary; rows outlive the
/// sessions that created them.
#[async_trait]
pub trait AuditStore: Send + Sync + 'static {
    /// Append one audit trail entry.
    ///
    /// # Arguments
    /// * `entry` - Entry to persist
    ///
    /// # Errors
    /// * `DatabaseError` - Insert failed
    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<(), AuditStoreError>;

    /// Append one security event.
    ///
    /// # Arguments
    /// * `event` - Event to persist
    ///
    /// # Errors
    /// * `DatabaseError` - Insert failed
    async fn append_security_event(&self, event: &NewSecurityEvent) -> Result<(), AuditStoreError>;
}
