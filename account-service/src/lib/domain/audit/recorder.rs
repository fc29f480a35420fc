use std::sync::Arc;

use crate::audit::models::NewAuditEntry;
use crate::audit::models::NewSecurityEvent;
use crate::audit::ports::AuditStore;

/// Appends audit and security-event records around account-security actions.
///
/// Recording is best-effort: a failed write is reported through tracing and
/// must not roll back the action that triggered it. The caller's outcome
/// stands either way.
pub struct AuditRecorder<S>
where
    S: AuditStore,
{
    store: Arc<S>,
}

impl<S> AuditRecorder<S>
where
    S: AuditStore,
{
    /// Create a new recorder over an audit store.
    ///
    /// # Arguments
    /// * `store` - Append-only log store implementation
    ///
    /// # Returns
    /// Configured recorder instance
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Append one audit entry.
    ///
    /// # Arguments
    /// * `entry` - Entry to record
    pub async fn record(&self, entry: NewAuditEntry) {
        if let Err(e) = self.store.append_audit(&entry).await {
            tracing::error!(
                action = entry.action.as_str(),
                origin = %entry.origin,
                error = %e,
                "Failed to append audit entry"
            );
        }
    }

    /// Append one security event.
    ///
    /// # Arguments
    /// * `event` - Event to record
    pub async fn record_security_event(&self, event: NewSecurityEvent) {
        if let Err(e) = self.store.append_security_event(&event).await {
            tracing::error!(
                event_type = event.kind.as_str(),
                severity = event.severity.as_str(),
                origin = %event.origin,
                error = %e,
                "Failed to append security event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use mockall::mock;

    use super::*;
    use crate::audit::models::AuditAction;
    use crate::audit::models::SecurityEventKind;
    use crate::audit::models::Severity;
    use crate::audit::ports::AuditStoreError;

    mock! {
        pub TestAuditStore {}

        #[async_trait]
        impl AuditStore for TestAuditStore {
            async fn append_audit(&self, entry: &NewAuditEntry) -> Result<(), AuditStoreError>;
            async fn append_security_event(&self, event: &NewSecurityEvent) -> Result<(), AuditStoreError>;
        }
    }

    #[tokio::test]
    async fn test_record_appends_entry() {
        let mut store = MockTestAuditStore::new();
        store
            .expect_append_audit()
            .withf(|entry| entry.action == AuditAction::Login)
            .times(1)
            .returning(|_| Ok(()));

        let recorder = AuditRecorder::new(Arc::new(store));
        recorder
            .record(NewAuditEntry::new(
                None,
                AuditAction::Login,
                "203.0.113.9",
                "User logged in",
            ))
            .await;
    }

    #[tokio::test]
    async fn test_store_failure_does_not_propagate() {
        let mut store = MockTestAuditStore::new();
        store
            .expect_append_security_event()
            .times(1)
            .returning(|_| Err(AuditStoreError::DatabaseError("down".to_string())));

        let recorder = AuditRecorder::new(Arc::new(store));

        // Must not panic or surface the failure
        recorder
            .record_security_event(NewSecurityEvent::new(
                SecurityEventKind::LoginFailed,
                Severity::Medium,
                "203.0.113.9",
                "Failed login attempt",
                None,
            ))
            .await;
    }
}
