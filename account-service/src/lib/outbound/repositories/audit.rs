use async_trait::async_trait;
use sqlx::PgPool;

use crate::audit::models::NewAuditEntry;
use crate::audit::models::NewSecurityEvent;
use crate::audit::ports::AuditStore;
use crate::audit::ports::AuditStoreError;

/// Append-only Postgres adapter for the audit trail.
pub struct PostgresAuditStore {
    pool: PgPool,
}

impl PostgresAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<(), AuditStoreError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (user_id, action, resource, resource_id, ip_address, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.actor.map(|id| id.0))
        .bind(entry.action.as_str())
        .bind(&entry.resource)
        .bind(&entry.resource_id)
        .bind(&entry.origin)
        .bind(&entry.description)
        .execute(&self.pool)
        .await
        .map_err(|e| AuditStoreError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn append_security_event(&self, event: &NewSecurityEvent) -> Result<(), AuditStoreError> {
        sqlx::query(
            r#"
            INSERT INTO security_events (event_type, severity, ip_address, description, user_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.kind.as_str())
        .bind(event.severity.as_str())
        .bind(&event.origin)
        .bind(&event.description)
        .bind(event.actor.map(|id| id.0))
        .execute(&self.pool)
        .await
        .map_err(|e| AuditStoreError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
