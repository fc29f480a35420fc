use crate::account::models::UserId;

/// Action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Login,
    Logout,
    PasswordChange,
    TwoFactorEnabled,
    TwoFactorDisabled,
}

impl AuditAction {
    /// Get the stored representation of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::PasswordChange => "PASSWORD_CHANGE",
            AuditAction::TwoFactorEnabled => "2FA_ENABLED",
            AuditAction::TwoFactorDisabled => "2FA_DISABLED",
        }
    }
}

/// Classification of an anomalous security occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEventKind {
    LoginFailed,
    LoginBlocked,
    TwoFactorFailed,
}

impl SecurityEventKind {
    /// Get the stored representation of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventKind::LoginFailed => "login_failed",
            SecurityEventKind::LoginBlocked => "login_blocked",
            SecurityEventKind::TwoFactorFailed => "2fa_failed",
        }
    }
}

/// Severity tier of a security event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Get the stored representation of the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// One audit trail entry, ready to append.
///
/// Rows are write-once; nothing in this subsystem updates or deletes them.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    /// Acting user; None for events preceding identification
    pub actor: Option<UserId>,
    pub action: AuditAction,
    pub resource: String,
    pub resource_id: Option<String>,
    pub origin: String,
    pub description: String,
}

impl NewAuditEntry {
    /// Construct an audit entry for the auth resource.
    ///
    /// # Arguments
    /// * `actor` - Acting user, if identified
    /// * `action` - What happened
    /// * `origin` - Network address of the request
    /// * `description` - Human-readable summary
    pub fn new(
        actor: Option<UserId>,
        action: AuditAction,
        origin: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            actor,
            action,
            resource: "auth".to_string(),
            resource_id: None,
            origin: origin.into(),
            description: description.into(),
        }
    }
}

/// One security event, ready to append.
///
/// Written only for anomalous outcomes, never for routine successes.
#[derive(Debug, Clone)]
pub struct NewSecurityEvent {
    pub kind: SecurityEventKind,
    pub severity: Severity,
    pub origin: String,
    pub description: String,
    pub actor: Option<UserId>,
}

impl NewSecurityEvent {
    /// Construct a security event.
    ///
    /// # Arguments
    /// * `kind` - Event classification
    /// * `severity` - Severity tier
    /// * `origin` - Network address of the request
    /// * `description` - Human-readable summary
    /// * `actor` - Affected user, if identified
    pub fn new(
        kind: SecurityEventKind,
        severity: Severity,
        origin: impl Into<String>,
        description: impl Into<String>,
        actor: Option<UserId>,
    ) -> Self {
        Self {
            kind,
            severity,
            origin: origin.into(),
            description: description.into(),
            actor,
        }
    }
}
