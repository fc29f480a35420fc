use std::sync::Arc;

use async_trait::async_trait;
use auth::generate_random_secret;
use auth::validate_strength;
use auth::PasswordHasher;
use auth::TokenIssuer;
use auth::TokenKind;
use auth::TotpEngine;
use chrono::Duration;
use chrono::Utc;

use crate::account::errors::AuthError;
use crate::account::lockout::LockoutPolicy;
use crate::account::models::LoginCommand;
use crate::account::models::SessionTokens;
use crate::account::models::TwoFactorSetup;
use crate::account::models::UserCredential;
use crate::account::models::UserId;
use crate::account::models::UserProfile;
use crate::account::ports::AuthServicePort;
use crate::account::ports::UserCredentialRepository;
use crate::audit::models::AuditAction;
use crate::audit::models::NewAuditEntry;
use crate::audit::models::NewSecurityEvent;
use crate::audit::models::SecurityEventKind;
use crate::audit::models::Severity;
use crate::audit::ports::AuditStore;
use crate::audit::recorder::AuditRecorder;

/// Extended access-token lifetime granted to remember-me logins.
const REMEMBER_ME_TTL_DAYS: i64 = 7;

/// Number of single-use backup codes handed out at two-factor setup.
const BACKUP_CODE_COUNT: usize = 10;

/// Length of each backup code.
const BACKUP_CODE_LENGTH: usize = 8;

/// Domain service orchestrating login, token, and two-factor flows.
///
/// Concrete implementation of AuthServicePort with dependency injection.
/// Composes the credential verifier, lockout policy, token issuer, TOTP
/// engine, and audit recorder over the injected stores.
pub struct AuthService<R, S>
where
    R: UserCredentialRepository,
    S: AuditStore,
{
    repository: Arc<R>,
    lockout: LockoutPolicy<R>,
    audit: AuditRecorder<S>,
    password_hasher: PasswordHasher,
    token_issuer: Arc<TokenIssuer>,
    totp: TotpEngine,
}

impl<R, S> AuthService<R, S>
where
    R: UserCredentialRepository,
    S: AuditStore,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User credential persistence implementation
    /// * `audit_store` - Append-only log store implementation
    /// * `token_issuer` - Configured session token issuer, shared with the
    ///   inbound authentication middleware
    /// * `totp` - Configured TOTP engine
    ///
    /// # Returns
    /// Configured auth service instance
    pub fn new(
        repository: Arc<R>,
        audit_store: Arc<S>,
        token_issuer: Arc<TokenIssuer>,
        totp: TotpEngine,
    ) -> Self {
        Self {
            lockout: LockoutPolicy::new(Arc::clone(&repository)),
            repository,
            audit: AuditRecorder::new(audit_store),
            password_hasher: PasswordHasher::new(),
            token_issuer,
            totp,
        }
    }

    /// Issue the access/refresh pair plus profile for a user.
    fn issue_session(
        &self,
        user: &UserCredential,
        remember_me: bool,
    ) -> Result<SessionTokens, AuthError> {
        let subject = user.id.to_string();

        let ttl_override = remember_me.then(|| Duration::days(REMEMBER_ME_TTL_DAYS));
        let access_token = self.token_issuer.issue_access_token(&subject, ttl_override)?;
        let refresh_token = self.token_issuer.issue_refresh_token(&subject)?;

        Ok(SessionTokens {
            access_token,
            refresh_token,
            expires_in: self.token_issuer.access_ttl().num_seconds(),
            profile: UserProfile::from(user),
        })
    }
}

#[async_trait]
impl<R, S> AuthServicePort for AuthService<R, S>
where
    R: UserCredentialRepository,
    S: AuditStore,
{
    async fn login(&self, command: LoginCommand) -> Result<SessionTokens, AuthError> {
        let user = self
            .repository
            .find_by_username_or_email(&command.identifier)
            .await?;

        // Credential check comes first; unknown identifier and wrong password
        // produce the same rejection
        let Some(mut user) = user else {
            self.audit
                .record_security_event(NewSecurityEvent::new(
                    SecurityEventKind::LoginFailed,
                    Severity::Medium,
                    command.origin.as_str(),
                    format!("Failed login attempt for identifier: {}", command.identifier),
                    None,
                ))
                .await;
            return Err(AuthError::InvalidCredentials);
        };

        let password_ok = self
            .password_hasher
            .verify(&command.password, &user.password_hash)?;

        if !password_ok {
            self.audit
                .record_security_event(NewSecurityEvent::new(
                    SecurityEventKind::LoginFailed,
                    Severity::Medium,
                    command.origin.as_str(),
                    format!("Failed login attempt for identifier: {}", command.identifier),
                    Some(user.id),
                ))
                .await;

            self.lockout.record_failure(&user.id).await?;
            return Err(AuthError::InvalidCredentials);
        }

        // Account status is revealed only after the credentials proved correct
        if !user.is_active {
            self.audit
                .record_security_event(NewSecurityEvent::new(
                    SecurityEventKind::LoginBlocked,
                    Severity::Medium,
                    command.origin.as_str(),
                    format!("Login attempt on inactive account: {}", user.username),
                    Some(user.id),
                ))
                .await;
            return Err(AuthError::AccountInactive);
        }

        let now = Utc::now();
        if LockoutPolicy::<R>::is_locked(&user, now) {
            let until = user.locked_until.unwrap_or(now);
            self.audit
                .record_security_event(NewSecurityEvent::new(
                    SecurityEventKind::LoginBlocked,
                    Severity::Medium,
                    command.origin.as_str(),
                    format!("Login attempt on locked account: {}", user.username),
                    Some(user.id),
                ))
                .await;
            return Err(AuthError::AccountLocked { until });
        }

        if user.is_two_factor_enabled {
            // Absent code is a validation failure, not a security event
            let code = command
                .totp_code
                .as_deref()
                .ok_or(AuthError::TotpCodeRequired)?;

            let secret = user.totp_secret.as_deref().ok_or_else(|| {
                AuthError::Unknown("Two-factor enabled without a stored secret".to_string())
            })?;

            if !self.totp.verify_code(secret, code)? {
                self.audit
                    .record_security_event(NewSecurityEvent::new(
                        SecurityEventKind::TwoFactorFailed,
                        Severity::High,
                        command.origin.as_str(),
                        format!("Failed 2FA attempt for user: {}", user.username),
                        Some(user.id),
                    ))
                    .await;
                return Err(AuthError::InvalidTotpCode);
            }
        }

        self.lockout.record_success(&user.id, now).await?;
        user.failed_login_attempts = 0;
        user.locked_until = None;
        user.last_login = Some(now);

        let session = self.issue_session(&user, command.remember_me)?;

        self.audit
            .record(NewAuditEntry::new(
                Some(user.id),
                AuditAction::Login,
                command.origin.as_str(),
                "User logged in successfully",
            ))
            .await;

        Ok(session)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, AuthError> {
        let subject = self
            .token_issuer
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|_| AuthError::InvalidToken)?;

        let id = UserId::from_string(&subject).map_err(|_| AuthError::InvalidToken)?;

        let user = self
            .repository
            .find_by_id(&id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        // Deliberately unaudited: routine token rotation is not an
        // account-state change
        self.issue_session(&user, false)
    }

    async fn logout(&self, user_id: &UserId, origin: &str) -> Result<(), AuthError> {
        // Tokens stay valid until expiry; the record is the whole operation
        self.audit
            .record(NewAuditEntry::new(
                Some(*user_id),
                AuditAction::Logout,
                origin,
                "User logged out",
            ))
            .await;

        Ok(())
    }

    async fn change_password(
        &self,
        user_id: &UserId,
        current_password: &str,
        new_password: &str,
        origin: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .repository
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound(user_id.to_string()))?;

        let current_ok = self
            .password_hasher
            .verify(current_password, &user.password_hash)?;
        if !current_ok {
            return Err(AuthError::PasswordMismatch);
        }

        validate_strength(new_password).map_err(AuthError::WeakPassword)?;

        let password_hash = self.password_hasher.hash(new_password)?;
        self.repository
            .update_password_hash(user_id, &password_hash, Utc::now())
            .await?;

        self.audit
            .record(NewAuditEntry::new(
                Some(*user_id),
                AuditAction::PasswordChange,
                origin,
                "Password changed",
            ))
            .await;

        Ok(())
    }

    async fn setup_two_factor(
        &self,
        user_id: &UserId,
        password: &str,
        origin: &str,
    ) -> Result<TwoFactorSetup, AuthError> {
        let user = self
            .repository
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound(user_id.to_string()))?;

        let password_ok = self.password_hasher.verify(password, &user.password_hash)?;
        if !password_ok {
            return Err(AuthError::PasswordMismatch);
        }

        let secret = self.totp.generate_secret();
        let otpauth_uri = self.totp.provisioning_uri(user.email.as_str(), &secret);
        let qr_code = self.totp.qr_code_data_uri(&otpauth_uri)?;

        let backup_codes = (0..BACKUP_CODE_COUNT)
            .map(|_| generate_random_secret(BACKUP_CODE_LENGTH))
            .collect();

        // Only the secret is persisted; two-factor stays disabled until the
        // first code verifies
        self.repository.store_totp_secret(user_id, &secret).await?;

        tracing::info!(user_id = %user_id, origin = %origin, "Two-factor setup initiated");

        Ok(TwoFactorSetup {
            secret,
            otpauth_uri,
            qr_code,
            backup_codes,
        })
    }

    async fn verify_two_factor_setup(
        &self,
        user_id: &UserId,
        totp_code: &str,
        origin: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .repository
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound(user_id.to_string()))?;

        // A missing pending secret is a distinct rejection from a wrong code
        let secret = user
            .totp_secret
            .as_deref()
            .ok_or(AuthError::TwoFactorNotInitiated)?;

        if !self.totp.verify_code(secret, totp_code)? {
            return Err(AuthError::InvalidTotpCode);
        }

        self.repository.enable_two_factor(user_id).await?;

        self.audit
            .record(NewAuditEntry::new(
                Some(*user_id),
                AuditAction::TwoFactorEnabled,
                origin,
                "Two-factor authentication enabled",
            ))
            .await;

        Ok(())
    }

    async fn disable_two_factor(
        &self,
        user_id: &UserId,
        password: &str,
        totp_code: &str,
        origin: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .repository
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound(user_id.to_string()))?;

        let password_ok = self.password_hasher.verify(password, &user.password_hash)?;
        if !password_ok {
            return Err(AuthError::PasswordMismatch);
        }

        let secret = user
            .totp_secret
            .as_deref()
            .ok_or(AuthError::TwoFactorNotEnabled)?;

        if !self.totp.verify_code(secret, totp_code)? {
            return Err(AuthError::InvalidTotpCode);
        }

        // Flag, secret, and backup codes go in one update
        self.repository.disable_two_factor(user_id).await?;

        self.audit
            .record(NewAuditEntry::new(
                Some(*user_id),
                AuditAction::TwoFactorDisabled,
                origin,
                "Two-factor authentication disabled",
            ))
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use chrono::Utc;
    use data_encoding::BASE32_NOPAD;
    use mockall::mock;
    use mockall::predicate::*;
    use totp_lite::totp_custom;
    use totp_lite::Sha1;

    use super::*;
    use crate::account::models::EmailAddress;
    use crate::account::models::LockoutState;
    use crate::account::models::Username;
    use crate::audit::ports::AuditStoreError;

    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserCredentialRepository for TestUserRepository {
            async fn find_by_username_or_email(&self, identifier: &str) -> Result<Option<UserCredential>, AuthError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<UserCredential>, AuthError>;
            async fn record_login_failure(&self, id: &UserId, lock_threshold: i32, lock_until: DateTime<Utc>) -> Result<LockoutState, AuthError>;
            async fn record_login_success(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), AuthError>;
            async fn update_password_hash(&self, id: &UserId, password_hash: &str, changed_at: DateTime<Utc>) -> Result<(), AuthError>;
            async fn store_totp_secret(&self, id: &UserId, secret: &str) -> Result<(), AuthError>;
            async fn enable_two_factor(&self, id: &UserId) -> Result<(), AuthError>;
            async fn disable_two_factor(&self, id: &UserId) -> Result<(), AuthError>;
        }
    }

    mock! {
        pub TestAuditStore {}

        #[async_trait]
        impl AuditStore for TestAuditStore {
            async fn append_audit(&self, entry: &NewAuditEntry) -> Result<(), AuditStoreError>;
            async fn append_security_event(&self, event: &NewSecurityEvent) -> Result<(), AuditStoreError>;
        }
    }

    const PASSWORD: &str = "Correct_Password1";

    fn service(
        repository: MockTestUserRepository,
        audit_store: MockTestAuditStore,
    ) -> AuthService<MockTestUserRepository, MockTestAuditStore> {
        AuthService::new(
            Arc::new(repository),
            Arc::new(audit_store),
            Arc::new(TokenIssuer::new(
                b"test-secret-key-for-jwt-signing-at-least-32-bytes",
                Duration::minutes(30),
                Duration::days(7),
            )),
            TotpEngine::new("Test App"),
        )
    }

    fn test_user(password: &str) -> UserCredential {
        UserCredential {
            id: UserId::new(),
            username: Username::new("alice".to_string()).unwrap(),
            email: EmailAddress::new("alice@example.com".to_string()).unwrap(),
            password_hash: PasswordHasher::new().hash(password).unwrap(),
            is_active: true,
            is_verified: true,
            is_two_factor_enabled: false,
            totp_secret: None,
            failed_login_attempts: 0,
            locked_until: None,
            last_login: None,
            password_changed_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    fn login_command(totp_code: Option<&str>) -> LoginCommand {
        LoginCommand::new(
            "alice".to_string(),
            PASSWORD.to_string(),
            false,
            totp_code.map(str::to_string),
            "203.0.113.9".to_string(),
        )
    }

    fn current_code(secret: &str) -> String {
        let bytes = BASE32_NOPAD.decode(secret.as_bytes()).unwrap();
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        totp_custom::<Sha1>(30, 6, &bytes, now)
    }

    #[tokio::test]
    async fn test_login_success_returns_tokens_and_profile() {
        let mut repository = MockTestUserRepository::new();
        let mut audit_store = MockTestAuditStore::new();

        let user = test_user(PASSWORD);
        let user_id = user.id;

        repository
            .expect_find_by_username_or_email()
            .withf(|identifier| identifier == "alice")
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository
            .expect_record_login_success()
            .withf(move |id, _| *id == user_id)
            .times(1)
            .returning(|_, _| Ok(()));

        audit_store
            .expect_append_audit()
            .withf(|entry| entry.action == AuditAction::Login)
            .times(1)
            .returning(|_| Ok(()));
        audit_store.expect_append_security_event().times(0);

        let service = service(repository, audit_store);
        let session = service.login(login_command(None)).await.unwrap();

        assert!(!session.access_token.is_empty());
        assert!(!session.refresh_token.is_empty());
        assert_eq!(session.expires_in, 30 * 60);
        assert_eq!(session.profile.username, "alice");
        assert!(session.profile.last_login.is_some());
    }

    #[tokio::test]
    async fn test_login_unknown_user_collapses_to_invalid_credentials() {
        let mut repository = MockTestUserRepository::new();
        let mut audit_store = MockTestAuditStore::new();

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(|_| Ok(None));
        // No user row to increment
        repository.expect_record_login_failure().times(0);

        audit_store
            .expect_append_security_event()
            .withf(|event| {
                event.kind == SecurityEventKind::LoginFailed
                    && event.severity == Severity::Medium
                    && event.actor.is_none()
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = service(repository, audit_store);
        let result = service.login(login_command(None)).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_wrong_password_increments_failures() {
        let mut repository = MockTestUserRepository::new();
        let mut audit_store = MockTestAuditStore::new();

        let user = test_user("Different_Password1");
        let user_id = user.id;

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository
            .expect_record_login_failure()
            .withf(move |id, threshold, _| *id == user_id && *threshold == 5)
            .times(1)
            .returning(|_, _, _| {
                Ok(LockoutState {
                    failed_attempts: 1,
                    locked_until: None,
                })
            });

        audit_store
            .expect_append_security_event()
            .withf(move |event| {
                event.kind == SecurityEventKind::LoginFailed && event.actor == Some(user_id)
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = service(repository, audit_store);
        let result = service.login(login_command(None)).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_inactive_account_is_blocked_after_credentials() {
        let mut repository = MockTestUserRepository::new();
        let mut audit_store = MockTestAuditStore::new();

        let mut user = test_user(PASSWORD);
        user.is_active = false;

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository.expect_record_login_failure().times(0);

        audit_store
            .expect_append_security_event()
            .withf(|event| event.kind == SecurityEventKind::LoginBlocked)
            .times(1)
            .returning(|_| Ok(()));

        let service = service(repository, audit_store);
        let result = service.login(login_command(None)).await;

        assert!(matches!(result, Err(AuthError::AccountInactive)));
    }

    #[tokio::test]
    async fn test_login_locked_account_rejected_with_expiry() {
        let mut repository = MockTestUserRepository::new();
        let mut audit_store = MockTestAuditStore::new();

        let locked_until = Utc::now() + Duration::minutes(10);
        let mut user = test_user(PASSWORD);
        user.failed_login_attempts = 5;
        user.locked_until = Some(locked_until);

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        audit_store
            .expect_append_security_event()
            .withf(|event| event.kind == SecurityEventKind::LoginBlocked)
            .times(1)
            .returning(|_| Ok(()));

        let service = service(repository, audit_store);
        let result = service.login(login_command(None)).await;

        match result {
            Err(AuthError::AccountLocked { until }) => assert_eq!(until, locked_until),
            other => panic!("Expected AccountLocked, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_expired_lock_is_ignored() {
        let mut repository = MockTestUserRepository::new();
        let mut audit_store = MockTestAuditStore::new();

        let mut user = test_user(PASSWORD);
        user.failed_login_attempts = 5;
        user.locked_until = Some(Utc::now() - Duration::seconds(1));

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository
            .expect_record_login_success()
            .times(1)
            .returning(|_, _| Ok(()));

        audit_store
            .expect_append_audit()
            .times(1)
            .returning(|_| Ok(()));
        audit_store.expect_append_security_event().times(0);

        let service = service(repository, audit_store);
        assert!(service.login(login_command(None)).await.is_ok());
    }

    #[tokio::test]
    async fn test_login_missing_totp_code_is_validation_not_security_event() {
        let mut repository = MockTestUserRepository::new();
        let mut audit_store = MockTestAuditStore::new();

        let engine = TotpEngine::new("Test App");
        let mut user = test_user(PASSWORD);
        user.is_two_factor_enabled = true;
        user.totp_secret = Some(engine.generate_secret());

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        // No security event for an absent code
        audit_store.expect_append_security_event().times(0);

        let service = service(repository, audit_store);
        let result = service.login(login_command(None)).await;

        assert!(matches!(result, Err(AuthError::TotpCodeRequired)));
    }

    #[tokio::test]
    async fn test_login_wrong_totp_code_records_high_severity_event() {
        let mut repository = MockTestUserRepository::new();
        let mut audit_store = MockTestAuditStore::new();

        let engine = TotpEngine::new("Test App");
        let mut user = test_user(PASSWORD);
        user.is_two_factor_enabled = true;
        user.totp_secret = Some(engine.generate_secret());

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        audit_store
            .expect_append_security_event()
            .withf(|event| {
                event.kind == SecurityEventKind::TwoFactorFailed
                    && event.severity == Severity::High
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = service(repository, audit_store);
        let result = service.login(login_command(Some("000000"))).await;

        assert!(matches!(result, Err(AuthError::InvalidTotpCode)));
    }

    #[tokio::test]
    async fn test_login_with_valid_totp_code_succeeds() {
        let mut repository = MockTestUserRepository::new();
        let mut audit_store = MockTestAuditStore::new();

        let engine = TotpEngine::new("Test App");
        let secret = engine.generate_secret();
        let code = current_code(&secret);

        let mut user = test_user(PASSWORD);
        user.is_two_factor_enabled = true;
        user.totp_secret = Some(secret);

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository
            .expect_record_login_success()
            .times(1)
            .returning(|_, _| Ok(()));

        audit_store
            .expect_append_audit()
            .times(1)
            .returning(|_| Ok(()));
        audit_store.expect_append_security_event().times(0);

        let service = service(repository, audit_store);
        assert!(service.login(login_command(Some(&code))).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let repository = MockTestUserRepository::new();
        let audit_store = MockTestAuditStore::new();
        let service = service(repository, audit_store);

        let issuer = TokenIssuer::new(
            b"test-secret-key-for-jwt-signing-at-least-32-bytes",
            Duration::minutes(30),
            Duration::days(7),
        );
        let access = issuer
            .issue_access_token(&UserId::new().to_string(), None)
            .unwrap();

        let result = service.refresh(&access).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_rotates_token_pair() {
        let mut repository = MockTestUserRepository::new();
        let audit_store = MockTestAuditStore::new();

        let user = test_user(PASSWORD);
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let service = service(repository, audit_store);

        let issuer = TokenIssuer::new(
            b"test-secret-key-for-jwt-signing-at-least-32-bytes",
            Duration::minutes(30),
            Duration::days(7),
        );
        let refresh = issuer.issue_refresh_token(&user_id.to_string()).unwrap();

        let session = service.refresh(&refresh).await.unwrap();
        assert_eq!(session.profile.id, user_id.to_string());
        assert!(!session.access_token.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_inactive_account_rejected() {
        let mut repository = MockTestUserRepository::new();
        let audit_store = MockTestAuditStore::new();

        let mut user = test_user(PASSWORD);
        user.is_active = false;
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let service = service(repository, audit_store);

        let issuer = TokenIssuer::new(
            b"test-secret-key-for-jwt-signing-at-least-32-bytes",
            Duration::minutes(30),
            Duration::days(7),
        );
        let refresh = issuer.issue_refresh_token(&user_id.to_string()).unwrap();

        let result = service.refresh(&refresh).await;
        assert!(matches!(result, Err(AuthError::AccountInactive)));
    }

    #[tokio::test]
    async fn test_logout_records_audit_entry() {
        let repository = MockTestUserRepository::new();
        let mut audit_store = MockTestAuditStore::new();

        audit_store
            .expect_append_audit()
            .withf(|entry| entry.action == AuditAction::Logout)
            .times(1)
            .returning(|_| Ok(()));

        let service = service(repository, audit_store);
        assert!(service.logout(&UserId::new(), "203.0.113.9").await.is_ok());
    }

    #[tokio::test]
    async fn test_change_password_rejects_wrong_current() {
        let mut repository = MockTestUserRepository::new();
        let audit_store = MockTestAuditStore::new();

        let user = test_user(PASSWORD);
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository.expect_update_password_hash().times(0);

        let service = service(repository, audit_store);
        let result = service
            .change_password(&user_id, "Wrong_Password1", "New_Password1", "203.0.113.9")
            .await;

        assert!(matches!(result, Err(AuthError::PasswordMismatch)));
    }

    #[tokio::test]
    async fn test_change_password_rejects_weak_replacement() {
        let mut repository = MockTestUserRepository::new();
        let audit_store = MockTestAuditStore::new();

        let user = test_user(PASSWORD);
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository.expect_update_password_hash().times(0);

        let service = service(repository, audit_store);
        let result = service
            .change_password(&user_id, PASSWORD, "weak", "203.0.113.9")
            .await;

        match result {
            Err(AuthError::WeakPassword(violations)) => assert!(!violations.is_empty()),
            other => panic!("Expected WeakPassword, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_change_password_rehashes_and_audits() {
        let mut repository = MockTestUserRepository::new();
        let mut audit_store = MockTestAuditStore::new();

        let user = test_user(PASSWORD);
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository
            .expect_update_password_hash()
            .withf(move |id, hash, _| *id == user_id && hash.starts_with("$argon2"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        audit_store
            .expect_append_audit()
            .withf(|entry| entry.action == AuditAction::PasswordChange)
            .times(1)
            .returning(|_| Ok(()));

        let service = service(repository, audit_store);
        let result = service
            .change_password(&user_id, PASSWORD, "New_Password1", "203.0.113.9")
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_setup_two_factor_persists_only_the_secret() {
        let mut repository = MockTestUserRepository::new();
        let audit_store = MockTestAuditStore::new();

        let user = test_user(PASSWORD);
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository
            .expect_store_totp_secret()
            .withf(move |id, secret| *id == user_id && !secret.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));
        // The flag is not flipped during setup
        repository.expect_enable_two_factor().times(0);

        let service = service(repository, audit_store);
        let setup = service
            .setup_two_factor(&user_id, PASSWORD, "203.0.113.9")
            .await
            .unwrap();

        assert_eq!(setup.backup_codes.len(), 10);
        assert!(setup.backup_codes.iter().all(|code| code.len() == 8));
        assert!(setup.otpauth_uri.starts_with("otpauth://totp/"));
        assert!(setup.qr_code.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_verify_setup_without_pending_secret_is_distinct() {
        let mut repository = MockTestUserRepository::new();
        let audit_store = MockTestAuditStore::new();

        let user = test_user(PASSWORD);
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository.expect_enable_two_factor().times(0);

        let service = service(repository, audit_store);
        let result = service
            .verify_two_factor_setup(&user_id, "123456", "203.0.113.9")
            .await;

        assert!(matches!(result, Err(AuthError::TwoFactorNotInitiated)));
    }

    #[tokio::test]
    async fn test_verify_setup_enables_on_valid_code() {
        let mut repository = MockTestUserRepository::new();
        let mut audit_store = MockTestAuditStore::new();

        let engine = TotpEngine::new("Test App");
        let secret = engine.generate_secret();
        let code = current_code(&secret);

        let mut user = test_user(PASSWORD);
        user.totp_secret = Some(secret);
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository
            .expect_enable_two_factor()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(|_| Ok(()));

        audit_store
            .expect_append_audit()
            .withf(|entry| entry.action == AuditAction::TwoFactorEnabled)
            .times(1)
            .returning(|_| Ok(()));

        let service = service(repository, audit_store);
        let result = service
            .verify_two_factor_setup(&user_id, &code, "203.0.113.9")
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_disable_two_factor_clears_in_one_update() {
        let mut repository = MockTestUserRepository::new();
        let mut audit_store = MockTestAuditStore::new();

        let engine = TotpEngine::new("Test App");
        let secret = engine.generate_secret();
        let code = current_code(&secret);

        let mut user = test_user(PASSWORD);
        user.is_two_factor_enabled = true;
        user.totp_secret = Some(secret);
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository
            .expect_disable_two_factor()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(|_| Ok(()));

        audit_store
            .expect_append_audit()
            .withf(|entry| entry.action == AuditAction::TwoFactorDisabled)
            .times(1)
            .returning(|_| Ok(()));

        let service = service(repository, audit_store);
        let result = service
            .disable_two_factor(&user_id, PASSWORD, &code, "203.0.113.9")
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_disable_two_factor_without_secret_rejected() {
        let mut repository = MockTestUserRepository::new();
        let audit_store = MockTestAuditStore::new();

        let user = test_user(PASSWORD);
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository.expect_disable_two_factor().times(0);

        let service = service(repository, audit_store);
        let result = service
            .disable_two_factor(&user_id, PASSWORD, "123456", "203.0.113.9")
            .await;

        assert!(matches!(result, Err(AuthError::TwoFactorNotEnabled)));
    }
}
