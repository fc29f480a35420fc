use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::account::errors::AuthError;
use crate::account::models::LockoutState;
use crate::account::models::LoginCommand;
use crate::account::models::SessionTokens;
use crate::account::models::TwoFactorSetup;
use crate::account::models::UserCredential;
use crate::account::models::UserId;

/// Port for authentication and account-security operations.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Authenticate a user and issue session tokens.
    ///
    /// # Arguments
    /// * `command` - Login attempt with identifier, password, and options
    ///
    /// # Returns
    /// Access and refresh tokens plus the public profile
    ///
    /// # Errors
    /// * `InvalidCredentials` - No such user, or wrong password
    /// * `AccountInactive` - Credentials correct but account deactivated
    /// * `AccountLocked` - Too many failures; expiry included
    /// * `TotpCodeRequired` - Two-factor enabled, no code supplied
    /// * `InvalidTotpCode` - Two-factor enabled, wrong code
    /// * `DatabaseError` - Store operation failed
    async fn login(&self, command: LoginCommand) -> Result<SessionTokens, AuthError>;

    /// Exchange a refresh token for a fresh token pair.
    ///
    /// # Arguments
    /// * `refresh_token` - Token of kind refresh
    ///
    /// # Returns
    /// New access and refresh tokens plus the public profile
    ///
    /// # Errors
    /// * `InvalidToken` - Signature, kind, or expiry rejected, or subject gone
    /// * `AccountInactive` - Subject exists but is deactivated
    /// * `DatabaseError` - Store operation failed
    async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, AuthError>;

    /// Record a logout for an authenticated user.
    ///
    /// Tokens are stateless and stay valid until their own expiry; this
    /// appends the audit record and nothing else.
    ///
    /// # Arguments
    /// * `user_id` - Authenticated caller
    /// * `origin` - Network address of the request
    async fn logout(&self, user_id: &UserId, origin: &str) -> Result<(), AuthError>;

    /// Change the password of an authenticated user.
    ///
    /// # Arguments
    /// * `user_id` - Authenticated caller
    /// * `current_password` - Must match the stored hash
    /// * `new_password` - Must satisfy the password rules
    /// * `origin` - Network address of the request
    ///
    /// # Errors
    /// * `NotFound` - Subject no longer exists
    /// * `PasswordMismatch` - Current password wrong
    /// * `WeakPassword` - New password violates the rules
    /// * `DatabaseError` - Store operation failed
    async fn change_password(
        &self,
        user_id: &UserId,
        current_password: &str,
        new_password: &str,
        origin: &str,
    ) -> Result<(), AuthError>;

    /// Begin two-factor enrollment for an authenticated user.
    ///
    /// Persists only the fresh secret; the enabled flag stays off until the
    /// first code is verified.
    ///
    /// # Arguments
    /// * `user_id` - Authenticated caller
    /// * `password` - Re-authentication before changing security settings
    /// * `origin` - Network address of the request
    ///
    /// # Returns
    /// Secret, provisioning payload, and single-use backup codes
    ///
    /// # Errors
    /// * `NotFound` - Subject no longer exists
    /// * `PasswordMismatch` - Password wrong
    /// * `DatabaseError` - Store operation failed
    async fn setup_two_factor(
        &self,
        user_id: &UserId,
        password: &str,
        origin: &str,
    ) -> Result<TwoFactorSetup, AuthError>;

    /// Verify the first code and enable two-factor authentication.
    ///
    /// # Arguments
    /// * `user_id` - Authenticated caller
    /// * `totp_code` - Code from the authenticator app
    /// * `origin` - Network address of the request
    ///
    /// # Errors
    /// * `NotFound` - Subject no longer exists
    /// * `TwoFactorNotInitiated` - No pending secret to verify against
    /// * `InvalidTotpCode` - Wrong code
    /// * `DatabaseError` - Store operation failed
    async fn verify_two_factor_setup(
        &self,
        user_id: &UserId,
        totp_code: &str,
        origin: &str,
    ) -> Result<(), AuthError>;

    /// Disable two-factor authentication.
    ///
    /// Requires both the current password and a valid code; clears the
    /// enabled flag, the secret, and any backup codes in one update.
    ///
    /// # Arguments
    /// * `user_id` - Authenticated caller
    /// * `password` - Current password
    /// * `totp_code` - Code from the authenticator app
    /// * `origin` - Network address of the request
    ///
    /// # Errors
    /// * `NotFound` - Subject no longer exists
    /// * `PasswordMismatch` - Password wrong
    /// * `TwoFactorNotEnabled` - No secret configured
    /// * `InvalidTotpCode` - Wrong code
    /// * `DatabaseError` - Store operation failed
    async fn disable_two_factor(
        &self,
        user_id: &UserId,
        password: &str,
        totp_code: &str,
        origin: &str,
    ) -> Result<(), AuthError>;
}

/// Persistence operations for the credential subset of the user aggregate.
#[async_trait]
pub trait UserCredentialRepository: Send + Sync + 'static {
    /// Retrieve a user by username or email, exact match on either field.
    ///
    /// # Arguments
    /// * `identifier` - Username or email address
    ///
    /// # Returns
    /// Optional credential record (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<UserCredential>, AuthError>;

    /// Retrieve a user by identifier.
    ///
    /// # Arguments
    /// * `id` - User ID
    ///
    /// # Returns
    /// Optional credential record (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserCredential>, AuthError>;

    /// Atomically record one failed login attempt.
    ///
    /// Must increment the counter in a single statement with respect to
    /// concurrent attempts on the same row, setting the lock expiry when the
    /// incremented counter reaches the threshold.
    ///
    /// # Arguments
    /// * `id` - User whose attempt failed
    /// * `lock_threshold` - Counter value that triggers a lock
    /// * `lock_until` - Lock expiry to set when the threshold is reached
    ///
    /// # Returns
    /// Counter and lock state after the increment
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn record_login_failure(
        &self,
        id: &UserId,
        lock_threshold: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<LockoutState, AuthError>;

    /// Record a successful login: zero the counter, clear the lock, stamp
    /// last-login.
    ///
    /// # Arguments
    /// * `id` - User who logged in
    /// * `at` - Login instant
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn record_login_success(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), AuthError>;

    /// Replace the stored password hash.
    ///
    /// # Arguments
    /// * `id` - User to update
    /// * `password_hash` - New PHC-format hash
    /// * `changed_at` - Change instant
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn update_password_hash(
        &self,
        id: &UserId,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Store a pending TOTP secret without enabling two-factor.
    ///
    /// # Arguments
    /// * `id` - User enrolling
    /// * `secret` - Base32-encoded secret
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn store_totp_secret(&self, id: &UserId, secret: &str) -> Result<(), AuthError>;

    /// Flip the two-factor flag on after the pending secret verified.
    ///
    /// # Arguments
    /// * `id` - User completing enrollment
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn enable_two_factor(&self, id: &UserId) -> Result<(), AuthError>;

    /// Clear the two-factor flag, the secret, and any backup codes in one
    /// update, leaving no intermediate state.
    ///
    /// # Arguments
    /// * `id` - User disabling two-factor
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn disable_two_factor(&self, id: &UserId) -> Result<(), AuthError>;
}
