use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::account::errors::AuthError;
use crate::account::models::LockoutState;
use crate::account::models::UserCredential;
use crate::account::models::UserId;
use crate::account::ports::UserCredentialRepository;

/// Brute-force lockout policy over a user's failure counter.
///
/// A fixed number of consecutive failed logins locks the account for a fixed
/// window. Locks expire lazily: nothing sweeps them, the next attempt after
/// `locked_until` is simply evaluated as unlocked again. The increment itself
/// happens in the repository as one atomic statement, so simultaneous wrong
/// passwords against the same account cannot under-count.
pub struct LockoutPolicy<R>
where
    R: UserCredentialRepository,
{
    repository: Arc<R>,
}

impl<R> LockoutPolicy<R>
where
    R: UserCredentialRepository,
{
    /// Consecutive failures that trigger a lock.
    pub const MAX_FAILED_ATTEMPTS: i32 = 5;

    /// How long a triggered lock lasts.
    pub const LOCK_DURATION_MINUTES: i64 = 30;

    /// Create a new lockout policy over a user repository.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    ///
    /// # Returns
    /// Configured policy instance
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Record one failed login attempt.
    ///
    /// Increments the counter atomically; reaching the threshold sets the
    /// lock expiry.
    ///
    /// # Arguments
    /// * `id` - User whose attempt failed
    ///
    /// # Returns
    /// Counter and lock state after the increment
    ///
    /// # Errors
    /// * `DatabaseError` - Persisting the counter failed
    pub async fn record_failure(&self, id: &UserId) -> Result<LockoutState, AuthError> {
        let lock_until = Utc::now() + Duration::minutes(Self::LOCK_DURATION_MINUTES);

        self.repository
            .record_login_failure(id, Self::MAX_FAILED_ATTEMPTS, lock_until)
            .await
    }

    /// Record a successful login.
    ///
    /// Resets the counter to zero, clears any lock, and stamps last-login.
    ///
    /// # Arguments
    /// * `id` - User who logged in
    /// * `at` - Login instant
    ///
    /// # Errors
    /// * `DatabaseError` - Persisting the reset failed
    pub async fn record_success(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), AuthError> {
        self.repository.record_login_success(id, at).await
    }

    /// Whether the account is locked at the given instant.
    ///
    /// # Arguments
    /// * `user` - Credential record to inspect
    /// * `now` - Evaluation instant
    ///
    /// # Returns
    /// True iff a lock expiry is set and still in the future
    pub fn is_locked(user: &UserCredential, now: DateTime<Utc>) -> bool {
        user.locked_until.map_or(false, |until| until > now)
    }
}
