use auth::JwtError;
use auth::PasswordError;
use auth::PasswordPolicyViolation;
use auth::TotpError;
use chrono::DateTime;
use chrono::Utc;
use thiserror::Error;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for Username validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsernameError {
    #[error("Username too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("Username too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },

    #[error(
        "Username contains invalid characters (only alphanumeric, underscore, and hyphen allowed)"
    )]
    InvalidCharacters,
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

fn join_violations(violations: &[PasswordPolicyViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Top-level error for all authentication and account-security operations.
///
/// The variants split into validation failures (malformed or policy-breaking
/// input), authentication failures (wrong credentials or token, deliberately
/// vague), state rejections (inactive or locked accounts, revealed only after
/// the caller proved correct credentials), and infrastructure failures.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // Authentication errors. "No such user" and "wrong password" share one
    // variant so responses cannot be used for account enumeration.
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid TOTP code")]
    InvalidTotpCode,

    // State errors
    #[error("Account is inactive")]
    AccountInactive,

    #[error("Account is locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    // Validation errors
    #[error("TOTP code required for two-factor authentication")]
    TotpCodeRequired,

    #[error("Current password is incorrect")]
    PasswordMismatch,

    #[error("Password does not meet the policy: {}", join_violations(.0))]
    WeakPassword(Vec<PasswordPolicyViolation>),

    #[error("Two-factor setup has not been initiated")]
    TwoFactorNotInitiated,

    #[error("Two-factor authentication is not enabled")]
    TwoFactorNotEnabled,

    // Domain-level errors
    #[error("User not found: {0}")]
    NotFound(String),

    // Value object validation errors (automatically converted via #[from])
    #[error("Invalid user ID: {0}")]
    InvalidUserId(#[from] UserIdError),

    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Two-factor error: {0}")]
    Totp(#[from] TotpError),

    // Infrastructure errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::Unknown(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak_password_lists_every_violation() {
        let err = AuthError::WeakPassword(vec![
            PasswordPolicyViolation::MissingUppercase,
            PasswordPolicyViolation::MissingDigit,
        ]);

        let message = err.to_string();
        assert!(message.contains("uppercase"));
        assert!(message.contains("digit"));
    }

    #[test]
    fn test_locked_error_carries_expiry() {
        let until = Utc::now();
        let err = AuthError::AccountLocked { until };
        assert!(err.to_string().contains(&until.to_string()));
    }
}
