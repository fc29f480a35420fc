use thiserror::Error;

/// Minimum accepted password length.
const MIN_LENGTH: usize = 8;

/// A single violated password rule.
///
/// Validation reports every violated rule, not only the first, so a caller
/// can surface the full list to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordPolicyViolation {
    #[error("Password too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one digit")]
    MissingDigit,
}

/// Validate a candidate password against the account password rules.
///
/// # Arguments
/// * `password` - Candidate plaintext password
///
/// # Returns
/// Unit when the password satisfies every rule
///
/// # Errors
/// Vector with one entry per violated rule
pub fn validate_strength(password: &str) -> Result<(), Vec<PasswordPolicyViolation>> {
    let mut violations = Vec::new();

    let length = password.chars().count();
    if length < MIN_LENGTH {
        violations.push(PasswordPolicyViolation::TooShort {
            min: MIN_LENGTH,
            actual: length,
        });
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        violations.push(PasswordPolicyViolation::MissingUppercase);
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        violations.push(PasswordPolicyViolation::MissingLowercase);
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push(PasswordPolicyViolation::MissingDigit);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
