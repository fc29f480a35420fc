//! Account-security utilities library
//!
//! Provides reusable security infrastructure for services:
//! - Password hashing (Argon2id), strength rules, and secret generation
//! - Signed session tokens (access/refresh) with configured lifetimes
//! - TOTP two-factor code generation and verification
//!
//! Each service defines its own domain ports and adapts these implementations.
//! This avoids coupling services through shared domain logic while reducing
//! code duplication.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Session Tokens
//! ```
//! use chrono::Duration;
//! use auth::TokenIssuer;
//! use auth::TokenKind;
//!
//! let issuer = TokenIssuer::new(
//!     b"secret_key_at_least_32_bytes_long!",
//!     Duration::minutes(30),
//!     Duration::days(7),
//! );
//! let token = issuer.issue_access_token("user123", None).unwrap();
//! let subject = issuer.verify(&token, TokenKind::Access).unwrap();
//! assert_eq!(subject, "user123");
//! ```
//!
//! ## Two-Factor Codes
//! ```
//! use auth::TotpEngine;
//!
//! let engine = TotpEngine::new("Example App");
//! let secret = engine.generate_secret();
//! let uri = engine.provisioning_uri("alice@example.com", &secret);
//! assert!(uri.starts_with("otpauth://totp/"));
//! ```

pub mod jwt;
pub mod password;
pub mod totp;

// Re-export commonly used items
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use jwt::SessionClaims;
pub use jwt::TokenIssuer;
pub use jwt::TokenKind;
pub use password::generate_random_secret;
pub use password::validate_strength;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use password::PasswordPolicyViolation;
pub use totp::TotpEngine;
pub use totp::TotpError;
