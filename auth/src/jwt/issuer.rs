use chrono::Duration;

use super::claims::SessionClaims;
use super::claims::TokenKind;
use super::errors::JwtError;
use super::handler::JwtHandler;

/// Issues and verifies signed session tokens.
///
/// Access and refresh tokens share one claim set and differ only in their
/// kind claim and lifetime. Verification collapses every rejection cause
/// (bad signature, wrong kind, missing subject, elapsed expiry) into one
/// error, so a caller cannot tell an expired token from a forged one.
pub struct TokenIssuer {
    handler: JwtHandler,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Create a new token issuer.
    ///
    /// # Arguments
    /// * `secret` - Secret key for HMAC signing
    /// * `access_ttl` - Default access token lifetime
    /// * `refresh_ttl` - Refresh token lifetime
    ///
    /// # Returns
    /// Configured TokenIssuer instance
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            handler: JwtHandler::new(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Default access token lifetime.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Issue an access token for a subject.
    ///
    /// # Arguments
    /// * `subject` - User identifier stored in the `sub` claim
    /// * `ttl_override` - Optional longer lifetime (remember-me logins)
    ///
    /// # Returns
    /// Signed token string
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue_access_token(
        &self,
        subject: &str,
        ttl_override: Option<Duration>,
    ) -> Result<String, JwtError> {
        let ttl = ttl_override.unwrap_or(self.access_ttl);
        let claims = SessionClaims::new(subject, TokenKind::Access, ttl);
        self.handler.encode(&claims)
    }

    /// Issue a refresh token for a subject.
    ///
    /// # Arguments
    /// * `subject` - User identifier stored in the `sub` claim
    ///
    /// # Returns
    /// Signed token string
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue_refresh_token(&self, subject: &str) -> Result<String, JwtError> {
        let claims = SessionClaims::new(subject, TokenKind::Refresh, self.refresh_ttl);
        self.handler.encode(&claims)
    }

    /// Verify a token and extract its subject.
    ///
    /// # Arguments
    /// * `token` - Signed token string
    /// * `expected_kind` - Kind the caller expects at this boundary
    ///
    /// # Returns
    /// The subject identifier from the `sub` claim
    ///
    /// # Errors
    /// * `InvalidToken` - Signature invalid, kind mismatch, or expiry passed
    pub fn verify(&self, token: &str, expected_kind: TokenKind) -> Result<String, JwtError> {
        let claims: SessionClaims = self
            .handler
            .decode(token)
            .map_err(|_| JwtError::InvalidToken)?;

        if claims.kind != expected_kind {
            return Err(JwtError::InvalidToken);
        }

        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes!";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, Duration::minutes(30), Duration::days(7))
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let issuer = issuer();

        let token = issuer
            .issue_access_token("user123", None)
            .expect("Failed to issue token");

        let subject = issuer
            .verify(&token, TokenKind::Access)
            .expect("Failed to verify token");
        assert_eq!(subject, "user123");
    }

    #[test]
    fn test_issue_and_verify_refresh_token() {
        let issuer = issuer();

        let token = issuer
            .issue_refresh_token("user123")
            .expect("Failed to issue token");

        let subject = issuer
            .verify(&token, TokenKind::Refresh)
            .expect("Failed to verify token");
        assert_eq!(subject, "user123");
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let issuer = issuer();

        let access = issuer.issue_access_token("user123", None).unwrap();
        let refresh = issuer.issue_refresh_token("user123").unwrap();

        assert!(matches!(
            issuer.verify(&access, TokenKind::Refresh),
            Err(JwtError::InvalidToken)
        ));
        assert!(matches!(
            issuer.verify(&refresh, TokenKind::Access),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = issuer();

        // Structurally valid signature over an expiry well in the past
        let handler = JwtHandler::new(SECRET);
        let claims = SessionClaims {
            sub: "user123".to_string(),
            kind: TokenKind::Access,
            exp: chrono::Utc::now().timestamp() - 3600,
            iat: chrono::Utc::now().timestamp() - 7200,
        };
        let token = handler.encode(&claims).unwrap();

        assert!(matches!(
            issuer.verify(&token, TokenKind::Access),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_ttl_override_extends_expiry() {
        let issuer = issuer();

        let token = issuer
            .issue_access_token("user123", Some(Duration::days(7)))
            .unwrap();

        let handler = JwtHandler::new(SECRET);
        let claims: SessionClaims = handler.decode(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = issuer();
        let other = TokenIssuer::new(
            b"another_secret_key_at_least_32_bytes!",
            Duration::minutes(30),
            Duration::days(7),
        );

        let token = issuer.issue_access_token("user123", None).unwrap();
        assert!(matches!(
            other.verify(&token, TokenKind::Access),
            Err(JwtError::InvalidToken)
        ));
    }
}
