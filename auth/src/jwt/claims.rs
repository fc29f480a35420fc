use std::fmt;

use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Kind discriminator embedded in every session token.
///
/// Signed alongside subject and expiry, so a refresh token cannot be
/// replayed where an access token is expected, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Get the wire representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by a session token.
///
/// Tokens are self-describing and never persisted; they invalidate
/// themselves at expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// Subject (user identifier)
    pub sub: String,

    /// Token kind discriminator
    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl SessionClaims {
    /// Create claims for a subject with an expiration relative to now.
    ///
    /// # Arguments
    /// * `subject` - User identifier stored in `sub`
    /// * `kind` - Access or refresh
    /// * `ttl` - Time until the token expires
    ///
    /// # Returns
    /// Claims with sub, kind, exp, and iat set
    pub fn new(subject: impl ToString, kind: TokenKind, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: subject.to_string(),
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Check if the token is expired at the given instant.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp < current_timestamp
    }
}
