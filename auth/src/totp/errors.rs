use thiserror::Error;

/// Error type for TOTP operations.
#[derive(Debug, Clone, Error)]
pub enum TotpError {
    #[error("Invalid TOTP secret encoding")]
    InvalidSecret,

    #[error("QR code generation failed: {0}")]
    QrEncodingFailed(String),
}
