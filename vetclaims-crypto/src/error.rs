//! Error types for the encryption layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No deployment secret was configured.
    #[error("encryption secret is not configured")]
    MissingSecret,

    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Input failed format validation before encryption.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (malformed envelope, unknown key, or tampered data).
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
}
