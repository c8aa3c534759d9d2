//! Error types for profile operations.

use thiserror::Error;
use vetclaims_crypto::CryptoError;
use vetclaims_storage::StorageError;

/// Result type for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Errors surfaced by the profile service.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// A submitted field failed validation. Nothing was written.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// A uniqueness constraint rejected the write. Nothing was written.
    #[error("{0}")]
    Conflict(String),

    /// No profile matches the lookup.
    #[error("veteran profile not found")]
    NotFound,

    /// Storage failure; the write was rolled back.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Encryption failure other than input validation.
    #[error("encryption error: {0}")]
    Crypto(CryptoError),
}

impl ProfileError {
    /// Returns true for errors caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProfileError::Validation { .. } | ProfileError::Conflict(_) | ProfileError::NotFound
        )
    }
}

impl From<StorageError> for ProfileError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(msg) => ProfileError::Conflict(msg),
            StorageError::NotFound(_) => ProfileError::NotFound,
            other => ProfileError::Storage(other),
        }
    }
}

impl From<CryptoError> for ProfileError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidFormat(message) => ProfileError::Validation {
                field: "ssn",
                message,
            },
            other => ProfileError::Crypto(other),
        }
    }
}
