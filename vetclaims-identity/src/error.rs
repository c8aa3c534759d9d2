//! Identity verification error types.

use thiserror::Error;

/// Result type for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Errors that can occur while verifying a bearer credential.
///
/// Callers on the profile path treat every variant as "no authoritative
/// identity"; the variants exist for logging.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider is not configured")]
    NotConfigured,

    #[error("identity provider unreachable: {0}")]
    Network(String),

    #[error("identity provider rejected credential (HTTP {status})")]
    Rejected { status: u16 },

    #[error("invalid identity provider response: {0}")]
    InvalidResponse(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
