//! Identity provider abstraction.

use crate::error::{IdentityError, IdentityResult};
use async_trait::async_trait;
use vetclaims_types::ProfileId;

/// A user whose credential the identity provider vouched for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Authoritative identity; becomes the profile's identity key.
    pub id: ProfileId,
    pub email: Option<String>,
}

/// Abstract identity provider interface.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the name of the identity provider.
    fn provider_name(&self) -> &'static str;

    /// Verifies a bearer credential and returns the user it belongs to.
    async fn verify(&self, token: &str) -> IdentityResult<AuthenticatedUser>;
}

/// Provider used when no identity service is configured. Every credential
/// fails verification, so all requests are handled as anonymous.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledIdentityProvider;

#[async_trait]
impl IdentityProvider for DisabledIdentityProvider {
    fn provider_name(&self) -> &'static str {
        "disabled"
    }

    async fn verify(&self, _token: &str) -> IdentityResult<AuthenticatedUser> {
        Err(IdentityError::NotConfigured)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
