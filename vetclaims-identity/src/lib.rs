//! Identity provider verification.
//!
//! Exchanges a bearer credential for an authoritative user id. The profile
//! service depends on `Arc<dyn IdentityProvider>`; production wires in
//! `SupabaseIdentityProvider`, deployments without an identity provider use
//! `DisabledIdentityProvider`.

mod error;
mod provider;
mod supabase;

pub use error::{IdentityError, IdentityResult};
pub use provider::{AuthenticatedUser, DisabledIdentityProvider, IdentityProvider, parse_bearer};
pub use supabase::{SupabaseConfig, SupabaseIdentityProvider};
