//! Veteran profile reconciliation.
//!
//! `ProfileService` merges inbound profile submissions into the store,
//! unifying records created before sign-in with the authenticated account
//! that later claims them. The SSN passes through the injected `PhiCipher`
//! on the way in and out and is never persisted or logged in plaintext.
//!
//! ## Upsert
//!
//! 1. Resolve the bearer credential (if any) to an authoritative user id.
//!    Verification failures degrade to anonymous.
//! 2. Find the existing record: by user id then email, or by email only.
//! 3. Encrypt the SSN if supplied; a malformed SSN aborts before any write.
//! 4. Update (re-keying to the user id when it differs) or create. A
//!    carried-over SSN sealed under a retired key is re-sealed on the way.
//! 5. Echo the stored record back with the SSN decrypted when possible.

mod error;
mod model;
mod service;

pub use error::{ProfileError, ProfileResult};
pub use model::{ProfileSubmission, ProfileView, ReencryptionReport, StatusUpdate};
pub use service::ProfileService;
