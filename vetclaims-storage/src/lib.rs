//! SQLite storage layer for veteran profiles.
//!
//! # Architecture
//!
//! - One table, `veteran_profiles`, keyed by profile id with a UNIQUE email
//! - The SSN is stored as an opaque ciphertext BLOB and never inspected here
//! - Structured sections are stored as JSON text
//! - Every write runs in its own transaction; concurrent creations for the
//!   same email are arbitrated by the UNIQUE constraint and surface as
//!   `StorageError::Conflict`

mod error;
mod profile_store;

pub use error::{StorageError, StorageResult};
pub use profile_store::{ProfileStore, SqliteProfileStore};
