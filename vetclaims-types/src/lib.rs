//! Core type definitions for the vetclaims backend.
//!
//! This crate defines the record types shared by every layer:
//! - Profile identifiers (UUID v7 when system-generated)
//! - The persisted `VeteranProfile` and its client-editable `ProfileFields`
//! - Free-form JSON mappings used for structured PHI sections
//!
//! Encryption, persistence and HTTP concerns live in their own crates.

mod ids;
mod profile;

pub use ids::ProfileId;
pub use profile::{JsonMap, ProfileFields, VeteranProfile, null_as_empty};
