//! Request and response shapes for profile operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use vetclaims_types::{ProfileFields, ProfileId, VeteranProfile};

/// An inbound profile upsert.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProfileSubmission {
    #[serde(flatten)]
    pub fields: ProfileFields,
    /// Raw SSN in any of `123456789`, `123-45-6789` or `123 45 6789` forms.
    #[serde(default)]
    pub ssn: Option<String>,
}

impl ProfileSubmission {
    pub fn new(fields: ProfileFields) -> Self {
        Self { fields, ssn: None }
    }

    pub fn with_ssn(mut self, ssn: impl Into<String>) -> Self {
        self.ssn = Some(ssn.into());
        self
    }

    /// The SSN if one was actually supplied; an empty string counts as absent.
    pub fn supplied_ssn(&self) -> Option<&str> {
        self.ssn.as_deref().filter(|s| !s.is_empty())
    }
}

impl fmt::Debug for ProfileSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileSubmission")
            .field("email", &self.fields.email)
            .field("ssn", &self.ssn.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

/// A profile as returned to callers: the stored record with the SSN
/// decrypted (or `None` if absent or unreadable) and no ciphertext.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileView {
    pub id: ProfileId,
    #[serde(flatten)]
    pub fields: ProfileFields,
    /// `XXX-XX-XXXX`.
    pub ssn: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileView {
    pub(crate) fn from_profile(profile: VeteranProfile, ssn: Option<String>) -> Self {
        Self {
            id: profile.id,
            fields: profile.fields,
            ssn,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

impl fmt::Debug for ProfileView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileView")
            .field("id", &self.id)
            .field("email", &self.fields.email)
            .field("ssn", &self.ssn.as_ref().map(|_| "[REDACTED]"))
            .field("has_signed_up", &self.fields.has_signed_up)
            .field("has_paid", &self.fields.has_paid)
            .finish_non_exhaustive()
    }
}

/// Narrow update of the status flags. `None` leaves a flag unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub email: String,
    #[serde(default)]
    pub has_signed_up: Option<bool>,
    #[serde(default)]
    pub has_paid: Option<bool>,
}

/// Outcome of a stored-SSN re-encryption sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReencryptionReport {
    /// Moved onto the active key.
    pub reencrypted: usize,
    /// Already under the active key.
    pub current: usize,
    /// Rewritten concurrently; nothing to do.
    pub skipped: usize,
    /// Unreadable under every known key.
    pub failed: usize,
}
