//! The veteran profile record.
//!
//! `ProfileFields` is everything a client may submit (except the SSN, which
//! only ever reaches this layer as ciphertext). `VeteranProfile` is the
//! persisted record: fields plus identity key, encrypted SSN and timestamps.

use crate::ProfileId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Schema-less key/value mapping for structured PHI sections
/// (military service, claim info, address).
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Deserializes a mapping that may be missing or explicitly `null` as `{}`.
pub fn null_as_empty<'de, D>(deserializer: D) -> Result<JsonMap, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<JsonMap>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<bool>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Client-editable profile fields. Replaced wholesale on every upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileFields {
    pub email: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_initial: Option<String>,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Free-form date of birth, conventionally `MM/DD/YYYY`.
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub file_number: Option<String>,
    #[serde(default)]
    pub veterans_service_number: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub military_service: JsonMap,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub claim_info: JsonMap,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub address: JsonMap,
    #[serde(default)]
    pub claim_statement: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub has_signed_up: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub has_paid: bool,
}

impl ProfileFields {
    /// Minimal field set: email and legal name, everything else empty.
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            first_name: first_name.into(),
            middle_initial: None,
            last_name: last_name.into(),
            phone: None,
            date_of_birth: None,
            file_number: None,
            veterans_service_number: None,
            military_service: JsonMap::new(),
            claim_info: JsonMap::new(),
            address: JsonMap::new(),
            claim_statement: None,
            has_signed_up: false,
            has_paid: false,
        }
    }
}

/// A persisted veteran profile.
#[derive(Clone, PartialEq)]
pub struct VeteranProfile {
    /// Identity key. Re-keyed at most once, to the authenticated user's id.
    pub id: ProfileId,
    pub fields: ProfileFields,
    /// Opaque ciphertext produced by the PHI cipher. Never plaintext.
    pub ssn_encrypted: Option<Vec<u8>>,
    /// Set once the record has been re-keyed to an identity provider's user id.
    pub claimed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VeteranProfile {
    /// Creates a new record stamped with the current time.
    pub fn new(id: ProfileId, fields: ProfileFields, ssn_encrypted: Option<Vec<u8>>) -> Self {
        let now = Utc::now();
        Self {
            id,
            fields,
            ssn_encrypted,
            claimed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the profile's email (its unique lookup key).
    pub fn email(&self) -> &str {
        &self.fields.email
    }

    /// Returns true if an encrypted SSN is on file.
    pub fn has_ssn(&self) -> bool {
        self.ssn_encrypted.is_some()
    }

    /// Overwrites all client-editable fields and bumps `updated_at`.
    ///
    /// A `None` SSN leaves any stored ciphertext untouched.
    pub fn replace_fields(&mut self, fields: ProfileFields, ssn_encrypted: Option<Vec<u8>>) {
        self.fields = fields;
        if ssn_encrypted.is_some() {
            self.ssn_encrypted = ssn_encrypted;
        }
        self.touch();
    }

    /// Sets `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl fmt::Debug for VeteranProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VeteranProfile")
            .field("id", &self.id)
            .field("email", &self.fields.email)
            .field(
                "ssn_encrypted",
                &self.ssn_encrypted.as_ref().map(|_| "[REDACTED]"),
            )
            .field("claimed", &self.claimed)
            .field("has_signed_up", &self.fields.has_signed_up)
            .field("has_paid", &self.fields.has_paid)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}
