//! The profile reconciliation service.

use crate::error::{ProfileError, ProfileResult};
use crate::model::{ProfileSubmission, ProfileView, ReencryptionReport, StatusUpdate};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vetclaims_crypto::PhiCipher;
use vetclaims_identity::{AuthenticatedUser, IdentityProvider};
use vetclaims_storage::ProfileStore;
use vetclaims_types::{ProfileId, VeteranProfile};

/// Orchestrates profile upserts, lookups and status updates.
///
/// All collaborators are injected and live for the whole process.
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    cipher: Arc<dyn PhiCipher>,
    identity: Arc<dyn IdentityProvider>,
}

impl ProfileService {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        cipher: Arc<dyn PhiCipher>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            cipher,
            identity,
        }
    }

    /// Exchanges a bearer token for an authoritative identity.
    ///
    /// Never fails: an absent token or any verification error yields `None`.
    pub async fn resolve_identity(&self, bearer: Option<&str>) -> Option<AuthenticatedUser> {
        let token = bearer?;
        match self.identity.verify(token).await {
            Ok(user) => {
                info!("Authenticated user {}", user.id);
                Some(user)
            }
            Err(e) => {
                warn!(
                    "Could not verify auth token with {}: {}",
                    self.identity.provider_name(),
                    e
                );
                None
            }
        }
    }

    /// Creates or updates the profile for `submission.fields.email`.
    ///
    /// See the crate docs for the reconciliation rules.
    pub async fn upsert(
        &self,
        submission: ProfileSubmission,
        bearer: Option<&str>,
    ) -> ProfileResult<ProfileView> {
        validate_email(&submission.fields.email)?;
        let user = self.resolve_identity(bearer).await;
        let auth_id = user.as_ref().map(|u| u.id);

        let existing = self.find_existing(auth_id.as_ref(), &submission.fields.email)?;

        let ssn_encrypted = submission
            .supplied_ssn()
            .map(|raw| self.cipher.encrypt_ssn(raw))
            .transpose()?;
        let fields = submission.fields;

        let stored = match existing {
            Some(mut profile) => {
                let current_id = profile.id;
                let ssn_encrypted = match ssn_encrypted {
                    Some(blob) => Some(blob),
                    None => self.refresh_ssn(&profile),
                };
                profile.replace_fields(fields, ssn_encrypted);

                if let Some(auth_id) = auth_id.filter(|id| *id != current_id) {
                    info!("Re-keying profile {} to authenticated user {}", current_id, auth_id);
                    profile.id = auth_id;
                    profile.claimed = true;
                }
                // A claimed record stays signed up whatever the submission says.
                if profile.claimed {
                    profile.fields.has_signed_up = true;
                }

                self.store.update(&current_id, &profile)?;
                info!("Updated veteran profile {}", profile.id);
                profile
            }
            None => {
                let id = auth_id.unwrap_or_else(ProfileId::new);
                let profile = VeteranProfile::new(id, fields, ssn_encrypted);
                self.store.insert(&profile)?;
                info!(
                    "Created veteran profile {} ({})",
                    profile.id,
                    if auth_id.is_some() { "authenticated" } else { "anonymous" }
                );
                profile
            }
        };

        Ok(self.to_view(stored))
    }

    /// Fetches a profile by email with the SSN decrypted.
    pub fn get_by_email(&self, email: &str) -> ProfileResult<ProfileView> {
        let profile = self
            .store
            .find_by_email(email)?
            .ok_or(ProfileError::NotFound)?;
        Ok(self.to_view(profile))
    }

    /// Sets whichever of `has_signed_up` / `has_paid` the update carries.
    ///
    /// Only the flag columns are written, so a concurrent upsert is never
    /// rolled back by a status change.
    pub fn update_status(&self, update: &StatusUpdate) -> ProfileResult<ProfileView> {
        self.set_flags(&update.email, update.has_signed_up, update.has_paid)
    }

    /// Sets `has_paid` only; `has_signed_up` in the update is ignored.
    pub fn update_payment_status(&self, update: &StatusUpdate) -> ProfileResult<ProfileView> {
        self.set_flags(&update.email, None, update.has_paid)
    }

    /// Moves every stored SSN still sealed under a retired key onto the
    /// active key.
    ///
    /// Each record is swapped only if its ciphertext is unchanged since it
    /// was read; a record rewritten in the meantime is left to the writer.
    pub fn reencrypt_stored_ssns(&self) -> ProfileResult<ReencryptionReport> {
        let mut report = ReencryptionReport::default();
        for profile in self.store.find_with_ssn()? {
            let Some(blob) = profile.ssn_encrypted.as_deref() else {
                continue;
            };
            match self.cipher.needs_reencryption(blob) {
                Ok(false) => report.current += 1,
                Ok(true) => match self.cipher.reencrypt(blob) {
                    Ok(fresh) => {
                        if self.store.replace_ssn(&profile.id, blob, &fresh)? {
                            report.reencrypted += 1;
                        } else {
                            debug!("Profile {} changed during re-encryption", profile.id);
                            report.skipped += 1;
                        }
                    }
                    Err(e) => {
                        error!("Could not re-encrypt SSN for profile {}: {}", profile.id, e);
                        report.failed += 1;
                    }
                },
                Err(e) => {
                    error!("Unreadable SSN envelope for profile {}: {}", profile.id, e);
                    report.failed += 1;
                }
            }
        }
        info!(
            "SSN re-encryption: {} re-encrypted, {} current, {} skipped, {} failed",
            report.reencrypted, report.current, report.skipped, report.failed
        );
        Ok(report)
    }

    fn set_flags(
        &self,
        email: &str,
        has_signed_up: Option<bool>,
        has_paid: Option<bool>,
    ) -> ProfileResult<ProfileView> {
        self.store.update_flags(email, has_signed_up, has_paid)?;
        info!(
            "Updated status flags (has_signed_up={:?}, has_paid={:?}) for {}",
            has_signed_up, has_paid, email
        );
        let profile = self
            .store
            .find_by_email(email)?
            .ok_or(ProfileError::NotFound)?;
        Ok(ProfileView::from_profile(profile, None))
    }

    /// A fresh ciphertext for a carried-over SSN sealed under a retired key.
    ///
    /// `None` keeps the stored blob; a blob that cannot be re-sealed is left
    /// for the read path to report.
    fn refresh_ssn(&self, profile: &VeteranProfile) -> Option<Vec<u8>> {
        let blob = profile.ssn_encrypted.as_deref()?;
        if !self.cipher.needs_reencryption(blob).unwrap_or(false) {
            return None;
        }
        match self.cipher.reencrypt(blob) {
            Ok(fresh) => {
                debug!("Re-encrypted SSN for profile {} under the active key", profile.id);
                Some(fresh)
            }
            Err(e) => {
                warn!("Could not re-encrypt SSN for profile {}: {}", profile.id, e);
                None
            }
        }
    }

    fn find_existing(
        &self,
        auth_id: Option<&ProfileId>,
        email: &str,
    ) -> ProfileResult<Option<VeteranProfile>> {
        if let Some(id) = auth_id {
            if let Some(profile) = self.store.find_by_id(id)? {
                debug!("Matched profile by authenticated id");
                return Ok(Some(profile));
            }
        }
        Ok(self.store.find_by_email(email)?)
    }

    fn to_view(&self, profile: VeteranProfile) -> ProfileView {
        let ssn = profile
            .ssn_encrypted
            .as_deref()
            .and_then(|blob| match self.cipher.decrypt_ssn(blob) {
                Ok(ssn) => Some(ssn),
                Err(e) => {
                    error!("Error decrypting SSN for profile {}: {}", profile.id, e);
                    None
                }
            });
        ProfileView::from_profile(profile, ssn)
    }
}

fn validate_email(email: &str) -> ProfileResult<()> {
    let trimmed = email.trim();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    };
    if !valid || trimmed.len() != email.len() {
        return Err(ProfileError::Validation {
            field: "email",
            message: "must be a valid email address".to_string(),
        });
    }
    Ok(())
}
