//! The process-wide PHI encryption service.
//!
//! Holds one active key, derived once at start-up from the deployment
//! secret, plus any number of retired keys derived from previous secrets.
//! New ciphertexts always use the active key; decryption picks the key whose
//! fingerprint the envelope carries.

use crate::cipher::{self, EncryptedData};
use crate::encryptor::PhiCipher;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, FINGERPRINT_SIZE, KdfParams, derive_key};

pub struct EncryptionService {
    active: DerivedKey,
    retired: Vec<DerivedKey>,
}

impl EncryptionService {
    /// Derives the active key from `secret`.
    ///
    /// Fails with `MissingSecret` when the secret is empty.
    pub fn from_secret(secret: &str, params: &KdfParams) -> CryptoResult<Self> {
        Ok(Self::from_key(derive_key(secret, params)?))
    }

    /// Wraps an already-derived key.
    pub fn from_key(active: DerivedKey) -> Self {
        Self {
            active,
            retired: Vec::new(),
        }
    }

    /// Registers a previous secret so ciphertexts produced under it stay
    /// readable. A secret that derives the active key is ignored.
    pub fn with_retired_secret(mut self, secret: &str, params: &KdfParams) -> CryptoResult<Self> {
        let key = derive_key(secret, params)?;
        if key.fingerprint() != self.active.fingerprint()
            && !self.retired.iter().any(|k| k.fingerprint() == key.fingerprint())
        {
            self.retired.push(key);
        }
        Ok(self)
    }

    /// Fingerprint of the key new ciphertexts are written under.
    pub fn active_fingerprint(&self) -> [u8; FINGERPRINT_SIZE] {
        self.active.fingerprint()
    }

    /// Number of retired keys still accepted for decryption.
    pub fn retired_key_count(&self) -> usize {
        self.retired.len()
    }

    fn key_for(&self, fingerprint: &[u8; FINGERPRINT_SIZE]) -> Option<&DerivedKey> {
        std::iter::once(&self.active)
            .chain(self.retired.iter())
            .find(|k| &k.fingerprint() == fingerprint)
    }

    fn open(&self, blob: &[u8]) -> CryptoResult<Vec<u8>> {
        let envelope = EncryptedData::from_bytes(blob)?;
        let key = self.key_for(&envelope.key_fingerprint).ok_or_else(|| {
            CryptoError::DecryptionFailed("ciphertext was produced under an unknown key".to_string())
        })?;
        cipher::decrypt(key, &envelope)
    }
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("active", &self.active)
            .field("retired_keys", &self.retired.len())
            .finish()
    }
}

impl PhiCipher for EncryptionService {
    fn encrypt_text(&self, text: &str) -> CryptoResult<Vec<u8>> {
        Ok(cipher::encrypt(&self.active, text.as_bytes())?.to_bytes())
    }

    fn decrypt_text(&self, blob: &[u8]) -> CryptoResult<String> {
        let plaintext = self.open(blob)?;
        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid UTF-8: {e}")))
    }

    /// True if `blob` carries a retired key's fingerprint.
    fn needs_reencryption(&self, blob: &[u8]) -> CryptoResult<bool> {
        let envelope = EncryptedData::from_bytes(blob)?;
        Ok(envelope.key_fingerprint != self.active.fingerprint())
    }

    /// Opens `blob` under whichever known key produced it, without a UTF-8
    /// round trip, and seals it under the active key.
    fn reencrypt(&self, blob: &[u8]) -> CryptoResult<Vec<u8>> {
        let plaintext = self.open(blob)?;
        Ok(cipher::encrypt(&self.active, &plaintext)?.to_bytes())
    }
}
