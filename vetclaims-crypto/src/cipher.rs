//! Field encryption using ChaCha20-Poly1305.
//!
//! Provides authenticated encryption with associated data (AEAD). Every
//! ciphertext is wrapped in a small envelope:
//!
//! ```text
//! version (1) || key fingerprint (4) || nonce (12) || ciphertext + tag
//! ```
//!
//! The version byte and fingerprint are authenticated as associated data, so
//! flipping any byte of the envelope fails decryption.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, FINGERPRINT_SIZE};
use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use rand::RngCore;

/// Size of nonce in bytes (96 bits for ChaCha20-Poly1305).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Size of the authenticated envelope header (version + fingerprint).
pub const HEADER_SIZE: usize = 1 + FINGERPRINT_SIZE;

/// Encrypted data with metadata needed for decryption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedData {
    /// Envelope format version.
    pub version: u8,
    /// Fingerprint of the key that produced this ciphertext.
    pub key_fingerprint: [u8; FINGERPRINT_SIZE],
    /// The nonce used for encryption (unique per encryption).
    pub nonce: [u8; NONCE_SIZE],
    /// The encrypted ciphertext (includes auth tag).
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Returns the total size of the encoded envelope.
    pub fn len(&self) -> usize {
        HEADER_SIZE + NONCE_SIZE + self.ciphertext.len()
    }

    /// Returns true if the ciphertext is empty.
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }

    fn header(&self) -> [u8; HEADER_SIZE] {
        let mut header = [0u8; HEADER_SIZE];
        header[0] = self.version;
        header[1..].copy_from_slice(&self.key_fingerprint);
        header
    }

    /// Encodes the envelope to bytes for storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len());
        bytes.extend_from_slice(&self.header());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Decodes an envelope from bytes.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() < HEADER_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::DecryptionFailed("data too short".to_string()));
        }

        let version = bytes[0];
        if version != ENVELOPE_VERSION {
            return Err(CryptoError::DecryptionFailed(format!(
                "unsupported envelope version {version}"
            )));
        }

        let mut key_fingerprint = [0u8; FINGERPRINT_SIZE];
        key_fingerprint.copy_from_slice(&bytes[1..HEADER_SIZE]);

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[HEADER_SIZE..HEADER_SIZE + NONCE_SIZE]);
        let ciphertext = bytes[HEADER_SIZE + NONCE_SIZE..].to_vec();

        Ok(Self {
            version,
            key_fingerprint,
            nonce,
            ciphertext,
        })
    }
}

/// Encrypts plaintext using ChaCha20-Poly1305.
///
/// # Arguments
/// * `key` - The encryption key
/// * `plaintext` - Data to encrypt
///
/// # Returns
/// Encrypted data tagged with the key's fingerprint.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    // Generate random nonce
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let mut envelope = EncryptedData {
        version: ENVELOPE_VERSION,
        key_fingerprint: key.fingerprint(),
        nonce: nonce_bytes,
        ciphertext: Vec::new(),
    };
    let aad = envelope.header();

    envelope.ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(envelope)
}

/// Decrypts ciphertext using ChaCha20-Poly1305.
///
/// # Arguments
/// * `key` - The encryption key (must be the same key used for encryption)
/// * `encrypted` - The encrypted data
///
/// # Returns
/// The decrypted plaintext, or an error if decryption fails.
pub fn decrypt(key: &DerivedKey, encrypted: &EncryptedData) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(&encrypted.nonce);
    let aad = encrypted.header();

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: encrypted.ciphertext.as_ref(),
                aad: &aad,
            },
        )
        .map_err(|_| {
            CryptoError::DecryptionFailed(
                "authentication failed (wrong key or tampered data)".to_string(),
            )
        })
}
