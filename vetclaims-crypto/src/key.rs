//! Key derivation and management.
//!
//! Uses PBKDF2-HMAC-SHA256 for deriving the PHI key from the deployment
//! secret.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of encryption keys in bytes (256 bits for ChaCha20).
pub const KEY_SIZE: usize = 32;

/// Size of salt in bytes.
pub const SALT_SIZE: usize = 16;

/// Size of a key fingerprint in bytes.
pub const FINGERPRINT_SIZE: usize = 4;

/// Fixed application salt. Changing it orphans every stored ciphertext.
const APPLICATION_SALT: [u8; SALT_SIZE] = *b"vets4claims_salt";

/// A derived encryption key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    /// Creates a new derived key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Short, non-reversible identifier used to tag ciphertexts with the key
    /// that produced them.
    pub fn fingerprint(&self) -> [u8; FINGERPRINT_SIZE] {
        let digest = Sha256::digest(self.bytes);
        let mut fp = [0u8; FINGERPRINT_SIZE];
        fp.copy_from_slice(&digest[..FINGERPRINT_SIZE]);
        fp
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Salt for key derivation.
#[derive(Clone, Debug)]
pub struct Salt {
    bytes: [u8; SALT_SIZE],
}

impl Salt {
    /// The salt every deployment of this service derives its key with.
    pub fn application() -> Self {
        Self {
            bytes: APPLICATION_SALT,
        }
    }

    /// Creates a salt from raw bytes.
    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.bytes
    }
}

impl Default for Salt {
    fn default() -> Self {
        Self::application()
    }
}

/// Key derivation parameters.
#[derive(Clone, Debug)]
pub struct KdfParams {
    /// PBKDF2 iteration count.
    pub iterations: u32,
    pub salt: Salt,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: 100_000,
            salt: Salt::application(),
        }
    }
}

/// Derives an encryption key from a secret using PBKDF2-HMAC-SHA256.
///
/// # Arguments
/// * `secret` - The operator-supplied deployment secret
/// * `params` - Iteration count and salt
///
/// # Returns
/// A derived key suitable for use with ChaCha20-Poly1305.
pub fn derive_key(secret: &str, params: &KdfParams) -> CryptoResult<DerivedKey> {
    if secret.is_empty() {
        return Err(CryptoError::MissingSecret);
    }
    if params.iterations == 0 {
        return Err(CryptoError::KeyDerivation(
            "iteration count must be non-zero".to_string(),
        ));
    }

    let mut key_bytes = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        secret.as_bytes(),
        params.salt.as_bytes(),
        params.iterations,
        &mut key_bytes,
    );

    let key = DerivedKey::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(key)
}

/// Generates a random encryption key (not secret-derived).
pub fn generate_random_key() -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    DerivedKey::from_bytes(bytes)
}
