//! PHI encryption layer for the vetclaims backend.
//!
//! - `key`: PBKDF2-HMAC-SHA256 key derivation from the deployment secret
//! - `cipher`: ChaCha20-Poly1305 with a versioned, fingerprinted envelope
//! - `encryptor`: the `PhiCipher` trait plus SSN validation and formatting
//! - `service`: `EncryptionService`, the process-wide implementation with
//!   support for retired keys
//!
//! Plaintext never leaves this crate except as the return value of a
//! decryption call.

mod cipher;
mod encryptor;
mod error;
mod key;
mod service;

pub use cipher::{
    ENVELOPE_VERSION, EncryptedData, HEADER_SIZE, NONCE_SIZE, TAG_SIZE, decrypt, encrypt,
};
pub use encryptor::{PhiCipher, SSN_DIGITS, format_ssn, normalize_ssn};
pub use error::{CryptoError, CryptoResult};
pub use key::{DerivedKey, FINGERPRINT_SIZE, KEY_SIZE, KdfParams, SALT_SIZE, Salt, derive_key, generate_random_key};
pub use service::EncryptionService;
