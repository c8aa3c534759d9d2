//! Abstract PHI cipher interface.
//!
//! Consumers (the profile service) depend on `Arc<dyn PhiCipher>` and never
//! see raw keys. `EncryptionService` implements this trait; tests may plug in
//! their own implementation.

use crate::error::{CryptoError, CryptoResult};

/// Number of digits in a Social Security Number.
pub const SSN_DIGITS: usize = 9;

/// Trait for encrypting and decrypting sensitive strings.
///
/// Implementations own the key material and only need to provide the text
/// operations; SSN validation and formatting are shared.
pub trait PhiCipher: Send + Sync {
    /// Encrypt free-form text, returning an opaque ciphertext blob.
    fn encrypt_text(&self, text: &str) -> CryptoResult<Vec<u8>>;

    /// Decrypt a blob previously produced by `encrypt_text`.
    fn decrypt_text(&self, blob: &[u8]) -> CryptoResult<String>;

    /// Validate, canonicalize and encrypt an SSN.
    ///
    /// Hyphens and spaces are stripped; anything other than exactly nine
    /// ASCII digits is rejected with `InvalidFormat`.
    fn encrypt_ssn(&self, raw: &str) -> CryptoResult<Vec<u8>> {
        let digits = normalize_ssn(raw)?;
        self.encrypt_text(&digits)
    }

    /// Decrypt an SSN blob and format it as `XXX-XX-XXXX`.
    fn decrypt_ssn(&self, blob: &[u8]) -> CryptoResult<String> {
        let digits = self.decrypt_text(blob)?;
        if !is_ssn_digits(&digits) {
            return Err(CryptoError::DecryptionFailed(
                "decrypted value is not a 9-digit SSN".to_string(),
            ));
        }
        Ok(format_ssn(&digits))
    }

    /// Returns true if `blob` should be re-sealed under the current key.
    ///
    /// Implementations without key rotation never need it.
    fn needs_reencryption(&self, _blob: &[u8]) -> CryptoResult<bool> {
        Ok(false)
    }

    /// Re-seals `blob` under the current key.
    fn reencrypt(&self, blob: &[u8]) -> CryptoResult<Vec<u8>> {
        let text = self.decrypt_text(blob)?;
        self.encrypt_text(&text)
    }
}

fn is_ssn_digits(s: &str) -> bool {
    s.len() == SSN_DIGITS && s.bytes().all(|b| b.is_ascii_digit())
}

/// Strips separators from an SSN and checks it is exactly nine digits.
pub fn normalize_ssn(raw: &str) -> CryptoResult<String> {
    let digits: String = raw.chars().filter(|c| *c != '-' && *c != ' ').collect();
    if !is_ssn_digits(&digits) {
        return Err(CryptoError::InvalidFormat(
            "SSN must be exactly 9 digits".to_string(),
        ));
    }
    Ok(digits)
}

/// Formats nine digits as `XXX-XX-XXXX`. Callers must pass validated digits.
pub fn format_ssn(digits: &str) -> String {
    format!("{}-{}-{}", &digits[..3], &digits[3..5], &digits[5..])
}
