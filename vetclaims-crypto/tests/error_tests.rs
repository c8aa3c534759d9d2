use vetclaims_crypto::CryptoError;

#[test]
fn error_display_missing_secret() {
    let err = CryptoError::MissingSecret;
    assert!(format!("{err}").contains("not configured"));
}

#[test]
fn error_display_key_derivation() {
    let err = CryptoError::KeyDerivation("bad params".into());
    assert!(format!("{err}").contains("key derivation failed"));
    assert!(format!("{err}").contains("bad params"));
}

#[test]
fn error_display_invalid_format() {
    let err = CryptoError::InvalidFormat("SSN must be exactly 9 digits".into());
    let msg = format!("{err}");
    assert!(msg.contains("invalid format"));
    assert!(msg.contains("SSN"));
}

#[test]
fn error_display_encryption() {
    let err = CryptoError::Encryption("oops".into());
    assert!(format!("{err}").contains("encryption failed"));
}

#[test]
fn error_display_decryption() {
    let err = CryptoError::DecryptionFailed("tampered".into());
    assert!(format!("{err}").contains("decryption failed"));
}

#[test]
fn error_debug() {
    let err = CryptoError::MissingSecret;
    assert!(format!("{err:?}").contains("MissingSecret"));
}
