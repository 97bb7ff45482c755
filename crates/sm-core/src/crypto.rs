//! Field encryption for violation details at rest.
//!
//! Violation detail text names patients, nurses and submitted values, so it is
//! sealed with AES-256-GCM before it reaches the database and opened again on
//! every read.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;

/// Placeholder shown in place of a detail that could not be decrypted.
pub const DECRYPTION_ERROR_PLACEHOLDER: &str = "Decryption error";

/// Environment variable holding the base64-encoded 32-byte key.
pub const ENCRYPTION_KEY_ENV: &str = "SM_ENCRYPTION_KEY";

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The encryption key is invalid (wrong size or format).
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (corrupted, tampered, or sealed under another key).
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Seals and opens detail text.
pub trait DetailCipher: Send + Sync {
    /// Encrypts a plaintext string, returning a base64-encoded ciphertext.
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;

    /// Decrypts a base64-encoded ciphertext, returning the original plaintext.
    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError>;

    /// Decrypts, substituting [`DECRYPTION_ERROR_PLACEHOLDER`] on failure.
    fn decrypt_or_placeholder(&self, ciphertext: &str) -> String {
        match self.decrypt(ciphertext) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decrypt stored detail");
                DECRYPTION_ERROR_PLACEHOLDER.to_string()
            }
        }
    }
}

/// AES-256-GCM detail cipher.
///
/// Ciphertext format: `base64(nonce || ciphertext || tag)`
/// - Nonce: 12 bytes (96 bits)
/// - Tag: 16 bytes (128 bits) - appended to the ciphertext by aes-gcm
pub struct Aes256GcmCipher {
    cipher: Aes256Gcm,
}

impl Aes256GcmCipher {
    /// Creates a new cipher with the given 32-byte key.
    pub fn new(key: [u8; 32]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Creates a new cipher from a base64-encoded key.
    pub fn from_base64_key(key_base64: &str) -> Result<Self, CryptoError> {
        let key_bytes = BASE64
            .decode(key_base64.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid base64: {}", e)))?;

        if key_bytes.len() != 32 {
            return Err(CryptoError::InvalidKey(format!(
                "Key must be 32 bytes, got {} bytes",
                key_bytes.len()
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&key_bytes);
        Ok(Self::new(key))
    }
}

impl DetailCipher for Aes256GcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut combined = Vec::with_capacity(12 + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&combined))
    }

    fn decrypt(&self, ciphertext_base64: &str) -> Result<String, CryptoError> {
        let combined = BASE64
            .decode(ciphertext_base64)
            .map_err(|e| CryptoError::DecryptionFailed(format!("Invalid base64: {}", e)))?;

        // 12 byte nonce + 16 byte tag
        if combined.len() < 28 {
            return Err(CryptoError::DecryptionFailed(
                "Ciphertext too short".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext_bytes = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed("Authentication failed".to_string()))?;

        String::from_utf8(plaintext_bytes)
            .map_err(|e| CryptoError::DecryptionFailed(format!("Invalid UTF-8: {}", e)))
    }
}

/// Builds the detail cipher from a configured key.
///
/// With no key configured an ephemeral key is generated: details written in
/// this process stay readable until it exits, and read back afterwards as the
/// decryption placeholder.
pub fn create_cipher(key_base64: Option<&str>) -> Result<Arc<dyn DetailCipher>, CryptoError> {
    match key_base64 {
        Some(key) => {
            let cipher = Aes256GcmCipher::from_base64_key(key)?;
            tracing::info!("Detail encryption enabled with AES-256-GCM");
            Ok(Arc::new(cipher))
        }
        None => {
            tracing::warn!(
                "{} not set. Using an ephemeral key; stored violation details will not be \
                 readable after restart. Generate a key with: securemed keygen",
                ENCRYPTION_KEY_ENV
            );
            let mut key = [0u8; 32];
            rand::thread_rng().fill(&mut key);
            Ok(Arc::new(Aes256GcmCipher::new(key)))
        }
    }
}

/// Generates a random 32-byte encryption key, base64 encoded.
pub fn generate_encryption_key() -> String {
    let mut key = [0u8; 32];
    rand::thread_rng().fill(&mut key);
    BASE64.encode(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> Aes256GcmCipher {
        Aes256GcmCipher::new([7u8; 32])
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = test_cipher();
        let plaintext =
            "Nurse ana submitted incorrect value '555-0000' (expected '555-1234') for task: fax";

        let ciphertext = cipher.encrypt(plaintext).unwrap();
        assert_ne!(ciphertext, plaintext);
        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn test_encrypt_produces_different_ciphertexts() {
        let cipher = test_cipher();

        let first = cipher.encrypt("same").unwrap();
        let second = cipher.encrypt("same").unwrap();

        assert_ne!(first, second);
        assert_eq!(cipher.decrypt(&first).unwrap(), "same");
        assert_eq!(cipher.decrypt(&second).unwrap(), "same");
    }

    #[test]
    fn test_decrypt_tampered_ciphertext() {
        let cipher = test_cipher();
        let ciphertext = cipher.encrypt("secret").unwrap();

        let mut bytes = BASE64.decode(&ciphertext).unwrap();
        bytes[15] ^= 0xFF;
        let tampered = BASE64.encode(&bytes);

        assert!(matches!(
            cipher.decrypt(&tampered),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_decrypt_truncated_and_invalid() {
        let cipher = test_cipher();
        assert!(cipher.decrypt(&BASE64.encode([0u8; 20])).is_err());
        assert!(cipher.decrypt("not-valid-base64!!!").is_err());
    }

    #[test]
    fn test_decrypt_or_placeholder() {
        let cipher = test_cipher();
        let ciphertext = cipher.encrypt("Failed training scenario: phishing").unwrap();

        assert_eq!(
            cipher.decrypt_or_placeholder(&ciphertext),
            "Failed training scenario: phishing"
        );
        assert_eq!(
            cipher.decrypt_or_placeholder("garbage"),
            DECRYPTION_ERROR_PLACEHOLDER
        );
    }

    #[test]
    fn test_other_key_yields_placeholder() {
        let ciphertext = Aes256GcmCipher::new([1u8; 32]).encrypt("secret").unwrap();
        let other = Aes256GcmCipher::new([2u8; 32]);

        assert_eq!(
            other.decrypt_or_placeholder(&ciphertext),
            DECRYPTION_ERROR_PLACEHOLDER
        );
    }

    #[test]
    fn test_from_base64_key() {
        assert!(Aes256GcmCipher::from_base64_key(&BASE64.encode([42u8; 32])).is_ok());
        assert!(matches!(
            Aes256GcmCipher::from_base64_key(&BASE64.encode([42u8; 16])),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(matches!(
            Aes256GcmCipher::from_base64_key("not-valid-base64!!!"),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_create_cipher_with_key() {
        let key = generate_encryption_key();
        let cipher = create_cipher(Some(&key)).unwrap();
        let sealed = cipher.encrypt("detail").unwrap();

        let reopened = create_cipher(Some(&key)).unwrap();
        assert_eq!(reopened.decrypt(&sealed).unwrap(), "detail");
    }

    #[test]
    fn test_create_cipher_without_key_is_ephemeral() {
        let first = create_cipher(None).unwrap();
        let second = create_cipher(None).unwrap();
        let sealed = first.encrypt("detail").unwrap();

        assert_eq!(first.decrypt(&sealed).unwrap(), "detail");
        assert!(second.decrypt(&sealed).is_err());
    }

    #[test]
    fn test_generate_encryption_key() {
        let key = generate_encryption_key();
        assert_eq!(BASE64.decode(&key).unwrap().len(), 32);
        assert_ne!(key, generate_encryption_key());
    }
}
