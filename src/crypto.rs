//! PIN-derived key material and authenticated encryption.
//!
//! Two distinct application-wide salts feed SHA-256: one for the stored
//! verification hash, one for the AES-256-GCM key. An attacker who recovers
//! the verification hash cannot use it as the decryption key.
//!
//! The key is never persisted — it is re-derived from the PIN on every
//! unlock attempt.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, VaultError};

/// Nonce size for AES-GCM (96 bits = 12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Salt for the PIN verification hash.
const PIN_HASH_SALT: &str = "erp_mobile_pin_salt_v1";

/// Salt for encryption key derivation. Must never equal `PIN_HASH_SALT`.
const KEY_DERIVE_SALT: &str = "erp_mobile_aes_salt_v1";

/// A 256-bit encryption key with automatic zeroization on drop.
///
/// This wrapper ensures that the key material is securely erased from memory
/// as soon as the unlock attempt that derived it completes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    key: [u8; 32],
}

impl VaultKey {
    fn from_digest(digest: &[u8]) -> Self {
        let mut key = [0u8; 32];
        key.copy_from_slice(digest);
        Self { key }
    }

    /// Get the key as a byte slice for cryptographic operations.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log the actual key material
        f.debug_struct("VaultKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Compute the salted verification hash of a PIN.
///
/// Deterministic: the same PIN always yields the same hex digest. Used only
/// to check a candidate PIN against the stored hash, never as key material.
pub fn hash_pin(pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(PIN_HASH_SALT.as_bytes());
    hasher.update(pin.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derive the AES-256-GCM key from a PIN.
pub fn derive_key(pin: &str) -> VaultKey {
    let mut hasher = Sha256::new();
    hasher.update(KEY_DERIVE_SALT.as_bytes());
    hasher.update(pin.as_bytes());
    VaultKey::from_digest(&hasher.finalize())
}

/// Encrypt a serialized payload under the given key.
///
/// Returns the IV and the ciphertext (16-byte auth tag appended). A fresh
/// random IV is generated per call — reusing an IV under the same key would
/// break confidentiality.
pub fn encrypt(plaintext: &[u8], key: &VaultKey) -> Result<([u8; NONCE_SIZE], Vec<u8>)> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::Encryption(format!("Invalid key: {}", e)))?;

    // Generate random nonce
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Encryption(format!("Encryption failed: {}", e)))?;

    Ok((nonce_bytes, ciphertext))
}

/// Decrypt a payload produced by [`encrypt`].
///
/// Fails with [`VaultError::Authentication`] if the tag does not verify —
/// wrong key or tampered ciphertext. This is the sole signal distinguishing
/// "wrong PIN" from "corrupted vault" at this layer.
pub fn decrypt(iv: &[u8], ciphertext: &[u8], key: &VaultKey) -> Result<Vec<u8>> {
    if iv.len() != NONCE_SIZE {
        return Err(VaultError::Authentication);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::Encryption(format!("Invalid key: {}", e)))?;

    let nonce = Nonce::from_slice(iv);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| VaultError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_pin_deterministic() {
        let hash1 = hash_pin("1234");
        let hash2 = hash_pin("1234");
        let hash3 = hash_pin("5678");

        assert_eq!(hash1, hash2, "Same PIN should produce same hash");
        assert_ne!(hash1, hash3, "Different PINs should produce different hashes");
        assert_eq!(hash1.len(), 64, "SHA-256 hex digest is 64 chars");
    }

    #[test]
    fn test_hash_is_not_key_material() {
        // The verification hash and the derived key come from different
        // salts, so the hash must never match the raw key bytes.
        let hash = hash_pin("1234");
        let key = derive_key("1234");

        assert_ne!(hash, hex::encode(key.as_bytes()));
    }

    #[test]
    fn test_derive_key_deterministic() {
        let key1 = derive_key("1234");
        let key2 = derive_key("1234");
        let key3 = derive_key("5678");

        assert_eq!(key1.as_bytes(), key2.as_bytes());
        assert_ne!(key1.as_bytes(), key3.as_bytes());
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = derive_key("1234");
        let plaintext = b"{\"refreshToken\":\"abc\"}";

        let (iv, ciphertext) = encrypt(plaintext, &key).unwrap();
        let decrypted = decrypt(&iv, &ciphertext, &key).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let key = derive_key("1234");
        let wrong_key = derive_key("0000");

        let (iv, ciphertext) = encrypt(b"secret session", &key).unwrap();
        let result = decrypt(&iv, &ciphertext, &wrong_key);

        assert!(matches!(result, Err(VaultError::Authentication)));
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let key = derive_key("1234");
        let plaintext = b"same plaintext";

        let (iv1, ct1) = encrypt(plaintext, &key).unwrap();
        let (iv2, ct2) = encrypt(plaintext, &key).unwrap();

        assert_ne!(iv1, iv2, "IV must differ between calls");
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = derive_key("1234");
        let (iv, mut ciphertext) = encrypt(b"payload", &key).unwrap();
        ciphertext[0] ^= 0xFF;

        let result = decrypt(&iv, &ciphertext, &key);
        assert!(matches!(result, Err(VaultError::Authentication)));
    }

    #[test]
    fn test_decrypt_rejects_bad_iv_length() {
        let key = derive_key("1234");
        let (_, ciphertext) = encrypt(b"payload", &key).unwrap();

        let result = decrypt(&[0u8; 7], &ciphertext, &key);
        assert!(matches!(result, Err(VaultError::Authentication)));
    }

    #[test]
    fn test_ciphertext_includes_tag() {
        let key = derive_key("1234");
        let plaintext = b"16 byte tag test";
        let (_, ciphertext) = encrypt(plaintext, &key).unwrap();

        assert_eq!(ciphertext.len(), plaintext.len() + 16);
    }

    #[test]
    fn test_vault_key_debug_redacted() {
        let key = derive_key("1234");
        let debug = format!("{:?}", key);

        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(&hex::encode(key.as_bytes())));
    }
}
