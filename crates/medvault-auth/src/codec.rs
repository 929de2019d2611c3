//! Record payload sealing using AES-256-GCM.
//!
//! The codec knows nothing about patients, roles or consent. It turns a JSON
//! value into a [`SealedPayload`] and back, and fails closed on any tampering.
//! Nonces are always drawn internally; there is no way to pass one in.

use std::fmt;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use medvault_core::SealedPayload;
use rand::RngCore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::config::Secret;
use crate::error::AuthError;

/// Nonce size for AES-256-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// Key size for AES-256 (256 bits)
const KEY_SIZE: usize = 32;

/// Authentication tag size (128 bits)
const TAG_SIZE: usize = 16;

/// Seals and opens clinical record payloads.
#[derive(Clone)]
pub struct RecordCodec {
    cipher: Aes256Gcm,
}

impl RecordCodec {
    /// Builds the codec from configured key material.
    ///
    /// 64 hex characters are decoded as the raw key. Any other non-empty
    /// string is hashed with SHA-256.
    pub fn new(key: &Secret) -> Result<Self, AuthError> {
        let key = derive_key(key.expose())?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| AuthError::configuration(format!("failed to create cipher: {e}")))?;
        Ok(Self { cipher })
    }

    /// Serializes `value` to JSON and encrypts it under a fresh nonce.
    pub fn seal<T: Serialize + ?Sized>(&self, value: &T) -> Result<SealedPayload, AuthError> {
        let plaintext = serde_json::to_vec(value)
            .map_err(|e| AuthError::internal(format!("failed to encode record: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|e| AuthError::internal(format!("encryption failed: {e}")))?;
        let tag = sealed.split_off(sealed.len() - TAG_SIZE);

        Ok(SealedPayload::from_parts(
            hex::encode(nonce_bytes),
            hex::encode(sealed),
            hex::encode(tag),
        ))
    }

    /// Authenticates and decrypts a payload.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DecryptionFailure` if any part is malformed, the tag
    /// does not verify, or the plaintext is not the expected JSON.
    pub fn open<T: DeserializeOwned>(&self, sealed: &SealedPayload) -> Result<T, AuthError> {
        let nonce_bytes = hex::decode(sealed.nonce()).map_err(|_| AuthError::DecryptionFailure)?;
        let mut ciphertext =
            hex::decode(sealed.ciphertext()).map_err(|_| AuthError::DecryptionFailure)?;
        let tag = hex::decode(sealed.tag()).map_err(|_| AuthError::DecryptionFailure)?;

        if nonce_bytes.len() != NONCE_SIZE || tag.len() != TAG_SIZE {
            return Err(AuthError::DecryptionFailure);
        }

        ciphertext.extend_from_slice(&tag);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| AuthError::DecryptionFailure)?;

        serde_json::from_slice(&plaintext).map_err(|_| AuthError::DecryptionFailure)
    }
}

fn derive_key(material: &str) -> Result<[u8; KEY_SIZE], AuthError> {
    if material.is_empty() {
        return Err(AuthError::configuration("encryption key cannot be empty"));
    }

    let mut key = [0u8; KEY_SIZE];
    if material.len() == KEY_SIZE * 2 && hex::decode_to_slice(material, &mut key).is_ok() {
        return Ok(key);
    }

    key.copy_from_slice(&Sha256::digest(material.as_bytes()));
    Ok(key)
}

impl fmt::Debug for RecordCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCodec")
            .field("cipher", &"AES-256-GCM")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn codec() -> RecordCodec {
        RecordCodec::new(&Secret::new("test-encryption-key")).unwrap()
    }

    fn flip_hex_bit(hex_str: &str, byte: usize, bit: u8) -> String {
        let mut bytes = hex::decode(hex_str).unwrap();
        bytes[byte] ^= 1 << bit;
        hex::encode(bytes)
    }

    #[test]
    fn test_open_returns_sealed_value() {
        let c = codec();
        let value = json!({"symptoms": ["fever", "cough"], "createdAt": 1714557600});
        let sealed = c.seal(&value).unwrap();
        let opened: Value = c.open(&sealed).unwrap();
        assert_eq!(opened, value);
    }

    #[test]
    fn test_sealed_parts_shape() {
        let sealed = codec().seal(&json!({"a": 1})).unwrap();
        assert_eq!(hex::decode(sealed.nonce()).unwrap().len(), NONCE_SIZE);
        assert_eq!(hex::decode(sealed.tag()).unwrap().len(), TAG_SIZE);
        assert!(!sealed.ciphertext().contains("\"a\""));
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let c = codec();
        let value = json!({"report": "x-ray"});
        let a = c.seal(&value).unwrap();
        let b = c.seal(&value).unwrap();
        assert_ne!(a.nonce(), b.nonce());
        assert_ne!(a.ciphertext(), b.ciphertext());
    }

    #[test]
    fn test_any_ciphertext_bit_flip_fails() {
        let c = codec();
        let sealed = c.seal(&json!({"notes": "stable"})).unwrap();
        let len = sealed.ciphertext().len() / 2;

        for byte in 0..len {
            for bit in 0..8 {
                let tampered = SealedPayload::from_parts(
                    sealed.nonce(),
                    flip_hex_bit(sealed.ciphertext(), byte, bit),
                    sealed.tag(),
                );
                let err = c.open::<Value>(&tampered).unwrap_err();
                assert!(matches!(err, AuthError::DecryptionFailure));
            }
        }
    }

    #[test]
    fn test_any_tag_bit_flip_fails() {
        let c = codec();
        let sealed = c.seal(&json!({"notes": "stable"})).unwrap();

        for byte in 0..TAG_SIZE {
            for bit in 0..8 {
                let tampered = SealedPayload::from_parts(
                    sealed.nonce(),
                    sealed.ciphertext(),
                    flip_hex_bit(sealed.tag(), byte, bit),
                );
                assert!(matches!(
                    c.open::<Value>(&tampered),
                    Err(AuthError::DecryptionFailure)
                ));
            }
        }
    }

    #[test]
    fn test_nonce_flip_and_malformed_parts_fail() {
        let c = codec();
        let sealed = c.seal(&json!([1, 2, 3])).unwrap();

        let wrong_nonce = SealedPayload::from_parts(
            flip_hex_bit(sealed.nonce(), 0, 0),
            sealed.ciphertext(),
            sealed.tag(),
        );
        assert!(c.open::<Value>(&wrong_nonce).is_err());

        let not_hex = SealedPayload::from_parts("zz", sealed.ciphertext(), sealed.tag());
        assert!(matches!(
            c.open::<Value>(&not_hex),
            Err(AuthError::DecryptionFailure)
        ));

        let short_tag = SealedPayload::from_parts(sealed.nonce(), sealed.ciphertext(), "00");
        assert!(matches!(
            c.open::<Value>(&short_tag),
            Err(AuthError::DecryptionFailure)
        ));
    }

    #[test]
    fn test_other_key_cannot_open() {
        let sealed = codec().seal(&json!({"a": 1})).unwrap();
        let other = RecordCodec::new(&Secret::new("another-key")).unwrap();
        assert!(matches!(
            other.open::<Value>(&sealed),
            Err(AuthError::DecryptionFailure)
        ));
    }

    #[test]
    fn test_hex_key_is_used_raw() {
        let hex_key = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";
        assert_eq!(
            derive_key(hex_key).unwrap().to_vec(),
            hex::decode(hex_key).unwrap()
        );
        assert_ne!(
            derive_key("passphrase").unwrap().to_vec(),
            derive_key("passphrase2").unwrap().to_vec()
        );
        assert!(derive_key("").is_err());
    }
}
