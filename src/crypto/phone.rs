// ABOUTME: Phone number PII codec: authenticated encryption, lookup hash, and display suffix
// ABOUTME: Converts a plaintext phone into storage-safe artifacts and reverses the encryption on demand
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! Phone PII codec.
//!
//! A plaintext phone number is never stored. At write time it becomes three
//! artifacts, always derived together from the same plaintext:
//!
//! - **ciphertext**: AES-256-GCM, fresh random nonce per call, encoded as
//!   `hex(nonce):hex(tag):hex(ciphertext)`. Encrypting the same plaintext
//!   twice yields different outputs; that is the nonce doing its job.
//! - **lookup hash**: deterministic SHA-256 digest, used only for equality
//!   lookups and uniqueness enforcement. Not reversible to the plaintext.
//! - **last4**: the last four characters of the digit sequence, for display.
//!
//! Decryption fails closed: tag mismatch, malformed layout, and wrong key all
//! surface as [`CryptoError`], never as partial plaintext.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit};
use base64::{engine::general_purpose, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroize;

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Failures of the phone codec; decryption always fails closed
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption key must be exactly {KEY_LEN} bytes when base64 decoded")]
    InvalidKey,
    #[error("encrypted phone data has an invalid layout")]
    MalformedCiphertext,
    #[error("phone encryption failed")]
    EncryptionFailed,
    #[error("phone decryption failed")]
    DecryptionFailed,
}

/// The three storage-safe artifacts derived from one plaintext phone number.
///
/// Invariant: all three always come from the same plaintext at the same write.
/// There is no way to mutate one without re-deriving the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneArtifacts {
    pub ciphertext: String,
    pub lookup_hash: String,
    pub last4: String,
}

/// Symmetric codec for phone numbers, keyed with a 256-bit key
pub struct PhoneCodec {
    key: [u8; KEY_LEN],
}

impl PhoneCodec {
    /// Create a codec from raw key bytes
    #[must_use]
    pub const fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Load the key from its base64 configuration encoding.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if the value is not valid base64
    /// or does not decode to exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut key_bytes = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| CryptoError::InvalidKey)?;
        if key_bytes.len() != KEY_LEN {
            key_bytes.zeroize();
            return Err(CryptoError::InvalidKey);
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&key_bytes);
        key_bytes.zeroize();
        Ok(Self { key })
    }

    /// Generate a random process-local key.
    ///
    /// Development fallback only; data encrypted with a generated key is
    /// unrecoverable after restart. The caller is responsible for warning.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Base64 encoding of the key, for surfacing a generated development key
    #[must_use]
    pub fn key_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.key)
    }

    /// Encrypt a phone number. Empty input yields `None`, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the cipher rejects the input.
    pub fn encrypt(&self, plaintext: &str) -> Result<Option<String>, CryptoError> {
        if plaintext.is_empty() {
            return Ok(None);
        }

        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = GenericArray::from_slice(&nonce_bytes);

        // aes-gcm appends the 16-byte tag to the ciphertext
        let sealed = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed)?;
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        Ok(Some(format!(
            "{}:{}:{}",
            hex::encode(nonce_bytes),
            hex::encode(tag),
            hex::encode(ciphertext)
        )))
    }

    /// Decrypt an encoded phone number.
    ///
    /// # Errors
    ///
    /// Fails closed on malformed layout, authentication-tag mismatch, or a
    /// wrong key. Corrupted plaintext is never partially returned.
    pub fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        let mut parts = encoded.split(':');
        let (Some(nonce_hex), Some(tag_hex), Some(ct_hex), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::MalformedCiphertext);
        };

        let nonce_bytes = hex::decode(nonce_hex).map_err(|_| CryptoError::MalformedCiphertext)?;
        let tag = hex::decode(tag_hex).map_err(|_| CryptoError::MalformedCiphertext)?;
        let ciphertext = hex::decode(ct_hex).map_err(|_| CryptoError::MalformedCiphertext)?;

        if nonce_bytes.len() != NONCE_LEN || tag.len() != TAG_LEN {
            return Err(CryptoError::MalformedCiphertext);
        }

        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));
        let nonce = GenericArray::from_slice(&nonce_bytes);

        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let plaintext = cipher
            .decrypt(nonce, sealed.as_slice())
            .map_err(|_| CryptoError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Deterministic one-way digest of a plaintext, for equality lookups only.
    ///
    /// Empty input yields `None`.
    #[must_use]
    pub fn lookup_hash(plaintext: &str) -> Option<String> {
        if plaintext.is_empty() {
            return None;
        }
        let mut hasher = Sha256::new();
        hasher.update(plaintext.as_bytes());
        Some(format!("{:x}", hasher.finalize()))
    }

    /// Last four characters of the digit sequence, for UI display.
    ///
    /// Empty input yields `None`.
    #[must_use]
    pub fn display_suffix(plaintext: &str) -> Option<String> {
        if plaintext.is_empty() {
            return None;
        }
        let digits: Vec<char> = plaintext.chars().filter(char::is_ascii_digit).collect();
        let start = digits.len().saturating_sub(4);
        Some(digits[start..].iter().collect())
    }

    /// Derive all three storage artifacts from one plaintext.
    ///
    /// Empty input yields `None` for the whole set; there is no partial
    /// derivation.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails.
    pub fn seal(&self, plaintext: &str) -> Result<Option<PhoneArtifacts>, CryptoError> {
        let Some(ciphertext) = self.encrypt(plaintext)? else {
            return Ok(None);
        };
        // encrypt returned Some, so the plaintext is non-empty and both
        // derivations below are Some as well
        let lookup_hash = Self::lookup_hash(plaintext).ok_or(CryptoError::EncryptionFailed)?;
        let last4 = Self::display_suffix(plaintext).ok_or(CryptoError::EncryptionFailed)?;

        Ok(Some(PhoneArtifacts {
            ciphertext,
            lookup_hash,
            last4,
        }))
    }
}

impl Drop for PhoneCodec {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}
