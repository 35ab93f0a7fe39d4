// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-GCM sealing of private keys at rest.
//!
//! The key-encryption key is derived once from the enclave startup secret
//! (`keccak256` of the configured string). Every sealed blob carries its
//! own random 96-bit nonce; the GCM tag authenticates the ciphertext, so
//! a tampered blob fails to open instead of yielding garbage key bytes.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use alloy::hex;
use alloy::primitives::keccak256;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{EnclaveError, EnclaveResult};

/// AEAD nonce length in bytes.
const NONCE_LEN: usize = 12;

/// A private key encrypted under the process KEK.
///
/// Once stored for an address, a sealed blob is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKey {
    /// Hex-encoded ciphertext, GCM tag included.
    pub ciphertext: String,
    /// Hex-encoded 96-bit nonce used for this blob.
    pub nonce: String,
}

/// Cipher handle keyed from the enclave startup secret.
pub struct KeyCipher {
    cipher: Aes256Gcm,
}

impl KeyCipher {
    /// Derive the KEK from the startup secret and build the cipher.
    pub fn new(secret: &str) -> Self {
        let kek = keccak256(secret.as_bytes());
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(kek.as_slice()));
        Self { cipher }
    }

    /// Encrypt key bytes under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> EnclaveResult<SealedKey> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| EnclaveError::Kms("key encryption failed".into()))?;

        Ok(SealedKey {
            ciphertext: hex::encode(ciphertext),
            nonce: hex::encode(nonce_bytes),
        })
    }

    /// Decrypt a sealed blob, verifying its authentication tag.
    ///
    /// The plaintext is returned in a zeroizing buffer and wiped when the
    /// caller drops it.
    pub fn open(&self, sealed: &SealedKey) -> EnclaveResult<Zeroizing<Vec<u8>>> {
        let nonce_bytes = hex::decode(&sealed.nonce)
            .map_err(|_| EnclaveError::Kms("malformed key nonce".into()))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(EnclaveError::Kms("malformed key nonce".into()));
        }

        let ciphertext = hex::decode(&sealed.ciphertext)
            .map_err(|_| EnclaveError::Kms("malformed key ciphertext".into()))?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| EnclaveError::Kms("key decryption failed".into()))?;

        Ok(Zeroizing::new(plaintext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_and_open_round_trip() {
        let cipher = KeyCipher::new("test-secret");
        let sealed = cipher.seal(b"thirty-two bytes of key material").unwrap();
        let opened = cipher.open(&sealed).unwrap();
        assert_eq!(opened.as_slice(), b"thirty-two bytes of key material");
    }

    #[test]
    fn each_seal_uses_a_fresh_nonce() {
        let cipher = KeyCipher::new("test-secret");
        let a = cipher.seal(b"same plaintext").unwrap();
        let b = cipher.seal(b"same plaintext").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn tampered_ciphertext_fails_to_open() {
        let cipher = KeyCipher::new("test-secret");
        let mut sealed = cipher.seal(b"key material").unwrap();
        let mut raw = hex::decode(&sealed.ciphertext).unwrap();
        raw[0] ^= 0xff;
        sealed.ciphertext = hex::encode(raw);

        assert!(matches!(
            cipher.open(&sealed),
            Err(EnclaveError::Kms(_))
        ));
    }

    #[test]
    fn wrong_secret_fails_to_open() {
        let sealed = KeyCipher::new("secret-a").seal(b"key material").unwrap();
        assert!(KeyCipher::new("secret-b").open(&sealed).is_err());
    }

    #[test]
    fn malformed_hex_is_rejected() {
        let cipher = KeyCipher::new("test-secret");
        let sealed = SealedKey {
            ciphertext: "not hex".into(),
            nonce: "0011223344556677889900aa".into(),
        };
        assert!(cipher.open(&sealed).is_err());

        let sealed = SealedKey {
            ciphertext: "00".into(),
            nonce: "0011".into(),
        };
        assert!(cipher.open(&sealed).is_err());
    }
}
