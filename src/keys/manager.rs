// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The key manager: sole custodian of secret keys and the only producer
//! of ECDSA signatures in the enclave.
//!
//! ## Locking
//!
//! The keystore is one shared map behind a `RwLock`. Signing takes a read
//! guard, so signatures for different addresses proceed in parallel;
//! generation takes a brief write guard to install the new entry.
//!
//! ## Signature format
//!
//! All signatures are canonical low-s ECDSA over secp256k1 with
//! deterministic (RFC 6979) nonces. Personal-message signatures are the
//! 65-byte Ethereum layout `r ‖ s ‖ v` with `v = 27 + recovery_id`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use alloy::primitives::{keccak256, B256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{EnclaveError, EnclaveResult};
use crate::eth::EthAddress;

use super::sealed::{KeyCipher, SealedKey};

/// Sealed keys plus their insertion order, so address listings are
/// deterministic.
#[derive(Default)]
struct Keystore {
    keys: HashMap<EthAddress, SealedKey>,
    order: Vec<EthAddress>,
}

/// Custodian of encrypted secp256k1 keys.
pub struct KeyManager {
    cipher: KeyCipher,
    keystore: RwLock<Keystore>,
}

impl KeyManager {
    /// Build a key manager whose KEK is derived from `secret`.
    pub fn new(secret: &str) -> Self {
        Self {
            cipher: KeyCipher::new(secret),
            keystore: RwLock::new(Keystore::default()),
        }
    }

    /// Generate a fresh keypair, seal the secret, and return the address.
    ///
    /// The plaintext key bytes live in a zeroizing buffer and are wiped
    /// before this returns. Rejected candidates (the zero scalar, or an
    /// address collision) are retried.
    pub fn generate_account(&self) -> EnclaveResult<EthAddress> {
        loop {
            let mut key_bytes = Zeroizing::new([0u8; 32]);
            rand::thread_rng().fill_bytes(&mut *key_bytes);

            let signing_key = match SigningKey::from_slice(&key_bytes[..]) {
                Ok(key) => key,
                // Out-of-range scalar; astronomically rare.
                Err(_) => continue,
            };
            let address = EthAddress::from_public_key(signing_key.verifying_key());
            let sealed = self.cipher.seal(&key_bytes[..])?;

            let mut store = write_guard(&self.keystore);
            if store.keys.contains_key(&address) {
                continue;
            }
            store.keys.insert(address, sealed);
            store.order.push(address);
            return Ok(address);
        }
    }

    /// Addresses with stored keys, in insertion order.
    pub fn list_addresses(&self) -> Vec<EthAddress> {
        read_guard(&self.keystore).order.clone()
    }

    /// Whether a key is stored for `address`.
    pub fn contains(&self, address: &EthAddress) -> bool {
        read_guard(&self.keystore).keys.contains_key(address)
    }

    /// Sign an EIP-191 personal message; returns the 65-byte `r ‖ s ‖ v`
    /// signature.
    pub fn sign_personal_message(
        &self,
        address: &EthAddress,
        message: &[u8],
    ) -> EnclaveResult<[u8; 65]> {
        let digest = personal_message_digest(message);
        let (signature, recovery_id) = self.sign_digest(address, digest)?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte() + 27;
        Ok(out)
    }

    /// Sign a raw 32-byte digest with the key stored for `address`.
    pub fn sign_digest(
        &self,
        address: &EthAddress,
        digest: B256,
    ) -> EnclaveResult<(Signature, RecoveryId)> {
        let sealed = read_guard(&self.keystore)
            .keys
            .get(address)
            .cloned()
            .ok_or_else(|| EnclaveError::UnknownAddress(address.to_string()))?;

        let plaintext = self.cipher.open(&sealed)?;
        let signing_key = SigningKey::from_slice(&plaintext)
            .map_err(|_| EnclaveError::Kms("stored key bytes are invalid".into()))?;

        signing_key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| EnclaveError::Kms(format!("signing failed: {e}")))
    }
}

/// EIP-191 "personal_sign" digest:
/// `keccak256("\x19Ethereum Signed Message:\n" ‖ decimal(len) ‖ message)`.
pub fn personal_message_digest(message: &[u8]) -> B256 {
    let mut buf = Vec::with_capacity(message.len() + 32);
    buf.extend_from_slice(b"\x19Ethereum Signed Message:\n");
    buf.extend_from_slice(message.len().to_string().as_bytes());
    buf.extend_from_slice(message);
    keccak256(&buf)
}

/// Check a 65-byte personal-message signature against an address.
///
/// Pure recovery; no key material is consulted. Malformed signatures
/// report `false` rather than an error.
pub fn verify_personal_message(
    address: &EthAddress,
    message: &[u8],
    signature: &[u8],
) -> bool {
    if signature.len() != 65 {
        return false;
    }
    let Some(v) = signature[64].checked_sub(27) else {
        return false;
    };
    let Some(recovery_id) = RecoveryId::from_byte(v) else {
        return false;
    };
    let Ok(parsed) = Signature::from_slice(&signature[..64]) else {
        return false;
    };

    let digest = personal_message_digest(message);
    match VerifyingKey::recover_from_prehash(digest.as_slice(), &parsed, recovery_id) {
        Ok(key) => EthAddress::from_public_key(&key) == *address,
        Err(_) => false,
    }
}

// Keystore mutations are single map/vec inserts, so a guard recovered
// from a poisoned lock still sees structurally sound state.
fn read_guard(lock: &RwLock<Keystore>) -> std::sync::RwLockReadGuard<'_, Keystore> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_guard(lock: &RwLock<Keystore>) -> std::sync::RwLockWriteGuard<'_, Keystore> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> KeyManager {
        KeyManager::new("test-secret")
    }

    #[test]
    fn generated_addresses_are_listed_in_order() {
        let km = manager();
        let a = km.generate_account().unwrap();
        let b = km.generate_account().unwrap();
        let c = km.generate_account().unwrap();
        assert_eq!(km.list_addresses(), vec![a, b, c]);
        assert_ne!(a, b);
    }

    #[test]
    fn personal_signature_recovers_to_the_signer() {
        let km = manager();
        let address = km.generate_account().unwrap();
        let signature = km
            .sign_personal_message(&address, b"hello enclave")
            .unwrap();

        assert_eq!(signature.len(), 65);
        assert!(signature[64] == 27 || signature[64] == 28);
        assert!(verify_personal_message(&address, b"hello enclave", &signature));
        assert!(!verify_personal_message(&address, b"other message", &signature));
    }

    #[test]
    fn signature_does_not_verify_for_another_address() {
        let km = manager();
        let signer = km.generate_account().unwrap();
        let other = km.generate_account().unwrap();
        let signature = km.sign_personal_message(&signer, b"msg").unwrap();
        assert!(!verify_personal_message(&other, b"msg", &signature));
    }

    #[test]
    fn signing_is_deterministic() {
        let km = manager();
        let address = km.generate_account().unwrap();
        let a = km.sign_personal_message(&address, b"same bytes").unwrap();
        let b = km.sign_personal_message(&address, b"same bytes").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn signatures_are_low_s() {
        let km = manager();
        let address = km.generate_account().unwrap();
        for i in 0u32..8 {
            let digest = keccak256(i.to_be_bytes());
            let (signature, _) = km.sign_digest(&address, digest).unwrap();
            assert!(signature.normalize_s().is_none(), "high-s signature");
        }
    }

    #[test]
    fn unknown_address_is_reported() {
        let km = manager();
        let stranger = EthAddress::new([0x11; 20]);
        assert!(matches!(
            km.sign_personal_message(&stranger, b"msg"),
            Err(EnclaveError::UnknownAddress(_))
        ));
    }

    #[test]
    fn malformed_signatures_verify_false() {
        let address = EthAddress::new([0x22; 20]);
        assert!(!verify_personal_message(&address, b"msg", &[0u8; 10]));
        assert!(!verify_personal_message(&address, b"msg", &[0u8; 65]));

        let mut bad_v = [0u8; 65];
        bad_v[64] = 5;
        assert!(!verify_personal_message(&address, b"msg", &bad_v));
    }

    #[test]
    fn personal_digest_uses_decimal_byte_length() {
        // Prefix for a 4-byte message embeds the string "4".
        let digest = personal_message_digest(b"abcd");
        let expected = keccak256(b"\x19Ethereum Signed Message:\n4abcd");
        assert_eq!(digest, expected);
    }
}
