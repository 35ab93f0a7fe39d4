// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ethereum primitives: addresses, legacy transaction encoding, and token
//! transfer calldata.
//!
//! Everything in this module is pure computation. Nothing here performs
//! I/O, touches the keystore, or holds state.

pub mod calldata;
pub mod tx;

use std::fmt;
use std::str::FromStr;

use alloy::primitives::keccak256;
use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EnclaveError;

pub use tx::{eip155_v, LegacyTransaction};

/// 20-byte Ethereum account address.
///
/// Rendered as lowercase `0x`-prefixed hex at the API boundary. Parsing
/// accepts any hex casing, so two spellings of the same address always
/// compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EthAddress([u8; 20]);

impl EthAddress {
    /// Byte length of an address.
    pub const LEN: usize = 20;

    /// Wrap raw address bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// The raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Derive the address of a secp256k1 public key.
    ///
    /// The address is the lowest 20 bytes of `keccak256` over the 64-byte
    /// uncompressed point, with the `0x04` SEC1 tag dropped.
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let hash = keccak256(&point.as_bytes()[1..]);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[12..]);
        Self(bytes)
    }
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", alloy::hex::encode(self.0))
    }
}

impl fmt::Debug for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for EthAddress {
    type Err = EnclaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| EnclaveError::InvalidAddress(s.to_string()))?;
        let mut bytes = [0u8; 20];
        alloy::hex::decode_to_slice(hex_part, &mut bytes)
            .map_err(|_| EnclaveError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for EthAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EthAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    #[test]
    fn parses_and_renders_lowercase() {
        let addr: EthAddress = "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12"
            .parse()
            .unwrap();
        assert_eq!(
            addr.to_string(),
            "0x742d35cc6634c0532925a3b844bc9e7595f4ab12"
        );
    }

    #[test]
    fn comparison_ignores_input_casing() {
        let lower: EthAddress = "0x742d35cc6634c0532925a3b844bc9e7595f4ab12"
            .parse()
            .unwrap();
        let mixed: EthAddress = "0x742D35CC6634C0532925A3B844BC9E7595F4AB12"
            .parse()
            .unwrap();
        assert_eq!(lower, mixed);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!("742d35cc6634c0532925a3b844bc9e7595f4ab12"
            .parse::<EthAddress>()
            .is_err());
        assert!("0x742d35cc".parse::<EthAddress>().is_err());
        assert!("0xzz2d35cc6634c0532925a3b844bc9e7595f4ab12"
            .parse::<EthAddress>()
            .is_err());
    }

    #[test]
    fn serde_round_trips_as_hex_string() {
        let addr: EthAddress = "0x742d35cc6634c0532925a3b844bc9e7595f4ab12"
            .parse()
            .unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x742d35cc6634c0532925a3b844bc9e7595f4ab12\"");
        let back: EthAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn derives_the_well_known_address_for_key_one() {
        // Private key 0x...01 has a fixed, widely published address.
        let mut key = [0u8; 32];
        key[31] = 1;
        let signing_key = SigningKey::from_slice(&key).unwrap();
        let addr = EthAddress::from_public_key(signing_key.verifying_key());
        assert_eq!(
            addr.to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }
}
