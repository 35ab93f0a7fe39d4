// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Legacy (type 0) Ethereum transaction encoding with EIP-155 replay
//! protection.
//!
//! The unsigned form is the nine-item RLP list
//! `[nonce, gas_price, gas_limit, to, value, data, chain_id, 0, 0]`;
//! the signed form replaces the trailing three items with `[v, r, s]`
//! where `v = chain_id * 2 + 35 + recovery_id`. Integers are minimally
//! encoded, so zero becomes the empty byte string and `r`/`s` lose any
//! leading zero bytes.

use alloy::primitives::{keccak256, B256, U256};
use rlp::RlpStream;

use super::EthAddress;

/// An unsigned legacy transfer transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u64,
    pub gas_limit: u64,
    pub to: EthAddress,
    pub value: U256,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    /// RLP-encode the unsigned transaction for the given chain.
    pub fn encode_unsigned(&self, chain_id: u64) -> Vec<u8> {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&chain_id);
        stream.append_empty_data();
        stream.append_empty_data();
        stream.out().to_vec()
    }

    /// The 32-byte digest that gets signed: keccak256 of the unsigned RLP.
    pub fn signing_digest(&self, chain_id: u64) -> B256 {
        keccak256(self.encode_unsigned(chain_id))
    }

    /// RLP-encode the signed transaction.
    ///
    /// `r` and `s` are big-endian unsigned scalars; fixed-width inputs are
    /// accepted and trimmed to the minimal integer encoding here.
    pub fn encode_signed(&self, v: u64, r: &[u8], s: &[u8]) -> Vec<u8> {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&v);
        append_scalar(&mut stream, r);
        append_scalar(&mut stream, s);
        stream.out().to_vec()
    }

    fn append_body(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        stream.append(&self.to.as_bytes().as_slice());
        append_scalar(stream, &self.value.to_be_bytes::<32>());
        stream.append(&self.data);
    }
}

/// EIP-155 `v` for a signature on the given chain.
pub fn eip155_v(chain_id: u64, recovery_id: u8) -> u64 {
    chain_id * 2 + 35 + u64::from(recovery_id)
}

/// Append a big-endian unsigned integer, stripping leading zero bytes.
fn append_scalar(stream: &mut RlpStream, bytes: &[u8]) {
    let first = bytes.iter().position(|&b| b != 0);
    match first {
        Some(i) => stream.append(&&bytes[i..]),
        None => stream.append_empty_data(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::hex;
    use k256::ecdsa::SigningKey;

    fn example_transaction() -> LegacyTransaction {
        // The worked example from the EIP-155 appendix: 1 ETH to
        // 0x3535...35 at nonce 9 on mainnet.
        LegacyTransaction {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: "0x3535353535353535353535353535353535353535"
                .parse()
                .unwrap(),
            value: U256::from(1_000_000_000_000_000_000u64),
            data: Vec::new(),
        }
    }

    #[test]
    fn unsigned_encoding_matches_the_eip155_example() {
        let tx = example_transaction();
        assert_eq!(
            hex::encode(tx.encode_unsigned(1)),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
    }

    #[test]
    fn signing_digest_matches_the_eip155_example() {
        let tx = example_transaction();
        assert_eq!(
            hex::encode(tx.signing_digest(1)),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn signed_encoding_matches_the_eip155_example() {
        let tx = example_transaction();
        let key = SigningKey::from_slice(&[0x46u8; 32]).unwrap();
        let digest = tx.signing_digest(1);
        let (signature, recovery_id) =
            key.sign_prehash_recoverable(digest.as_slice()).unwrap();

        let v = eip155_v(1, recovery_id.to_byte());
        assert_eq!(v, 37);

        let raw = tx.encode_signed(
            v,
            &signature.r().to_bytes(),
            &signature.s().to_bytes(),
        );
        assert_eq!(
            hex::encode(raw),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025\
             a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276\
             a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn zero_values_encode_as_empty_strings() {
        let tx = LegacyTransaction {
            nonce: 0,
            gas_price: 0,
            gas_limit: 0,
            to: "0x0000000000000000000000000000000000000000"
                .parse()
                .unwrap(),
            value: U256::ZERO,
            data: Vec::new(),
        };
        let encoded = tx.encode_unsigned(1);
        // list header, then 0x80 for each zero integer and the empty data.
        assert_eq!(
            hex::encode(encoded),
            "dd80808094000000000000000000000000000000000000000080" // nonce..value
                .to_owned()
                + "80" // data
                + "01" // chain id
                + "8080"
        );
    }

    #[test]
    fn digest_is_bound_to_the_chain_id() {
        let tx = example_transaction();
        assert_ne!(tx.signing_digest(1), tx.signing_digest(11155111));
    }

    #[test]
    fn v_encodes_chain_and_recovery_id() {
        assert_eq!(eip155_v(1, 0), 37);
        assert_eq!(eip155_v(1, 1), 38);
        assert_eq!(eip155_v(11155111, 0), 22310257);
        assert_eq!(eip155_v(11155111, 1), 22310258);
    }
}
