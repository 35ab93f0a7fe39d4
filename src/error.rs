// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Enclave Error Handling
//!
//! This module defines the single error type surfaced by every enclave
//! operation. Errors are never swallowed inside the core: each one
//! propagates up to the command dispatcher, which renders it into the
//! `{ "success": false, "error": <string> }` response envelope.
//!
//! Mutating ledger operations are all-or-nothing at the wallet level.
//! Whenever one of these errors is returned, balances, nonce, inbox,
//! outbox, and provenance are exactly as they were on entry. The only
//! exception is [`EnclaveError::FatalWallet`], which reports a wallet
//! whose critical section panicked and which is excluded from all
//! further writes.

use thiserror::Error;

/// Result type for enclave operations.
pub type EnclaveResult<T> = Result<T, EnclaveError>;

/// Unified error type for key management, ledger, and dispatch failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnclaveError {
    /// No wallet is registered under the given address.
    #[error("unknown wallet: {0}")]
    UnknownWallet(String),

    /// The asset id is not registered on the wallet.
    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    /// The sub-account id is not registered on the wallet.
    #[error("unknown subaccount: {0}")]
    UnknownSubaccount(String),

    /// The deposit id is not present in the wallet inbox.
    #[error("unknown deposit: {0}")]
    UnknownDeposit(String),

    /// The keystore holds no key for the given address.
    #[error("unknown address: {0}")]
    UnknownAddress(String),

    /// No outbox entry carries the given id.
    #[error("unknown outbox entry: {0}")]
    UnknownOutboxEntry(u64),

    /// A deposit with the same id was already recorded.
    #[error("duplicate deposit: {0}")]
    DuplicateDeposit(String),

    /// The deposit was already claimed and cannot be claimed again.
    #[error("deposit already claimed: {0}")]
    AlreadyClaimed(String),

    /// An asset with a conflicting definition is already registered.
    #[error("duplicate asset: {0}")]
    DuplicateAsset(String),

    /// A sub-account with a conflicting definition is already registered.
    #[error("duplicate subaccount: {0}")]
    DuplicateSubaccount(String),

    /// The amount is zero, overflows, or is otherwise unusable.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The address is not 20 bytes of 0x-prefixed hex.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The asset definition violates its token-type constraints.
    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    /// The command could not be decoded or carries an unknown tag.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The sub-account does not hold enough of the asset.
    #[error(
        "insufficient balance: subaccount {subaccount_id} holds {available} of {asset_id}, \
         {requested} requested"
    )]
    InsufficientBalance {
        subaccount_id: String,
        asset_id: String,
        available: u128,
        requested: u128,
    },

    /// Key generation, decryption, or signing failed.
    #[error("key management failure: {0}")]
    Kms(String),

    /// The per-wallet lock could not be acquired within the configured bound.
    #[error("timed out waiting for wallet lock")]
    Timeout,

    /// The wallet's critical section panicked; the wallet is fail-stopped.
    #[error("wallet {0} is no longer usable in this process")]
    FatalWallet(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_entity() {
        let e = EnclaveError::UnknownWallet("0xabc".into());
        assert_eq!(e.to_string(), "unknown wallet: 0xabc");

        let e = EnclaveError::InsufficientBalance {
            subaccount_id: "main".into(),
            asset_id: "eth_mainnet".into(),
            available: 5,
            requested: 10,
        };
        assert!(e.to_string().contains("main"));
        assert!(e.to_string().contains("eth_mainnet"));
        assert!(e.to_string().contains('5'));
        assert!(e.to_string().contains("10"));
    }

    #[test]
    fn timeout_has_a_stable_message() {
        assert_eq!(
            EnclaveError::Timeout.to_string(),
            "timed out waiting for wallet lock"
        );
    }
}
