// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The tagged command surface and its response envelope.
//!
//! Commands arrive as externally tagged JSON objects, one per frame:
//! `{"Claim": {"wallet_address": "0x…", "deposit_id": "d1", …}}`. Unit
//! commands may be sent as a bare string (`"List"`) or with a null body
//! (`{"List": null}`). Unknown tags fail decoding and are answered with
//! an invalid-command error rather than dropped.

use serde::{Deserialize, Serialize};

use crate::error::EnclaveError;
use crate::eth::EthAddress;
use crate::ledger::TokenType;

/// Every request the enclave accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    // -- key manager --
    Keygen,
    Sign {
        address: EthAddress,
        message: String,
    },
    Verify {
        address: EthAddress,
        message: String,
        signature: String,
    },
    List,

    // -- wallet registry --
    CreateWallet {
        name: String,
        owner: String,
    },
    ListWallets,
    WalletState {
        wallet_address: EthAddress,
    },

    // -- wallet ledger --
    AddAsset {
        wallet_address: EthAddress,
        asset_id: String,
        token_type: TokenType,
        #[serde(default)]
        contract_address: Option<EthAddress>,
        #[serde(default)]
        token_id: Option<String>,
        symbol: String,
        name: String,
        decimals: u8,
    },
    ListAssets {
        wallet_address: EthAddress,
    },
    AddSubaccount {
        wallet_address: EthAddress,
        subaccount_id: String,
        label: String,
        address: EthAddress,
    },
    InboxDeposit {
        wallet_address: EthAddress,
        asset_id: String,
        amount: u128,
        deposit_id: String,
        transaction_hash: String,
        block_number: String,
        from_address: EthAddress,
        to_address: EthAddress,
    },
    Claim {
        wallet_address: EthAddress,
        deposit_id: String,
        subaccount_id: String,
    },
    Transfer {
        wallet_address: EthAddress,
        asset_id: String,
        amount: u128,
        from_subaccount: String,
        to_subaccount: String,
    },
    Withdraw {
        wallet_address: EthAddress,
        asset_id: String,
        amount: u128,
        subaccount_id: String,
        destination: EthAddress,
        chain_id: u64,
        #[serde(default)]
        gas_price: Option<u64>,
        #[serde(default)]
        gas_limit: Option<u64>,
    },
    ListOutbox {
        wallet_address: EthAddress,
    },
    RemoveOutbox {
        wallet_address: EthAddress,
        outbox_id: u64,
    },
    Balance {
        wallet_address: EthAddress,
        subaccount_id: String,
        asset_id: String,
    },
    SubaccountBalances {
        wallet_address: EthAddress,
        subaccount_id: String,
    },
    SignGsm {
        wallet_address: EthAddress,
        domain: String,
        message: String,
    },
    Provenance {
        wallet_address: EthAddress,
    },
    ProvenanceByAsset {
        wallet_address: EthAddress,
        asset_id: String,
    },
    ProvenanceBySubaccount {
        wallet_address: EthAddress,
        subaccount_id: String,
    },
}

/// The response envelope sent for every frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Wrap a payload in a success envelope.
    pub fn ok(payload: impl Serialize) -> Self {
        match serde_json::to_value(payload) {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(e) => Self::err(EnclaveError::InvalidCommand(format!(
                "response serialization failed: {e}"
            ))),
        }
    }

    /// Wrap an error in a failure envelope.
    pub fn err(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unit_commands_accept_string_and_null_body_forms() {
        let from_string: Command = serde_json::from_value(json!("Keygen")).unwrap();
        assert!(matches!(from_string, Command::Keygen));

        let from_null: Command = serde_json::from_value(json!({"List": null})).unwrap();
        assert!(matches!(from_null, Command::List));
    }

    #[test]
    fn tagged_commands_decode_their_payload() {
        let command: Command = serde_json::from_value(json!({
            "Claim": {
                "wallet_address": "0x742d35cc6634c0532925a3b844bc9e7595f4ab12",
                "deposit_id": "d1",
                "subaccount_id": "main"
            }
        }))
        .unwrap();
        assert!(matches!(command, Command::Claim { deposit_id, .. } if deposit_id == "d1"));
    }

    #[test]
    fn unknown_tags_fail_to_decode() {
        let result: Result<Command, _> =
            serde_json::from_value(json!({"SelfDestruct": {}}));
        assert!(result.is_err());
    }

    #[test]
    fn optional_gas_fields_default_to_none() {
        let command: Command = serde_json::from_value(json!({
            "Withdraw": {
                "wallet_address": "0x742d35cc6634c0532925a3b844bc9e7595f4ab12",
                "asset_id": "eth",
                "amount": 1,
                "subaccount_id": "main",
                "destination": "0x000000000000000000000000000000000000dead",
                "chain_id": 1
            }
        }))
        .unwrap();
        match command {
            Command::Withdraw {
                gas_price,
                gas_limit,
                ..
            } => {
                assert!(gas_price.is_none());
                assert!(gas_limit.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn error_envelope_skips_the_data_field() {
        let rendered =
            serde_json::to_string(&Response::err(EnclaveError::Timeout)).unwrap();
        assert_eq!(
            rendered,
            r#"{"success":false,"error":"timed out waiting for wallet lock"}"#
        );
    }
}
