// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Asset registry types.
//!
//! An asset is identified externally by its caller-chosen `asset_id`;
//! `(token_type, contract_address, token_id)` is its semantic key, and no
//! two registered assets may share one.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{EnclaveError, EnclaveResult};
use crate::eth::EthAddress;

/// Token standard of a registered asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenType {
    Eth,
    Erc20,
    Erc721,
    Erc1155,
}

/// A registered asset on one wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: String,
    pub token_type: TokenType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<EthAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

impl Asset {
    /// Check the token-type constraints.
    ///
    /// ETH carries no contract address and no token id; contract tokens
    /// require a contract address; ERC-721/1155 additionally require a
    /// decimal token id.
    pub fn validate(&self) -> EnclaveResult<()> {
        match self.token_type {
            TokenType::Eth => {
                if self.contract_address.is_some() {
                    return Err(self.invalid("ETH must not carry a contract address"));
                }
                if self.token_id.is_some() {
                    return Err(self.invalid("ETH must not carry a token id"));
                }
            }
            TokenType::Erc20 => {
                if self.contract_address.is_none() {
                    return Err(self.invalid("ERC20 requires a contract address"));
                }
                if self.token_id.is_some() {
                    return Err(self.invalid("ERC20 must not carry a token id"));
                }
            }
            TokenType::Erc721 | TokenType::Erc1155 => {
                if self.contract_address.is_none() {
                    return Err(self.invalid("NFT assets require a contract address"));
                }
                self.parsed_token_id()?;
            }
        }
        Ok(())
    }

    /// The decimal token id as a 256-bit integer.
    pub fn parsed_token_id(&self) -> EnclaveResult<U256> {
        let raw = self
            .token_id
            .as_deref()
            .ok_or_else(|| self.invalid("token id is required"))?;
        U256::from_str_radix(raw, 10)
            .map_err(|_| self.invalid("token id is not a decimal integer"))
    }

    /// Identity under which duplicate registrations are detected.
    pub fn semantic_key(&self) -> (TokenType, Option<EthAddress>, Option<&str>) {
        (
            self.token_type,
            self.contract_address,
            self.token_id.as_deref(),
        )
    }

    fn invalid(&self, reason: &str) -> EnclaveError {
        EnclaveError::InvalidAsset(format!("{}: {reason}", self.asset_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth_asset() -> Asset {
        Asset {
            asset_id: "eth_mainnet".into(),
            token_type: TokenType::Eth,
            contract_address: None,
            token_id: None,
            symbol: "ETH".into(),
            name: "Ether".into(),
            decimals: 18,
        }
    }

    fn contract() -> EthAddress {
        "0x6b175474e89094c44da98b954eedeac495271d0f"
            .parse()
            .unwrap()
    }

    #[test]
    fn eth_with_contract_address_is_invalid() {
        let mut asset = eth_asset();
        assert!(asset.validate().is_ok());
        asset.contract_address = Some(contract());
        assert!(matches!(
            asset.validate(),
            Err(EnclaveError::InvalidAsset(_))
        ));
    }

    #[test]
    fn erc20_requires_a_contract() {
        let asset = Asset {
            asset_id: "dai".into(),
            token_type: TokenType::Erc20,
            contract_address: None,
            token_id: None,
            symbol: "DAI".into(),
            name: "Dai".into(),
            decimals: 18,
        };
        assert!(asset.validate().is_err());
    }

    #[test]
    fn nft_requires_a_decimal_token_id() {
        let mut asset = Asset {
            asset_id: "punk".into(),
            token_type: TokenType::Erc721,
            contract_address: Some(contract()),
            token_id: None,
            symbol: "PUNK".into(),
            name: "Punk".into(),
            decimals: 0,
        };
        assert!(asset.validate().is_err());

        asset.token_id = Some("0x2a".into());
        assert!(asset.validate().is_err());

        asset.token_id = Some("42".into());
        assert!(asset.validate().is_ok());
        assert_eq!(asset.parsed_token_id().unwrap(), U256::from(42u64));
    }

    #[test]
    fn token_type_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&TokenType::Erc1155).unwrap(),
            "\"ERC1155\""
        );
        let parsed: TokenType = serde_json::from_str("\"ETH\"").unwrap();
        assert_eq!(parsed, TokenType::Eth);
    }

    #[test]
    fn semantic_key_ignores_display_metadata() {
        let a = eth_asset();
        let mut b = eth_asset();
        b.asset_id = "eth_other".into();
        b.symbol = "WETH".into();
        assert_eq!(a.semantic_key(), b.semantic_key());
    }
}
