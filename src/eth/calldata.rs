// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ERC-20/721/1155 transfer calldata.
//!
//! Layouts follow the Solidity ABI: a 4-byte function selector followed by
//! 32-byte words, addresses and integers left-padded with zeros.

use alloy::primitives::U256;

use super::EthAddress;

/// `keccak256("transfer(address,uint256)")[0..4]`
pub const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// `keccak256("safeTransferFrom(address,address,uint256)")[0..4]`
pub const ERC721_SAFE_TRANSFER_SELECTOR: [u8; 4] = [0x42, 0x84, 0x2e, 0x0e];

/// `keccak256("safeTransferFrom(address,address,uint256,uint256,bytes)")[0..4]`
pub const ERC1155_SAFE_TRANSFER_SELECTOR: [u8; 4] = [0xf2, 0x42, 0x43, 0x2a];

/// Gas limit applied to native ETH transfers when the caller omits one.
pub const ETH_TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Gas limit applied to ERC-20 transfers when the caller omits one.
pub const ERC20_TRANSFER_GAS_LIMIT: u64 = 65_000;

/// Gas limit applied to ERC-721/1155 transfers when the caller omits one.
pub const NFT_TRANSFER_GAS_LIMIT: u64 = 100_000;

/// Gas price applied when the caller omits one: 20 gwei.
pub const DEFAULT_GAS_PRICE_WEI: u64 = 20_000_000_000;

/// `transfer(recipient, amount)` calldata for an ERC-20 contract.
pub fn erc20_transfer(recipient: &EthAddress, amount: U256) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 2 * 32);
    data.extend_from_slice(&ERC20_TRANSFER_SELECTOR);
    data.extend_from_slice(&pad_address(recipient));
    data.extend_from_slice(&amount.to_be_bytes::<32>());
    data
}

/// `safeTransferFrom(owner, recipient, token_id)` calldata for an ERC-721
/// contract.
pub fn erc721_safe_transfer_from(
    owner: &EthAddress,
    recipient: &EthAddress,
    token_id: U256,
) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 3 * 32);
    data.extend_from_slice(&ERC721_SAFE_TRANSFER_SELECTOR);
    data.extend_from_slice(&pad_address(owner));
    data.extend_from_slice(&pad_address(recipient));
    data.extend_from_slice(&token_id.to_be_bytes::<32>());
    data
}

/// `safeTransferFrom(owner, recipient, token_id, amount, "")` calldata for
/// an ERC-1155 contract, with the empty `bytes` argument encoded as an
/// offset word followed by a zero length.
pub fn erc1155_safe_transfer_from(
    owner: &EthAddress,
    recipient: &EthAddress,
    token_id: U256,
    amount: U256,
) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 6 * 32);
    data.extend_from_slice(&ERC1155_SAFE_TRANSFER_SELECTOR);
    data.extend_from_slice(&pad_address(owner));
    data.extend_from_slice(&pad_address(recipient));
    data.extend_from_slice(&token_id.to_be_bytes::<32>());
    data.extend_from_slice(&amount.to_be_bytes::<32>());
    data.extend_from_slice(&U256::from(0x80u64).to_be_bytes::<32>());
    data.extend_from_slice(&U256::ZERO.to_be_bytes::<32>());
    data
}

fn pad_address(address: &EthAddress) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}
