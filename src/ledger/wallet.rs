// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-wallet ledger state and the claim/transfer/withdraw state machine.
//!
//! A [`Wallet`] owns every piece of mutable state for one on-chain
//! address: the asset registry, sub-accounts, inbox, outbox, balance map,
//! EIP-155 nonce, and provenance log. All mutation goes through the
//! methods here while the registry holds the wallet's exclusive lock, so
//! the provenance sequence equals the wallet's operation order.
//!
//! Every mutator stages its work locally and commits only after all
//! preconditions hold (for withdrawals, only after the key manager has
//! returned a signature). An error therefore leaves balances, nonce,
//! inbox, outbox, and provenance exactly as they were.

use std::collections::HashMap;

use alloy::hex;
use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EnclaveError, EnclaveResult};
use crate::eth::{calldata, eip155_v, EthAddress, LegacyTransaction};
use crate::keys::KeyManager;

use super::asset::{Asset, TokenType};
use super::provenance::{Operation, ProvenanceFilter, ProvenanceRecord};

/// A ledger-only partition within a wallet.
///
/// Sub-accounts have a display address but no key of their own; the
/// `subaccount_id` is their sole identity in ledger operations, and
/// several sub-accounts may share a display address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subaccount {
    pub subaccount_id: String,
    pub label: String,
    pub address: EthAddress,
}

/// An observed deposit awaiting assignment to a sub-account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxEntry {
    pub deposit_id: String,
    pub asset_id: String,
    pub amount: u128,
    pub from_address: EthAddress,
    pub to_address: EthAddress,
    pub tx_hash: String,
    pub block_number: String,
    pub claimed: bool,
}

/// A signed-but-not-broadcast withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub outbox_id: u64,
    pub asset_id: String,
    pub amount: u128,
    pub subaccount_id: String,
    pub destination: EthAddress,
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u64,
    pub gas_limit: u64,
    /// Lowercase 0x-prefixed hex of the signed RLP bytes.
    pub signed_raw_transaction: String,
    pub created_at: DateTime<Utc>,
}

/// An asset together with its balances, as returned by asset listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetOverview {
    #[serde(flatten)]
    pub asset: Asset,
    /// Sum over all sub-accounts.
    pub total_balance: u128,
    /// Non-zero balances per sub-account.
    pub balances: HashMap<String, u128>,
}

/// Summary of a wallet, as returned by state queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletState {
    pub address: EthAddress,
    pub name: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub nonce: u64,
    pub asset_count: usize,
    pub subaccount_count: usize,
    pub inbox: Vec<InboxEntry>,
    pub outbox_count: usize,
    pub provenance_count: usize,
}

/// All mutable ledger state for one wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    address: EthAddress,
    name: String,
    owner: String,
    created_at: DateTime<Utc>,
    /// Next EIP-155 transaction nonce, assigned at withdrawal signing.
    nonce: u64,
    assets: HashMap<String, Asset>,
    subaccounts: HashMap<String, Subaccount>,
    inbox: Vec<InboxEntry>,
    outbox: Vec<OutboxEntry>,
    next_outbox_id: u64,
    /// subaccount id → asset id → amount. Missing entries mean zero;
    /// entries are removed when they reach zero.
    balances: HashMap<String, HashMap<String, u128>>,
    provenance: Vec<ProvenanceRecord>,
}

impl Wallet {
    /// Install an empty ledger for a freshly generated address.
    pub fn new(address: EthAddress, name: String, owner: String) -> Self {
        Self {
            address,
            name,
            owner,
            created_at: Utc::now(),
            nonce: 0,
            assets: HashMap::new(),
            subaccounts: HashMap::new(),
            inbox: Vec::new(),
            outbox: Vec::new(),
            next_outbox_id: 0,
            balances: HashMap::new(),
            provenance: Vec::new(),
        }
    }

    /// The wallet's on-chain address and primary key.
    pub fn address(&self) -> EthAddress {
        self.address
    }

    /// The next EIP-155 nonce to be assigned.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    // ========== Registration ==========

    /// Register an asset.
    ///
    /// Idempotent on an identical re-registration. Registering a
    /// different definition under an existing id, or the same
    /// `(token_type, contract, token_id)` under a second id, is rejected.
    pub fn add_asset(&mut self, asset: Asset) -> EnclaveResult<()> {
        asset.validate()?;

        if let Some(existing) = self.assets.get(&asset.asset_id) {
            if *existing == asset {
                return Ok(());
            }
            return Err(EnclaveError::DuplicateAsset(asset.asset_id));
        }
        if self
            .assets
            .values()
            .any(|a| a.semantic_key() == asset.semantic_key())
        {
            return Err(EnclaveError::DuplicateAsset(asset.asset_id));
        }

        self.assets.insert(asset.asset_id.clone(), asset);
        Ok(())
    }

    /// Register a sub-account. Idempotent on an identical re-registration.
    pub fn add_subaccount(&mut self, subaccount: Subaccount) -> EnclaveResult<()> {
        if let Some(existing) = self.subaccounts.get(&subaccount.subaccount_id) {
            if *existing == subaccount {
                return Ok(());
            }
            return Err(EnclaveError::DuplicateSubaccount(subaccount.subaccount_id));
        }
        self.subaccounts
            .insert(subaccount.subaccount_id.clone(), subaccount);
        Ok(())
    }

    // ========== Inbox ==========

    /// Record an observed deposit in the inbox, unclaimed.
    ///
    /// No balance changes and no provenance record; both happen at claim
    /// time.
    pub fn record_deposit(&mut self, mut entry: InboxEntry) -> EnclaveResult<()> {
        if self
            .inbox
            .iter()
            .any(|d| d.deposit_id == entry.deposit_id)
        {
            return Err(EnclaveError::DuplicateDeposit(entry.deposit_id));
        }
        entry.claimed = false;
        self.inbox.push(entry);
        Ok(())
    }

    /// Claim a deposit into a sub-account, crediting its balance.
    pub fn claim(&mut self, deposit_id: &str, subaccount_id: &str) -> EnclaveResult<()> {
        let index = self
            .inbox
            .iter()
            .position(|d| d.deposit_id == deposit_id)
            .ok_or_else(|| EnclaveError::UnknownDeposit(deposit_id.to_string()))?;

        if self.inbox[index].claimed {
            return Err(EnclaveError::AlreadyClaimed(deposit_id.to_string()));
        }
        if !self.subaccounts.contains_key(subaccount_id) {
            return Err(EnclaveError::UnknownSubaccount(subaccount_id.to_string()));
        }

        let asset_id = self.inbox[index].asset_id.clone();
        let amount = self.inbox[index].amount;
        let block_number = self.inbox[index].block_number.clone();
        if !self.assets.contains_key(&asset_id) {
            return Err(EnclaveError::UnknownAsset(asset_id));
        }
        let credited = self.credited_balance(subaccount_id, &asset_id, amount)?;

        // All preconditions hold; commit.
        self.inbox[index].claimed = true;
        self.set_balance(subaccount_id, &asset_id, credited);
        self.push_record(
            Operation::Claim {
                deposit_id: deposit_id.to_string(),
                subaccount_id: subaccount_id.to_string(),
                asset_id,
                amount,
            },
            Some(block_number),
        );
        Ok(())
    }

    // ========== Transfers ==========

    /// Move balance between two sub-accounts. Purely off-chain; the key
    /// manager is never involved.
    pub fn transfer(
        &mut self,
        from_subaccount: &str,
        to_subaccount: &str,
        asset_id: &str,
        amount: u128,
    ) -> EnclaveResult<()> {
        if amount == 0 {
            return Err(EnclaveError::InvalidAmount(
                "transfer amount must be positive".into(),
            ));
        }
        if from_subaccount == to_subaccount {
            return Err(EnclaveError::InvalidAmount(
                "transfer requires two distinct subaccounts".into(),
            ));
        }
        for id in [from_subaccount, to_subaccount] {
            if !self.subaccounts.contains_key(id) {
                return Err(EnclaveError::UnknownSubaccount(id.to_string()));
            }
        }
        if !self.assets.contains_key(asset_id) {
            return Err(EnclaveError::UnknownAsset(asset_id.to_string()));
        }

        let remaining = self.debited_balance(from_subaccount, asset_id, amount)?;
        let credited = self.credited_balance(to_subaccount, asset_id, amount)?;

        self.set_balance(from_subaccount, asset_id, remaining);
        self.set_balance(to_subaccount, asset_id, credited);
        self.push_record(
            Operation::Transfer {
                from_subaccount: from_subaccount.to_string(),
                to_subaccount: to_subaccount.to_string(),
                asset_id: asset_id.to_string(),
                amount,
            },
            None,
        );
        Ok(())
    }

    // ========== Withdrawals ==========

    /// Sign a withdrawal to an external address and queue it in the outbox.
    ///
    /// The wallet nonce is read up front but only committed after the key
    /// manager returns a signature; a signing failure leaves the nonce
    /// (and everything else) untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn withdraw(
        &mut self,
        km: &KeyManager,
        subaccount_id: &str,
        asset_id: &str,
        amount: u128,
        destination: EthAddress,
        chain_id: u64,
        gas_price: Option<u64>,
        gas_limit: Option<u64>,
    ) -> EnclaveResult<OutboxEntry> {
        if amount == 0 {
            return Err(EnclaveError::InvalidAmount(
                "withdrawal amount must be positive".into(),
            ));
        }
        if !self.subaccounts.contains_key(subaccount_id) {
            return Err(EnclaveError::UnknownSubaccount(subaccount_id.to_string()));
        }
        let asset = self
            .assets
            .get(asset_id)
            .ok_or_else(|| EnclaveError::UnknownAsset(asset_id.to_string()))?;

        let remaining = self.debited_balance(subaccount_id, asset_id, amount)?;

        let gas_price = gas_price.unwrap_or(calldata::DEFAULT_GAS_PRICE_WEI);
        let gas_limit = gas_limit.unwrap_or(default_gas_limit(asset.token_type));
        let nonce = self.nonce;

        let tx = build_transfer_tx(
            asset,
            self.address,
            destination,
            amount,
            nonce,
            gas_price,
            gas_limit,
        )?;
        let digest = tx.signing_digest(chain_id);
        let (signature, recovery_id) = km.sign_digest(&self.address, digest)?;
        let v = eip155_v(chain_id, recovery_id.to_byte());
        let raw = tx.encode_signed(
            v,
            &signature.r().to_bytes(),
            &signature.s().to_bytes(),
        );

        // Signature in hand; commit.
        self.nonce = nonce + 1;
        let entry = OutboxEntry {
            outbox_id: self.next_outbox_id,
            asset_id: asset_id.to_string(),
            amount,
            subaccount_id: subaccount_id.to_string(),
            destination,
            chain_id,
            nonce,
            gas_price,
            gas_limit,
            signed_raw_transaction: format!("0x{}", hex::encode(&raw)),
            created_at: Utc::now(),
        };
        self.next_outbox_id += 1;
        self.set_balance(subaccount_id, asset_id, remaining);
        self.outbox.push(entry.clone());
        self.push_record(
            Operation::Withdraw {
                subaccount_id: subaccount_id.to_string(),
                asset_id: asset_id.to_string(),
                amount,
                destination,
                nonce,
                gas_price,
                gas_limit,
                chain_id,
                signed_raw_transaction: entry.signed_raw_transaction.clone(),
            },
            None,
        );
        Ok(entry)
    }

    /// Drop an outbox entry after the host confirms broadcast.
    ///
    /// No balance change and no provenance record.
    pub fn remove_outbox(&mut self, outbox_id: u64) -> EnclaveResult<OutboxEntry> {
        let index = self
            .outbox
            .iter()
            .position(|e| e.outbox_id == outbox_id)
            .ok_or(EnclaveError::UnknownOutboxEntry(outbox_id))?;
        Ok(self.outbox.remove(index))
    }

    /// Sign a generic EIP-191 message with the wallet's own key.
    ///
    /// The message bytes are hashed exactly as supplied; nothing is
    /// recorded on the wallet (authorization policy lives in the host).
    pub fn sign_gsm(
        &self,
        km: &KeyManager,
        domain: &str,
        message: &str,
    ) -> EnclaveResult<String> {
        tracing::debug!(wallet = %self.address, domain, "signing generic message");
        let signature = km.sign_personal_message(&self.address, message.as_bytes())?;
        Ok(format!("0x{}", hex::encode(signature)))
    }

    // ========== Queries ==========

    /// Balance of one sub-account in one asset; zero when absent.
    pub fn balance(&self, subaccount_id: &str, asset_id: &str) -> u128 {
        self.balances
            .get(subaccount_id)
            .and_then(|assets| assets.get(asset_id))
            .copied()
            .unwrap_or(0)
    }

    /// All non-zero balances of one sub-account.
    pub fn balances_for_subaccount(
        &self,
        subaccount_id: &str,
    ) -> EnclaveResult<HashMap<String, u128>> {
        if !self.subaccounts.contains_key(subaccount_id) {
            return Err(EnclaveError::UnknownSubaccount(subaccount_id.to_string()));
        }
        Ok(self
            .balances
            .get(subaccount_id)
            .cloned()
            .unwrap_or_default())
    }

    /// Every registered asset with its total and per-sub-account balances.
    pub fn assets(&self) -> Vec<AssetOverview> {
        let mut overviews: Vec<AssetOverview> = self
            .assets
            .values()
            .map(|asset| {
                let mut balances = HashMap::new();
                for (subaccount_id, assets) in &self.balances {
                    if let Some(&amount) = assets.get(&asset.asset_id) {
                        balances.insert(subaccount_id.clone(), amount);
                    }
                }
                let total_balance = balances.values().sum();
                AssetOverview {
                    asset: asset.clone(),
                    total_balance,
                    balances,
                }
            })
            .collect();
        overviews.sort_by(|a, b| a.asset.asset_id.cmp(&b.asset.asset_id));
        overviews
    }

    /// Provenance records passing `filter`, in `seq` order.
    pub fn provenance(&self, filter: &ProvenanceFilter) -> Vec<ProvenanceRecord> {
        self.provenance
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect()
    }

    /// The signed withdrawal queue, oldest first.
    pub fn outbox(&self) -> &[OutboxEntry] {
        &self.outbox
    }

    /// Summary used by state queries.
    pub fn state(&self) -> WalletState {
        WalletState {
            address: self.address,
            name: self.name.clone(),
            owner: self.owner.clone(),
            created_at: self.created_at,
            nonce: self.nonce,
            asset_count: self.assets.len(),
            subaccount_count: self.subaccounts.len(),
            inbox: self.inbox.clone(),
            outbox_count: self.outbox.len(),
            provenance_count: self.provenance.len(),
        }
    }

    // ========== Internals ==========

    /// Balance after crediting, or an overflow error. Does not mutate.
    fn credited_balance(
        &self,
        subaccount_id: &str,
        asset_id: &str,
        amount: u128,
    ) -> EnclaveResult<u128> {
        self.balance(subaccount_id, asset_id)
            .checked_add(amount)
            .ok_or_else(|| EnclaveError::InvalidAmount("balance overflow".into()))
    }

    /// Balance after debiting, or an insufficient-balance error. Does not
    /// mutate.
    fn debited_balance(
        &self,
        subaccount_id: &str,
        asset_id: &str,
        amount: u128,
    ) -> EnclaveResult<u128> {
        let available = self.balance(subaccount_id, asset_id);
        available
            .checked_sub(amount)
            .ok_or_else(|| EnclaveError::InsufficientBalance {
                subaccount_id: subaccount_id.to_string(),
                asset_id: asset_id.to_string(),
                available,
                requested: amount,
            })
    }

    /// Write a balance cell, dropping zero entries so missing means zero.
    fn set_balance(&mut self, subaccount_id: &str, asset_id: &str, amount: u128) {
        if amount == 0 {
            if let Some(assets) = self.balances.get_mut(subaccount_id) {
                assets.remove(asset_id);
                if assets.is_empty() {
                    self.balances.remove(subaccount_id);
                }
            }
        } else {
            self.balances
                .entry(subaccount_id.to_string())
                .or_default()
                .insert(asset_id.to_string(), amount);
        }
    }

    /// Append a provenance record with the next sequence number.
    fn push_record(&mut self, operation: Operation, block_number: Option<String>) {
        self.provenance.push(ProvenanceRecord {
            seq: self.provenance.len() as u64,
            timestamp: Utc::now().timestamp() as u64,
            block_number,
            operation,
        });
    }
}

/// Gas limit applied when the caller omits one.
fn default_gas_limit(token_type: TokenType) -> u64 {
    match token_type {
        TokenType::Eth => calldata::ETH_TRANSFER_GAS_LIMIT,
        TokenType::Erc20 => calldata::ERC20_TRANSFER_GAS_LIMIT,
        TokenType::Erc721 | TokenType::Erc1155 => calldata::NFT_TRANSFER_GAS_LIMIT,
    }
}

/// Map an asset transfer onto an unsigned legacy transaction.
fn build_transfer_tx(
    asset: &Asset,
    wallet_address: EthAddress,
    destination: EthAddress,
    amount: u128,
    nonce: u64,
    gas_price: u64,
    gas_limit: u64,
) -> EnclaveResult<LegacyTransaction> {
    let (to, value, data) = match asset.token_type {
        TokenType::Eth => (destination, U256::from(amount), Vec::new()),
        TokenType::Erc20 => {
            let contract = contract_address(asset)?;
            (
                contract,
                U256::ZERO,
                calldata::erc20_transfer(&destination, U256::from(amount)),
            )
        }
        TokenType::Erc721 => {
            let contract = contract_address(asset)?;
            let token_id = asset.parsed_token_id()?;
            (
                contract,
                U256::ZERO,
                calldata::erc721_safe_transfer_from(&wallet_address, &destination, token_id),
            )
        }
        TokenType::Erc1155 => {
            let contract = contract_address(asset)?;
            let token_id = asset.parsed_token_id()?;
            (
                contract,
                U256::ZERO,
                calldata::erc1155_safe_transfer_from(
                    &wallet_address,
                    &destination,
                    token_id,
                    U256::from(amount),
                ),
            )
        }
    };

    Ok(LegacyTransaction {
        nonce,
        gas_price,
        gas_limit,
        to,
        value,
        data,
    })
}

fn contract_address(asset: &Asset) -> EnclaveResult<EthAddress> {
    asset.contract_address.ok_or_else(|| {
        EnclaveError::InvalidAsset(format!("{}: missing contract address", asset.asset_id))
    })
}
