// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The command dispatcher.
//!
//! Routes each decoded [`Command`] to the key manager or, through the
//! registry's per-wallet lock, to the target wallet's ledger, and folds
//! the outcome into the response envelope. The dispatcher holds no state
//! of its own beyond the owned components it was built with; nothing here
//! reaches for process globals, so several isolated enclaves can coexist
//! in one process.

use std::sync::Arc;

use alloy::hex;
use serde_json::json;

use crate::config::Config;
use crate::error::EnclaveResult;
use crate::eth::EthAddress;
use crate::keys::{verify_personal_message, KeyManager};
use crate::ledger::{
    Asset, InboxEntry, ProvenanceFilter, Subaccount, WalletRegistry,
};

use super::command::{Command, Response};

/// The enclave core: key manager plus wallet registry.
pub struct Enclave {
    km: Arc<KeyManager>,
    registry: WalletRegistry,
}

impl Enclave {
    /// Build an enclave from its configuration.
    pub fn new(config: &Config) -> Self {
        let km = Arc::new(KeyManager::new(&config.secret));
        let registry = WalletRegistry::new(km.clone(), config.lock_timeout);
        Self { km, registry }
    }

    /// Execute one command and produce its response envelope.
    pub async fn dispatch(&self, command: Command) -> Response {
        match self.execute(command).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(error = %e, "command failed");
                Response::err(e)
            }
        }
    }

    async fn execute(&self, command: Command) -> EnclaveResult<Response> {
        match command {
            // -- key manager --
            Command::Keygen => {
                let address = self.km.generate_account()?;
                Ok(Response::ok(json!({ "address": address })))
            }
            Command::Sign { address, message } => {
                let signature = self
                    .km
                    .sign_personal_message(&address, message.as_bytes())?;
                Ok(Response::ok(json!({
                    "address": address,
                    "message": message,
                    "signature": format!("0x{}", hex::encode(signature)),
                })))
            }
            Command::Verify {
                address,
                message,
                signature,
            } => {
                let raw = hex::decode(signature.trim_start_matches("0x"))
                    .unwrap_or_default();
                let valid = verify_personal_message(&address, message.as_bytes(), &raw);
                Ok(Response::ok(json!({
                    "address": address,
                    "message": message,
                    "valid": valid,
                })))
            }
            Command::List => Ok(Response::ok(self.km.list_addresses())),

            // -- wallet registry --
            Command::CreateWallet { name, owner } => {
                let address = self.registry.create(name, owner)?;
                Ok(Response::ok(json!({ "address": address })))
            }
            Command::ListWallets => Ok(Response::ok(self.registry.list())),
            Command::WalletState { wallet_address } => {
                self.with_wallet(&wallet_address, |w| Ok(Response::ok(w.state())))
                    .await
            }

            // -- wallet ledger --
            Command::AddAsset {
                wallet_address,
                asset_id,
                token_type,
                contract_address,
                token_id,
                symbol,
                name,
                decimals,
            } => {
                let asset = Asset {
                    asset_id: asset_id.clone(),
                    token_type,
                    contract_address,
                    token_id,
                    symbol,
                    name,
                    decimals,
                };
                self.with_wallet(&wallet_address, move |w| {
                    w.add_asset(asset)?;
                    Ok(Response::ok(json!({ "asset_id": asset_id })))
                })
                .await
            }
            Command::ListAssets { wallet_address } => {
                self.with_wallet(&wallet_address, |w| Ok(Response::ok(w.assets())))
                    .await
            }
            Command::AddSubaccount {
                wallet_address,
                subaccount_id,
                label,
                address,
            } => {
                let subaccount = Subaccount {
                    subaccount_id: subaccount_id.clone(),
                    label,
                    address,
                };
                self.with_wallet(&wallet_address, move |w| {
                    w.add_subaccount(subaccount)?;
                    Ok(Response::ok(json!({ "subaccount_id": subaccount_id })))
                })
                .await
            }
            Command::InboxDeposit {
                wallet_address,
                asset_id,
                amount,
                deposit_id,
                transaction_hash,
                block_number,
                from_address,
                to_address,
            } => {
                let entry = InboxEntry {
                    deposit_id: deposit_id.clone(),
                    asset_id,
                    amount,
                    from_address,
                    to_address,
                    tx_hash: transaction_hash,
                    block_number,
                    claimed: false,
                };
                self.with_wallet(&wallet_address, move |w| {
                    w.record_deposit(entry)?;
                    Ok(Response::ok(json!({ "deposit_id": deposit_id })))
                })
                .await
            }
            Command::Claim {
                wallet_address,
                deposit_id,
                subaccount_id,
            } => {
                self.with_wallet(&wallet_address, move |w| {
                    w.claim(&deposit_id, &subaccount_id)?;
                    Ok(Response::ok(json!({
                        "deposit_id": deposit_id,
                        "subaccount_id": subaccount_id,
                    })))
                })
                .await
            }
            Command::Transfer {
                wallet_address,
                asset_id,
                amount,
                from_subaccount,
                to_subaccount,
            } => {
                self.with_wallet(&wallet_address, move |w| {
                    w.transfer(&from_subaccount, &to_subaccount, &asset_id, amount)?;
                    Ok(Response::ok(json!({
                        "asset_id": asset_id,
                        "amount": amount,
                        "from_subaccount": from_subaccount,
                        "to_subaccount": to_subaccount,
                    })))
                })
                .await
            }
            Command::Withdraw {
                wallet_address,
                asset_id,
                amount,
                subaccount_id,
                destination,
                chain_id,
                gas_price,
                gas_limit,
            } => {
                let km = self.km.clone();
                self.with_wallet(&wallet_address, move |w| {
                    let entry = w.withdraw(
                        &km,
                        &subaccount_id,
                        &asset_id,
                        amount,
                        destination,
                        chain_id,
                        gas_price,
                        gas_limit,
                    )?;
                    Ok(Response::ok(entry))
                })
                .await
            }
            Command::ListOutbox { wallet_address } => {
                self.with_wallet(&wallet_address, |w| Ok(Response::ok(w.outbox())))
                    .await
            }
            Command::RemoveOutbox {
                wallet_address,
                outbox_id,
            } => {
                self.with_wallet(&wallet_address, move |w| {
                    let removed = w.remove_outbox(outbox_id)?;
                    Ok(Response::ok(removed))
                })
                .await
            }
            Command::Balance {
                wallet_address,
                subaccount_id,
                asset_id,
            } => {
                self.with_wallet(&wallet_address, move |w| {
                    Ok(Response::ok(json!({
                        "subaccount_id": subaccount_id,
                        "asset_id": asset_id,
                        "balance": w.balance(&subaccount_id, &asset_id),
                    })))
                })
                .await
            }
            Command::SubaccountBalances {
                wallet_address,
                subaccount_id,
            } => {
                self.with_wallet(&wallet_address, move |w| {
                    let balances = w.balances_for_subaccount(&subaccount_id)?;
                    Ok(Response::ok(json!({
                        "subaccount_id": subaccount_id,
                        "balances": balances,
                    })))
                })
                .await
            }
            Command::SignGsm {
                wallet_address,
                domain,
                message,
            } => {
                let km = self.km.clone();
                self.with_wallet(&wallet_address, move |w| {
                    let signature = w.sign_gsm(&km, &domain, &message)?;
                    Ok(Response::ok(json!({
                        "address": w.address(),
                        "domain": domain,
                        "signature": signature,
                    })))
                })
                .await
            }
            Command::Provenance { wallet_address } => {
                self.provenance(&wallet_address, ProvenanceFilter::All).await
            }
            Command::ProvenanceByAsset {
                wallet_address,
                asset_id,
            } => {
                self.provenance(&wallet_address, ProvenanceFilter::ByAsset(asset_id))
                    .await
            }
            Command::ProvenanceBySubaccount {
                wallet_address,
                subaccount_id,
            } => {
                self.provenance(
                    &wallet_address,
                    ProvenanceFilter::BySubaccount(subaccount_id),
                )
                .await
            }
        }
    }

    async fn with_wallet<T>(
        &self,
        address: &EthAddress,
        f: impl FnOnce(&mut crate::ledger::Wallet) -> EnclaveResult<T>,
    ) -> EnclaveResult<T> {
        self.registry.with_wallet(address, f).await
    }

    async fn provenance(
        &self,
        address: &EthAddress,
        filter: ProvenanceFilter,
    ) -> EnclaveResult<Response> {
        self.with_wallet(address, move |w| Ok(Response::ok(w.provenance(&filter))))
            .await
    }
}
