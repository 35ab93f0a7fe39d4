// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The provenance log: an append-only record of every balance-mutating
//! operation on a wallet.
//!
//! Sequence numbers are assigned under the wallet lock together with the
//! balance change itself, so replaying the log in `seq` order against the
//! same inbox contents reproduces the balance map exactly.

use serde::{Deserialize, Serialize};

use crate::eth::EthAddress;

/// One entry in a wallet's provenance log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// Strictly monotonic per wallet, starting at 0.
    pub seq: u64,
    /// Unix seconds at which the operation committed.
    pub timestamp: u64,
    /// Chain block associated with the operation, when one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<String>,
    pub operation: Operation,
}

/// The balance-mutating operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Claim {
        deposit_id: String,
        subaccount_id: String,
        asset_id: String,
        amount: u128,
    },
    Transfer {
        from_subaccount: String,
        to_subaccount: String,
        asset_id: String,
        amount: u128,
    },
    Withdraw {
        subaccount_id: String,
        asset_id: String,
        amount: u128,
        destination: EthAddress,
        nonce: u64,
        gas_price: u64,
        gas_limit: u64,
        chain_id: u64,
        signed_raw_transaction: String,
    },
}

impl Operation {
    /// The asset the operation moves.
    pub fn asset_id(&self) -> &str {
        match self {
            Operation::Claim { asset_id, .. }
            | Operation::Transfer { asset_id, .. }
            | Operation::Withdraw { asset_id, .. } => asset_id,
        }
    }

    /// Whether the operation references the sub-account as source,
    /// destination, claim target, or withdraw source.
    pub fn touches_subaccount(&self, id: &str) -> bool {
        match self {
            Operation::Claim { subaccount_id, .. } => subaccount_id == id,
            Operation::Transfer {
                from_subaccount,
                to_subaccount,
                ..
            } => from_subaccount == id || to_subaccount == id,
            Operation::Withdraw { subaccount_id, .. } => subaccount_id == id,
        }
    }
}

/// Selection applied to provenance queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvenanceFilter {
    All,
    ByAsset(String),
    BySubaccount(String),
}

impl ProvenanceFilter {
    /// Whether a record passes the filter.
    pub fn matches(&self, record: &ProvenanceRecord) -> bool {
        match self {
            ProvenanceFilter::All => true,
            ProvenanceFilter::ByAsset(asset_id) => record.operation.asset_id() == asset_id,
            ProvenanceFilter::BySubaccount(subaccount_id) => {
                record.operation.touches_subaccount(subaccount_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(operation: Operation) -> ProvenanceRecord {
        ProvenanceRecord {
            seq: 0,
            timestamp: 1_700_000_000,
            block_number: None,
            operation,
        }
    }

    #[test]
    fn transfer_matches_both_subaccounts() {
        let r = record(Operation::Transfer {
            from_subaccount: "main".into(),
            to_subaccount: "trade".into(),
            asset_id: "eth".into(),
            amount: 1,
        });
        assert!(ProvenanceFilter::BySubaccount("main".into()).matches(&r));
        assert!(ProvenanceFilter::BySubaccount("trade".into()).matches(&r));
        assert!(!ProvenanceFilter::BySubaccount("cold".into()).matches(&r));
    }

    #[test]
    fn asset_filter_matches_each_variant() {
        let claim = record(Operation::Claim {
            deposit_id: "d1".into(),
            subaccount_id: "main".into(),
            asset_id: "eth".into(),
            amount: 1,
        });
        let withdraw = record(Operation::Withdraw {
            subaccount_id: "main".into(),
            asset_id: "usdc".into(),
            amount: 1,
            destination: EthAddress::new([0u8; 20]),
            nonce: 0,
            gas_price: 1,
            gas_limit: 21_000,
            chain_id: 1,
            signed_raw_transaction: "0x00".into(),
        });

        let filter = ProvenanceFilter::ByAsset("eth".into());
        assert!(filter.matches(&claim));
        assert!(!filter.matches(&withdraw));
        assert!(ProvenanceFilter::All.matches(&withdraw));
    }
}
