// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The off-chain ledger: per-wallet state, the claim/transfer/withdraw
//! state machine, the provenance log, and the registry that serializes
//! access to each wallet.

pub mod asset;
pub mod provenance;
pub mod registry;
pub mod wallet;

pub use asset::{Asset, TokenType};
pub use provenance::{Operation, ProvenanceFilter, ProvenanceRecord};
pub use registry::WalletRegistry;
pub use wallet::{AssetOverview, InboxEntry, OutboxEntry, Subaccount, Wallet, WalletState};
