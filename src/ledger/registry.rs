// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The wallet registry: address → ledger, plus the per-wallet locking
//! discipline.
//!
//! ## Locking
//!
//! The registry index is a `RwLock`ed map; `list` and `create` contend
//! only briefly. Each wallet owns its own fair async mutex, so commands
//! against different wallets run in parallel while commands against the
//! same wallet are served in arrival order. [`WalletRegistry::with_wallet`]
//! is the sole path to a wallet's state.
//!
//! Lock waits are bounded: when the configured timeout expires the caller
//! gets a timeout error and the wallet is untouched. A panic inside a
//! wallet's critical section marks that wallet poisoned; it is fail-stopped
//! for the rest of the process lifetime while other wallets keep working.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::{EnclaveError, EnclaveResult};
use crate::eth::EthAddress;
use crate::keys::KeyManager;

use super::wallet::Wallet;

/// One wallet behind its serialization lock.
struct WalletHandle {
    lock: Mutex<Wallet>,
    poisoned: AtomicBool,
}

/// Wallet handles plus their insertion order, so listings are
/// deterministic.
#[derive(Default)]
struct WalletIndex {
    by_address: HashMap<EthAddress, Arc<WalletHandle>>,
    order: Vec<EthAddress>,
}

/// Shared index of all wallets in the enclave.
pub struct WalletRegistry {
    km: Arc<KeyManager>,
    index: RwLock<WalletIndex>,
    lock_timeout: Duration,
}

impl WalletRegistry {
    pub fn new(km: Arc<KeyManager>, lock_timeout: Duration) -> Self {
        Self {
            km,
            index: RwLock::new(WalletIndex::default()),
            lock_timeout,
        }
    }

    /// Create a wallet: generate a key, install an empty ledger, return
    /// the new address.
    pub fn create(&self, name: String, owner: String) -> EnclaveResult<EthAddress> {
        let address = self.km.generate_account()?;
        let wallet = Wallet::new(address, name, owner);

        let mut index = self
            .index
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        index.by_address.insert(
            address,
            Arc::new(WalletHandle {
                lock: Mutex::new(wallet),
                poisoned: AtomicBool::new(false),
            }),
        );
        index.order.push(address);
        drop(index);

        tracing::info!(wallet = %address, "wallet created");
        Ok(address)
    }

    /// Wallet addresses in creation order.
    pub fn list(&self) -> Vec<EthAddress> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .clone()
    }

    /// Run `f` with exclusive access to the wallet's ledger.
    ///
    /// Acquisition waits at most the configured timeout; expiry returns a
    /// timeout error without touching state. Once `f` starts it runs to
    /// completion. A panic in `f` poisons the wallet.
    pub async fn with_wallet<T>(
        &self,
        address: &EthAddress,
        f: impl FnOnce(&mut Wallet) -> EnclaveResult<T>,
    ) -> EnclaveResult<T> {
        let handle = self.handle(address)?;
        if handle.poisoned.load(Ordering::Acquire) {
            return Err(EnclaveError::FatalWallet(address.to_string()));
        }

        let mut guard = tokio::time::timeout(self.lock_timeout, handle.lock.lock())
            .await
            .map_err(|_| EnclaveError::Timeout)?;

        // A holder may have poisoned the wallet while we waited.
        if handle.poisoned.load(Ordering::Acquire) {
            return Err(EnclaveError::FatalWallet(address.to_string()));
        }

        match panic::catch_unwind(AssertUnwindSafe(|| f(&mut guard))) {
            Ok(result) => result,
            Err(_) => {
                handle.poisoned.store(true, Ordering::Release);
                tracing::error!(
                    wallet = %address,
                    "wallet operation panicked; wallet is fail-stopped"
                );
                Err(EnclaveError::FatalWallet(address.to_string()))
            }
        }
    }

    fn handle(&self, address: &EthAddress) -> EnclaveResult<Arc<WalletHandle>> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_address
            .get(address)
            .cloned()
            .ok_or_else(|| EnclaveError::UnknownWallet(address.to_string()))
    }
}
