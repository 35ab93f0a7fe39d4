// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key custody: generation, at-rest encryption, and signing.
//!
//! Private keys exist in plaintext only inside sign and generate
//! operations, in zeroized buffers. Everything stored or surfaced is
//! either a public address or an AEAD-sealed blob.

mod manager;
mod sealed;

pub use manager::{personal_message_digest, verify_personal_message, KeyManager};
pub use sealed::{KeyCipher, SealedKey};
