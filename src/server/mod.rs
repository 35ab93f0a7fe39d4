// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The transport boundary: accept loop, per-connection workers, and frame
//! handling.
//!
//! Each connection gets its own task that reads framed JSON commands,
//! dispatches them, and writes framed responses. Commands on one
//! connection are handled in order; wallet-level ordering is enforced by
//! the registry locks, so concurrent connections are safe.
//!
//! Shutdown is cooperative: cancelling the token stops the accept loop
//! and stops workers between frames. A command that has already been
//! dispatched runs to completion, so cancellation never leaves a wallet
//! half-updated.

pub mod command;
pub mod dispatch;
pub mod framing;

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, Framing};
use crate::error::EnclaveError;

pub use command::{Command, Response};
pub use dispatch::Enclave;

/// Serve the enclave over loopback TCP until the token is cancelled.
pub async fn serve(
    config: &Config,
    enclave: Arc<Enclave>,
    shutdown: CancellationToken,
) -> io::Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", config.port)).await?;
    tracing::info!(
        port = listener.local_addr()?.port(),
        framing = ?config.framing,
        "enclave listening on loopback TCP"
    );
    serve_on(listener, config.framing, enclave, shutdown).await
}

/// Accept loop over an already bound listener.
///
/// Split out so tests can bind an ephemeral port themselves.
pub async fn serve_on(
    listener: TcpListener,
    framing: Framing,
    enclave: Arc<Enclave>,
    shutdown: CancellationToken,
) -> io::Result<()> {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("enclave shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                tracing::debug!(%peer, "connection accepted");
                tokio::spawn(handle_connection(
                    stream,
                    framing,
                    enclave.clone(),
                    shutdown.clone(),
                ));
            }
        }
    }
}

/// Serve the enclave over AF_VSOCK until the token is cancelled.
#[cfg(feature = "vsock")]
pub async fn serve_vsock(
    config: &Config,
    enclave: Arc<Enclave>,
    shutdown: CancellationToken,
) -> io::Result<()> {
    // Any-CID wildcard from the vsock address family.
    const VMADDR_CID_ANY: u32 = 0xffff_ffff;

    let listener = tokio_vsock::VsockListener::bind(tokio_vsock::VsockAddr::new(
        VMADDR_CID_ANY,
        config.vsock_port,
    ))?;
    tracing::info!(
        port = config.vsock_port,
        framing = ?config.framing,
        "enclave listening on vsock"
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("enclave shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                tracing::debug!(?peer, "connection accepted");
                tokio::spawn(handle_connection(
                    stream,
                    config.framing,
                    enclave.clone(),
                    shutdown.clone(),
                ));
            }
        }
    }
}

/// Serve one connection: read a frame, dispatch, answer, repeat.
async fn handle_connection<S>(
    stream: S,
    framing: Framing,
    enclave: Arc<Enclave>,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => return,
            frame = framing::read_frame(&mut reader, framing) => frame,
        };
        let frame = match frame {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "dropping connection on read error");
                return;
            }
        };

        // Decode errors still get an enveloped answer so the peer can
        // correlate requests to responses.
        let response = match serde_json::from_slice::<Command>(&frame) {
            Ok(command) => enclave.dispatch(command).await,
            Err(e) => Response::err(EnclaveError::InvalidCommand(e.to_string())),
        };

        let payload = match serde_json::to_vec(&response) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "response serialization failed");
                return;
            }
        };
        if let Err(e) = framing::write_frame(&mut write_half, framing, &payload).await {
            tracing::warn!(error = %e, "dropping connection on write error");
            return;
        }
    }
}
