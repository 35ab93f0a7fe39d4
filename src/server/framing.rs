// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Frame encoding for the command socket.
//!
//! Both encodings carry exactly one JSON document per frame:
//!
//! - **Newline**: the document followed by `\n`. Serialized commands and
//!   responses are compact JSON and never contain raw newlines.
//! - **Length-prefixed**: a little-endian `u64` byte count followed by the
//!   document.
//!
//! Frames above [`MAX_FRAME_LEN`] are rejected, so a misbehaving peer
//! cannot make the enclave buffer unbounded input.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Framing;

/// Upper bound on a single frame, in bytes.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Read one frame. `Ok(None)` means the peer closed the stream cleanly
/// between frames.
pub async fn read_frame<R>(reader: &mut R, framing: Framing) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    match framing {
        Framing::Newline => loop {
            let mut line = Vec::new();
            let mut limited = (&mut *reader).take(MAX_FRAME_LEN as u64 + 1);
            let read = limited.read_until(b'\n', &mut line).await?;
            if read == 0 {
                return Ok(None);
            }
            if line.len() > MAX_FRAME_LEN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "frame exceeds maximum length",
                ));
            }
            while matches!(line.last(), Some(b'\n') | Some(b'\r')) {
                line.pop();
            }
            if !line.is_empty() {
                return Ok(Some(line));
            }
            // blank keep-alive line; keep reading
        },
        Framing::LengthPrefixed => {
            let len = match reader.read_u64_le().await {
                Ok(len) => len,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(e),
            };
            if len as usize > MAX_FRAME_LEN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "frame exceeds maximum length",
                ));
            }
            let mut payload = vec![0u8; len as usize];
            reader.read_exact(&mut payload).await?;
            Ok(Some(payload))
        }
    }
}

/// Write one frame and flush it.
pub async fn write_frame<W>(
    writer: &mut W,
    framing: Framing,
    payload: &[u8],
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match framing {
        Framing::Newline => {
            writer.write_all(payload).await?;
            writer.write_all(b"\n").await?;
        }
        Framing::LengthPrefixed => {
            writer.write_u64_le(payload.len() as u64).await?;
            writer.write_all(payload).await?;
        }
    }
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, BufReader};

    #[tokio::test]
    async fn newline_frames_round_trip() {
        let (mut client, server) = duplex(4096);
        let mut reader = BufReader::new(server);

        write_frame(&mut client, Framing::Newline, br#"{"List":null}"#)
            .await
            .unwrap();
        write_frame(&mut client, Framing::Newline, b"second")
            .await
            .unwrap();
        drop(client);

        let first = read_frame(&mut reader, Framing::Newline).await.unwrap();
        assert_eq!(first.as_deref(), Some(br#"{"List":null}"#.as_slice()));
        let second = read_frame(&mut reader, Framing::Newline).await.unwrap();
        assert_eq!(second.as_deref(), Some(b"second".as_slice()));
        assert!(read_frame(&mut reader, Framing::Newline)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn length_prefixed_frames_round_trip() {
        let (mut client, server) = duplex(4096);
        let mut reader = BufReader::new(server);

        let payload = br#"{"Keygen":null}"#;
        write_frame(&mut client, Framing::LengthPrefixed, payload)
            .await
            .unwrap();
        drop(client);

        let frame = read_frame(&mut reader, Framing::LengthPrefixed)
            .await
            .unwrap();
        assert_eq!(frame.as_deref(), Some(payload.as_slice()));
        assert!(read_frame(&mut reader, Framing::LengthPrefixed)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let (mut client, server) = duplex(4096);
        let mut reader = BufReader::new(server);

        client.write_all(b"\r\n\npayload\n").await.unwrap();
        drop(client);

        let frame = read_frame(&mut reader, Framing::Newline).await.unwrap();
        assert_eq!(frame.as_deref(), Some(b"payload".as_slice()));
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected() {
        let (mut client, server) = duplex(4096);
        let mut reader = BufReader::new(server);

        client
            .write_u64_le((MAX_FRAME_LEN as u64) + 1)
            .await
            .unwrap();

        let result = read_frame(&mut reader, Framing::LengthPrefixed).await;
        assert!(result.is_err());
    }
}
