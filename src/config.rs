// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values, and the
//! [`Config`] loader used at process start.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ENCLAVE_SECRET` | Seed for the key-encryption key | Required |
//! | `HTTP_PORT` | Loopback TCP port for the command socket | `5000` |
//! | `VSOCK_PORT` | vsock port (builds with the `vsock` feature) | `7777` |
//! | `ENCLAVE_FRAMING` | Frame encoding (`newline` or `length`) | `newline` |
//! | `LOCK_TIMEOUT_SECS` | Upper bound on per-wallet lock waits | `5` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable holding the key-encryption-key seed.
///
/// The 256-bit KEK is derived from this value once at startup; every
/// private key at rest is encrypted under it. The process refuses to
/// start without it.
pub const ENCLAVE_SECRET_ENV: &str = "ENCLAVE_SECRET";

/// Environment variable for the loopback TCP port.
pub const HTTP_PORT_ENV: &str = "HTTP_PORT";

/// Environment variable for the vsock port.
pub const VSOCK_PORT_ENV: &str = "VSOCK_PORT";

/// Environment variable selecting the frame encoding.
pub const FRAMING_ENV: &str = "ENCLAVE_FRAMING";

/// Environment variable bounding per-wallet lock waits, in seconds.
pub const LOCK_TIMEOUT_ENV: &str = "LOCK_TIMEOUT_SECS";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default loopback TCP port.
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// Default vsock port.
pub const DEFAULT_VSOCK_PORT: u32 = 7777;

/// Default bound on per-wallet lock waits.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Frame encoding for the command socket.
///
/// Both encodings carry one JSON object per frame; only the delimiting
/// differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One JSON object per `\n`-terminated line.
    Newline,
    /// A little-endian `u64` byte length followed by the JSON payload.
    LengthPrefixed,
}

impl FromStr for Framing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newline" => Ok(Framing::Newline),
            "length" => Ok(Framing::LengthPrefixed),
            _ => Err(ConfigError::Invalid {
                var: FRAMING_ENV,
                value: s.to_string(),
            }),
        }
    }
}

/// Errors raised while loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Resolved runtime configuration.
#[derive(Clone)]
pub struct Config {
    /// KEK seed. Never logged.
    pub secret: String,
    /// Loopback TCP bind port.
    pub port: u16,
    /// vsock bind port (used by the `vsock` build).
    pub vsock_port: u32,
    /// Frame encoding for the command socket.
    pub framing: Framing,
    /// Upper bound on per-wallet lock waits.
    pub lock_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = env::var(ENCLAVE_SECRET_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing(ENCLAVE_SECRET_ENV))?;

        Ok(Self {
            secret,
            port: parse_var(HTTP_PORT_ENV, DEFAULT_HTTP_PORT)?,
            vsock_port: parse_var(VSOCK_PORT_ENV, DEFAULT_VSOCK_PORT)?,
            framing: parse_var(FRAMING_ENV, Framing::Newline)?,
            lock_timeout: Duration::from_secs(parse_var(
                LOCK_TIMEOUT_ENV,
                DEFAULT_LOCK_TIMEOUT.as_secs(),
            )?),
        })
    }
}

// The secret must never reach logs, so Debug is written by hand.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("secret", &"<redacted>")
            .field("port", &self.port)
            .field("vsock_port", &self.vsock_port)
            .field("framing", &self.framing)
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}

/// Read an env var, falling back to `default` when unset or empty.
fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.is_empty() => {
            value.parse().map_err(|_| ConfigError::Invalid {
                var,
                value,
            })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_parses_both_encodings() {
        assert_eq!("newline".parse::<Framing>().unwrap(), Framing::Newline);
        assert_eq!("length".parse::<Framing>().unwrap(), Framing::LengthPrefixed);
        assert_eq!("LENGTH".parse::<Framing>().unwrap(), Framing::LengthPrefixed);
        assert!("http".parse::<Framing>().is_err());
    }

    #[test]
    fn debug_redacts_the_secret() {
        let config = Config {
            secret: "super-secret".into(),
            port: DEFAULT_HTTP_PORT,
            vsock_port: DEFAULT_VSOCK_PORT,
            framing: Framing::Newline,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
