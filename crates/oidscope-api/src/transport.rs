// Shared transport abstraction.
//
// `Transport` is the seam between the operation engine and the wire:
// the engine only ever asks for GET / GETNEXT / GETBULK round-trips and
// never touches encoding. `SnmpClient` is the production implementation;
// tests plug in their own.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::oid::Oid;
use crate::value::VarBind;

/// SNMP protocol revision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Version {
    #[serde(rename = "1")]
    V1,
    #[default]
    #[serde(rename = "2c")]
    V2c,
    #[serde(rename = "3")]
    V3,
}

impl Version {
    /// GETBULK exists from SNMPv2 onwards.
    pub fn supports_bulk(self) -> bool {
        !matches!(self, Self::V1)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(Self::V1),
            "2c" | "v2c" | "2" => Ok(Self::V2c),
            "3" | "v3" => Ok(Self::V3),
            other => Err(Error::UnsupportedVersion(other.to_owned())),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::V1 => "1",
            Self::V2c => "2c",
            Self::V3 => "3",
        })
    }
}

/// Per-request timing for the UDP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// How long to wait for one response before retransmitting.
    pub timeout: Duration,
    /// Retransmissions after the first attempt.
    pub retries: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            retries: 3,
        }
    }
}

impl TransportConfig {
    /// Upper bound for one request including every retransmission.
    pub fn request_deadline(&self) -> Duration {
        self.timeout.saturating_mul(self.retries.saturating_add(1))
    }
}

/// Split `host[:port]` into its parts, defaulting to port 161.
///
/// Bracketed IPv6 (`[::1]:1161`) is understood; a bare IPv6 literal is
/// taken as a host without a port.
pub fn parse_target(target: &str) -> (String, u16) {
    const DEFAULT_PORT: u16 = 161;
    let target = target.trim();

    if let Some(rest) = target.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail
                .strip_prefix(':')
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT);
            return (host.to_owned(), port);
        }
    }

    if target.matches(':').count() == 1 {
        if let Some((host, port)) = target.split_once(':') {
            if let Ok(port) = port.parse() {
                return (host.to_owned(), port);
            }
            return (host.to_owned(), DEFAULT_PORT);
        }
    }

    (target.to_owned(), DEFAULT_PORT)
}

/// Request primitives the operation engine needs from a protocol client.
///
/// Every method performs exactly one logical request and returns the
/// decoded variable bindings in wire order. Implementations decide how
/// to time out and retransmit; callers never retry.
pub trait Transport: Send + 'static {
    /// GET one or more identifiers. Any failure fails the whole request.
    fn get(&mut self, oids: &[Oid]) -> impl Future<Output = Result<Vec<VarBind>, Error>> + Send;

    /// GETNEXT: the lexicographic successor of `oid`.
    fn get_next(&mut self, oid: &Oid) -> impl Future<Output = Result<Vec<VarBind>, Error>> + Send;

    /// GETBULK with zero non-repeaters starting after `oid`.
    fn get_bulk(
        &mut self,
        oid: &Oid,
        max_repetitions: u32,
    ) -> impl Future<Output = Result<Vec<VarBind>, Error>> + Send;

    /// Release the socket. Further requests fail with [`Error::Closed`].
    fn close(&mut self);
}
