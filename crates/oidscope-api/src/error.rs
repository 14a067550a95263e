use thiserror::Error;

/// Top-level error type for the `oidscope-api` crate.
///
/// Covers every failure mode of the protocol client: socket I/O,
/// request timeouts, agent-reported error statuses, and malformed input.
/// `oidscope-core` wraps these verbatim so the text reaches the user unchanged.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Socket-level failure (bind, connect, send, receive).
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No response arrived within the configured timeout and retries.
    #[error("request timed out after {timeout_ms}ms ({attempts} attempts)")]
    Timeout { timeout_ms: u64, attempts: u32 },

    /// The transport was closed by a disconnect.
    #[error("transport is closed")]
    Closed,

    // ── Protocol ────────────────────────────────────────────────────
    /// The agent answered with a non-zero error-status.
    #[error("agent error: {} (index {index})", error_status_name(*.status))]
    Agent { status: u32, index: u32 },

    /// Encoding, decoding, or session-level failure reported by the SNMP stack.
    #[error("SNMP protocol error: {0}")]
    Protocol(String),

    /// A walk step returned an OID that does not sort after the previous one.
    #[error("OID not increasing: {oid}")]
    OidNotIncreasing { oid: String },

    // ── Input ───────────────────────────────────────────────────────
    /// Text could not be parsed as a dotted OID.
    #[error("invalid OID '{input}': {reason}")]
    InvalidOid { input: String, reason: String },

    /// Unknown or unsupported SNMP version string.
    #[error("unknown SNMP version: {0}")]
    UnsupportedVersion(String),

    /// SNMPv3 security parameters are invalid or unsupported by this build.
    #[error("SNMPv3 security error: {0}")]
    Security(String),
}

impl Error {
    /// Returns `true` when the agent reported `noSuchName` (SNMPv1 end of view).
    pub fn is_no_such_name(&self) -> bool {
        matches!(self, Self::Agent { status: 2, .. })
    }

    /// Returns `true` if this error came from a lost or late response.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// RFC 3416 error-status names.
pub fn error_status_name(status: u32) -> &'static str {
    match status {
        0 => "noError",
        1 => "tooBig",
        2 => "noSuchName",
        3 => "badValue",
        4 => "readOnly",
        5 => "genErr",
        6 => "noAccess",
        7 => "wrongType",
        8 => "wrongLength",
        9 => "wrongEncoding",
        10 => "wrongValue",
        11 => "noCreation",
        12 => "inconsistentValue",
        13 => "resourceUnavailable",
        14 => "commitFailed",
        15 => "undoFailed",
        16 => "authorizationError",
        17 => "notWritable",
        18 => "inconsistentName",
        _ => "unknownError",
    }
}
