// ── Core error types ──
//
// Errors surfaced by the operation engine. Session-state and schema
// problems are detected synchronously at the call boundary; protocol
// failures arrive later inside the operation's message and carry the
// client's text unchanged.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session state ────────────────────────────────────────────────
    #[error("not connected")]
    NotConnected,

    #[error("a walk is in progress")]
    WalkInProgress,

    /// Informational: the operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    // ── Protocol (verbatim) ──────────────────────────────────────────
    #[error(transparent)]
    Transport(#[from] oidscope_api::Error),

    // ── Schema ───────────────────────────────────────────────────────
    #[error("table {table}: {reason}")]
    Schema { table: String, reason: String },

    #[error("invalid schema definition: {message}")]
    InvalidSchema { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("invalid connection profile: {message}")]
    InvalidProfile { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The agent never answered.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("operation task failed: {err}"))
    }
}
