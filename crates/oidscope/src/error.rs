//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use oidscope_config::ConfigError;
use oidscope_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not open a session to {target}")]
    #[diagnostic(
        code(oidscope::connection_failed),
        help("Check the address and port. Agents normally listen on UDP 161.")
    )]
    ConnectionFailed {
        target: String,
        #[source]
        source: CoreError,
    },

    #[error("No target given")]
    #[diagnostic(
        code(oidscope::no_target),
        help(
            "Pass --target HOST[:PORT], set OIDSCOPE_TARGET, or add a profile to\n\
             {path}"
        )
    )]
    NoTarget { path: String },

    // ── Credentials ──────────────────────────────────────────────────
    #[error("No credentials configured for profile '{profile}': {missing}")]
    #[diagnostic(
        code(oidscope::no_credentials),
        help("SNMPv3 needs --username, plus --auth-password / --priv-password for the chosen level.")
    )]
    NoCredentials { profile: String, missing: String },

    // ── Operations ───────────────────────────────────────────────────
    #[error("{status}")]
    #[diagnostic(code(oidscope::operation_failed))]
    OperationFailed { status: String },

    #[error("{status}")]
    #[diagnostic(
        code(oidscope::timeout),
        help("Increase --timeout / --retries, or check the community string: agents drop bad ones silently.")
    )]
    Timeout { status: String },

    #[error("Unknown object '{name}'")]
    #[diagnostic(
        code(oidscope::unknown_object),
        help("Use a numeric OID, or load extra definitions with --schema FILE.")
    )]
    UnknownObject { name: String },

    #[error("Table {table}: {reason}")]
    #[diagnostic(
        code(oidscope::schema),
        help("Run: oidscope resolve {table}")
    )]
    Schema { table: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(oidscope::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(oidscope::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(oidscope::config))]
    Config(ConfigError),

    #[error("Could not load schema {path}: {message}")]
    #[diagnostic(
        code(oidscope::invalid_schema),
        help("The file must be a YAML list of nodes with at least `name` and `oid`.")
    )]
    InvalidSchema { path: String, message: String },

    // ── Core ─────────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(oidscope::core))]
    Core(CoreError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not serialize output: {0}")]
    #[diagnostic(code(oidscope::json))]
    Json(#[from] serde_json::Error),

    #[error("Could not serialize output: {0}")]
    #[diagnostic(code(oidscope::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NoCredentials { .. } => exit_code::AUTH,
            Self::UnknownObject { .. } | Self::Schema { .. } | Self::ProfileNotFound { .. } => {
                exit_code::NOT_FOUND
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoTarget { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Schema { table, reason } => Self::Schema { table, reason },
            CoreError::InvalidProfile { message } => Self::Validation {
                field: "profile".into(),
                reason: message,
            },
            CoreError::Transport(oidscope_api::Error::InvalidOid { input, reason }) => {
                Self::Validation {
                    field: "OID".into(),
                    reason: format!("'{input}': {reason}"),
                }
            }
            CoreError::Transport(oidscope_api::Error::UnsupportedVersion(v)) => Self::Validation {
                field: "snmp-version".into(),
                reason: format!("expected 1, 2c or 3, got '{v}'"),
            },
            CoreError::Transport(oidscope_api::Error::Security(reason)) => Self::Validation {
                field: "SNMPv3 security".into(),
                reason,
            },
            other => Self::Core(other),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile, missing } => {
                Self::NoCredentials { profile, missing }
            }
            other => Self::Config(other),
        }
    }
}
