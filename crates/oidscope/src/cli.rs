//! Clap derive structures for the `oidscope` CLI.
//!
//! Defines the command tree and global flags. Kept free of workspace
//! types so the build script can include it for man page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// oidscope -- query SNMP agents and reconstruct what they return
#[derive(Debug, Parser)]
#[command(
    name = "oidscope",
    version,
    about = "Query SNMP agents from the command line",
    long_about = "Issue GET, GETNEXT, walks and table fetches against an SNMP agent\n\
        and show the results as a list, a tree grouped by MIB ancestry,\n\
        or a reconstructed table.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Device profile to use
    #[arg(long, short = 'p', env = "OIDSCOPE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Agent address, host[:port] (overrides profile)
    #[arg(long, short = 't', env = "OIDSCOPE_TARGET", global = true)]
    pub target: Option<String>,

    /// SNMP version: 1, 2c or 3
    #[arg(long = "snmp-version", env = "OIDSCOPE_SNMP_VERSION", global = true)]
    pub snmp_version: Option<String>,

    /// Community string for v1/v2c
    #[arg(long, short = 'c', env = "OIDSCOPE_COMMUNITY", global = true, hide_env_values = true)]
    pub community: Option<String>,

    /// SNMPv3 user name
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// SNMPv3 security level: noAuthNoPriv, authNoPriv or authPriv
    #[arg(long, global = true)]
    pub security_level: Option<String>,

    /// SNMPv3 authentication protocol (MD5, SHA, SHA224 .. SHA512)
    #[arg(long, global = true)]
    pub auth_protocol: Option<String>,

    /// SNMPv3 authentication passphrase
    #[arg(long, env = "OIDSCOPE_AUTH_PASSWORD", global = true, hide_env_values = true)]
    pub auth_password: Option<String>,

    /// SNMPv3 privacy protocol (DES, AES, AES192, AES256)
    #[arg(long, global = true)]
    pub priv_protocol: Option<String>,

    /// SNMPv3 privacy passphrase
    #[arg(long, env = "OIDSCOPE_PRIV_PASSWORD", global = true, hide_env_values = true)]
    pub priv_password: Option<String>,

    /// Seconds to wait for each response
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Retransmissions after the first attempt
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Extra MIB node definitions (YAML), merged over the bundled MIB-2 subset
    #[arg(long, env = "OIDSCOPE_SCHEMA", global = true)]
    pub schema: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "OIDSCOPE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, `name = value` per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one or more objects
    Get {
        /// Numeric OIDs or MIB names, e.g. sysDescr.0 or 1.3.6.1.2.1.1.5.0
        #[arg(required = true)]
        oids: Vec<String>,
    },

    /// Fetch the object following an OID
    #[command(alias = "getnext")]
    Next {
        /// Numeric OID or MIB name
        oid: String,
    },

    /// Enumerate every object below an OID
    Walk(WalkArgs),

    /// Fetch a table and show it as rows and columns
    Table {
        /// Table, row or column name, e.g. ifTable
        name: String,
    },

    /// Translate between MIB names and numeric OIDs (no device needed)
    Resolve {
        /// Names or numeric OIDs
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct WalkArgs {
    /// Numeric OID or MIB name to walk below
    pub oid: String,

    /// Group results by MIB ancestry instead of a flat list
    #[arg(long)]
    pub tree: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
