//! Configuration for the oidscope CLI.
//!
//! TOML device profiles plus `OIDSCOPE_` environment overrides, secret
//! resolution (env indirection, then plaintext), and translation to
//! `oidscope_core::SessionProfile` / `EngineConfig`. Profiles are only
//! ever read here; nothing writes the file back.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use oidscope_api::{
    AuthProtocol, Credentials, PrivProtocol, SecurityLevel, TransportConfig, UsmParams, Version,
};
use oidscope_core::{EngineConfig, SessionProfile};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("no credentials configured for profile '{profile}': {missing}")]
    NoCredentials { profile: String, missing: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default)]
    pub version: Version,

    #[serde(default = "default_community")]
    pub community: String,

    /// Seconds to wait for one response.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_max_repetitions")]
    pub max_repetitions: u32,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            version: Version::default(),
            community: default_community(),
            timeout: default_timeout(),
            retries: default_retries(),
            max_repetitions: default_max_repetitions(),
            batch_size: default_batch_size(),
            queue_capacity: default_queue_capacity(),
            history_capacity: default_history_capacity(),
        }
    }
}

fn default_community() -> String {
    "public".into()
}
fn default_timeout() -> u64 {
    2
}
fn default_retries() -> u32 {
    3
}
fn default_max_repetitions() -> u32 {
    50
}
fn default_batch_size() -> usize {
    100
}
fn default_queue_capacity() -> usize {
    8
}
fn default_history_capacity() -> usize {
    50
}

/// A named device profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Agent address, `host[:port]`.
    pub target: String,

    pub version: Option<Version>,

    /// Community string (plaintext; prefer `community_env`).
    pub community: Option<String>,

    /// Environment variable holding the community string.
    pub community_env: Option<String>,

    /// SNMPv3 security level. Inferred from the passwords when unset.
    pub security_level: Option<SecurityLevel>,

    /// SNMPv3 user name.
    pub username: Option<String>,

    pub auth_protocol: Option<AuthProtocol>,
    pub auth_password: Option<String>,
    pub auth_password_env: Option<String>,

    pub priv_protocol: Option<PrivProtocol>,
    pub priv_password: Option<String>,
    pub priv_password_env: Option<String>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Override retransmissions.
    pub retries: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "oidscope", "oidscope").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("oidscope");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file yields the defaults.
///
/// Environment overrides use `__` between levels, e.g.
/// `OIDSCOPE_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("OIDSCOPE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Profile resolution ──────────────────────────────────────────────

impl Config {
    /// Look up `name`, or the configured default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<Option<(&str, &Profile)>, ConfigError> {
        let Some(name) = name.or(self.default_profile.as_deref()) else {
            return Ok(None);
        };
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| Some((k.as_str(), p)))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

/// Build a `SessionProfile` from a named profile. Secrets come from the
/// `*_env` variable when set, else from the plaintext field.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SessionProfile, ConfigError> {
    resolve_profile_with(profile, profile_name, defaults, |name| std::env::var(name).ok())
}

fn resolve_profile_with(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    env: impl Fn(&str) -> Option<String>,
) -> Result<SessionProfile, ConfigError> {
    if profile.target.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "target".into(),
            reason: format!("profile '{profile_name}' has no target"),
        });
    }

    let version = profile.version.unwrap_or(defaults.version);
    let credentials = match version {
        Version::V1 | Version::V2c => {
            let community = secret(
                &env,
                profile.community_env.as_deref(),
                profile.community.as_deref(),
            )
            .unwrap_or_else(|| SecretString::from(defaults.community.clone()));
            Credentials::Community(community)
        }
        Version::V3 => Credentials::Usm(resolve_usm(profile, profile_name, &env)?),
    };

    Ok(SessionProfile::new(
        profile.target.clone(),
        version,
        credentials,
    ))
}

fn resolve_usm(
    profile: &Profile,
    profile_name: &str,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<UsmParams, ConfigError> {
    let missing = |what: &str| ConfigError::NoCredentials {
        profile: profile_name.into(),
        missing: what.into(),
    };

    let username = profile
        .username
        .clone()
        .ok_or_else(|| missing("username"))?;
    let auth_password = secret(
        env,
        profile.auth_password_env.as_deref(),
        profile.auth_password.as_deref(),
    );
    let priv_password = secret(
        env,
        profile.priv_password_env.as_deref(),
        profile.priv_password.as_deref(),
    );

    let level = profile.security_level.unwrap_or(match (&auth_password, &priv_password) {
        (Some(_), Some(_)) => SecurityLevel::AuthPriv,
        (Some(_), None) => SecurityLevel::AuthNoPriv,
        _ => SecurityLevel::NoAuthNoPriv,
    });
    if level != SecurityLevel::NoAuthNoPriv && auth_password.is_none() {
        return Err(missing("auth_password"));
    }
    if level == SecurityLevel::AuthPriv && priv_password.is_none() {
        return Err(missing("priv_password"));
    }

    Ok(UsmParams {
        level,
        auth_protocol: profile.auth_protocol.unwrap_or_default(),
        auth_password,
        priv_protocol: profile.priv_protocol.unwrap_or_default(),
        priv_password,
        ..UsmParams::new(username)
    })
}

/// `env_name` lookup first, then the plaintext value.
fn secret(
    env: &impl Fn(&str) -> Option<String>,
    env_name: Option<&str>,
    plain: Option<&str>,
) -> Option<SecretString> {
    env_name
        .and_then(env)
        .or_else(|| plain.map(str::to_owned))
        .map(SecretString::from)
}

/// Engine tuning from the defaults, with per-profile transport overrides.
pub fn engine_config(defaults: &Defaults, profile: Option<&Profile>) -> EngineConfig {
    let timeout = profile.and_then(|p| p.timeout).unwrap_or(defaults.timeout);
    let retries = profile.and_then(|p| p.retries).unwrap_or(defaults.retries);
    EngineConfig {
        batch_size: defaults.batch_size,
        queue_capacity: defaults.queue_capacity,
        history_capacity: defaults.history_capacity,
        max_repetitions: defaults.max_repetitions,
        transport: TransportConfig {
            timeout: Duration::from_secs(timeout),
            retries,
        },
    }
}
