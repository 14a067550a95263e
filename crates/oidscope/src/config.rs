//! CLI configuration: thin wrapper around `oidscope_config`.
//!
//! Picks the active profile and lays `GlobalOpts` flag overrides over it
//! before handing it to the shared resolution.

use std::str::FromStr;

use oidscope_api::Version;
use oidscope_config::{Config, Profile, config_path, engine_config, resolve_profile};
use oidscope_core::{EngineConfig, SessionProfile};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use oidscope_config::load_config_or_default;

/// Name reported for a profile built purely from flags.
const FLAGS_PROFILE: &str = "(command line)";

/// Resolve the session to open and the engine tuning to use.
///
/// Flags beat the profile; the profile beats `[defaults]`.
pub fn build_session(
    global: &GlobalOpts,
    config: &Config,
) -> Result<(SessionProfile, EngineConfig), CliError> {
    let (name, mut profile) = match config.profile(global.profile.as_deref()) {
        Ok(Some((name, profile))) => (name.to_owned(), profile.clone()),
        Ok(None) => (FLAGS_PROFILE.to_owned(), Profile::default()),
        Err(_) => {
            let mut available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: global
                    .profile
                    .clone()
                    .or_else(|| config.default_profile.clone())
                    .unwrap_or_default(),
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
    };

    apply_overrides(&mut profile, global)?;
    if profile.target.trim().is_empty() {
        return Err(CliError::NoTarget {
            path: config_path().display().to_string(),
        });
    }

    let session = resolve_profile(&profile, &name, &config.defaults)?;
    let engine = engine_config(&config.defaults, Some(&profile));
    Ok((session, engine))
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(target) = &global.target {
        profile.target.clone_from(target);
    }
    if let Some(version) = &global.snmp_version {
        profile.version = Some(Version::from_str(version).map_err(|_| CliError::Validation {
            field: "snmp-version".into(),
            reason: format!("expected 1, 2c or 3, got '{version}'"),
        })?);
    }
    if let Some(community) = &global.community {
        profile.community = Some(community.clone());
        profile.community_env = None;
    }
    if let Some(username) = &global.username {
        profile.username = Some(username.clone());
    }
    if let Some(level) = &global.security_level {
        profile.security_level = Some(parse_flag("security-level", level)?);
    }
    if let Some(protocol) = &global.auth_protocol {
        profile.auth_protocol = Some(parse_flag("auth-protocol", protocol)?);
    }
    if let Some(password) = &global.auth_password {
        profile.auth_password = Some(password.clone());
        profile.auth_password_env = None;
    }
    if let Some(protocol) = &global.priv_protocol {
        profile.priv_protocol = Some(parse_flag("priv-protocol", protocol)?);
    }
    if let Some(password) = &global.priv_password {
        profile.priv_password = Some(password.clone());
        profile.priv_password_env = None;
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    if let Some(retries) = global.retries {
        profile.retries = Some(retries);
    }
    Ok(())
}

fn parse_flag<T: FromStr>(field: &str, value: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("unrecognised value '{value}'"),
    })
}
