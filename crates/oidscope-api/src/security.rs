// ── Credentials ──
//
// Community strings for v1/v2c and User-based Security Model parameters
// for v3. Secrets stay wrapped in `SecretString` until the moment they
// are handed to the wire session.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// USM security level.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum SecurityLevel {
    #[default]
    #[strum(serialize = "noAuthNoPriv")]
    #[serde(rename = "noAuthNoPriv")]
    NoAuthNoPriv,
    #[strum(serialize = "authNoPriv")]
    #[serde(rename = "authNoPriv")]
    AuthNoPriv,
    #[strum(serialize = "authPriv")]
    #[serde(rename = "authPriv")]
    AuthPriv,
}

/// USM authentication digest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthProtocol {
    #[strum(serialize = "MD5")]
    Md5,
    #[default]
    #[strum(serialize = "SHA", serialize = "SHA1")]
    Sha,
    #[strum(serialize = "SHA224")]
    Sha224,
    #[strum(serialize = "SHA256")]
    Sha256,
    #[strum(serialize = "SHA384")]
    Sha384,
    #[strum(serialize = "SHA512")]
    Sha512,
}

/// USM privacy cipher.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrivProtocol {
    #[strum(serialize = "DES")]
    Des,
    #[default]
    #[strum(serialize = "AES", serialize = "AES128")]
    Aes,
    #[strum(serialize = "AES192")]
    Aes192,
    #[strum(serialize = "AES256")]
    Aes256,
}

/// SNMPv3 user credentials.
#[derive(Debug, Clone)]
pub struct UsmParams {
    pub username: String,
    pub level: SecurityLevel,
    pub auth_protocol: AuthProtocol,
    pub auth_password: Option<SecretString>,
    pub priv_protocol: PrivProtocol,
    pub priv_password: Option<SecretString>,
}

impl UsmParams {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            level: SecurityLevel::NoAuthNoPriv,
            auth_protocol: AuthProtocol::default(),
            auth_password: None,
            priv_protocol: PrivProtocol::default(),
            priv_password: None,
        }
    }
}

/// What the client presents to the agent.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// v1 / v2c community string.
    Community(SecretString),
    /// v3 USM user.
    Usm(UsmParams),
}

impl Default for Credentials {
    fn default() -> Self {
        Self::Community(SecretString::from("public"))
    }
}
