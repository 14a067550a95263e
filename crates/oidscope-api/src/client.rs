// ── SNMP client ──
//
// UDP client on top of `snmp2::AsyncSession`. Every request is bounded
// by `TransportConfig::timeout` and retransmitted up to `retries` times;
// a non-zero error-status in the response PDU becomes `Error::Agent`.

use secrecy::ExposeSecret;
use tracing::{debug, trace};

use crate::error::Error;
use crate::oid::Oid;
use crate::security::Credentials;
use crate::transport::{Transport, TransportConfig, Version, parse_target};
use crate::value::{Value, VarBind};

/// Everything needed to open a session to one agent.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host[:port]`; port defaults to 161.
    pub target: String,
    pub version: Version,
    pub credentials: Credentials,
    pub transport: TransportConfig,
}

/// Connected SNMP client.
pub struct SnmpClient {
    session: Option<snmp2::AsyncSession>,
    target: String,
    version: Version,
    transport: TransportConfig,
}

#[derive(Clone, Copy)]
enum Request<'a> {
    Get(&'a snmp2::Oid<'a>),
    GetNext(&'a snmp2::Oid<'a>),
    GetBulk(&'a snmp2::Oid<'a>, u32),
}

impl SnmpClient {
    /// Open the UDP socket and, for v3, run engine discovery.
    pub async fn connect(config: &ClientConfig) -> Result<Self, Error> {
        let (host, port) = parse_target(&config.target);
        let addr = if host.contains(':') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };

        let session = match (config.version, &config.credentials) {
            (Version::V1, Credentials::Community(community)) => {
                snmp2::AsyncSession::new_v1(addr.as_str(), community.expose_secret().as_bytes(), 0)
                    .await?
            }
            (Version::V2c, Credentials::Community(community)) => {
                snmp2::AsyncSession::new_v2c(
                    addr.as_str(),
                    community.expose_secret().as_bytes(),
                    0,
                )
                .await?
            }
            (Version::V3, Credentials::Usm(usm)) => open_v3(addr.as_str(), usm).await?,
            (Version::V3, Credentials::Community(_)) => {
                return Err(Error::Security(
                    "SNMPv3 requires a USM username, not a community".into(),
                ));
            }
            (version, Credentials::Usm(_)) => {
                return Err(Error::Security(format!(
                    "USM credentials given for SNMP version {version}"
                )));
            }
        };

        debug!(target = %addr, version = %config.version, "SNMP session opened");
        Ok(Self {
            session: Some(session),
            target: addr,
            version: config.version,
            transport: config.transport.clone(),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    async fn send(&mut self, request: Request<'_>) -> Result<Vec<VarBind>, Error> {
        let attempts = self.transport.retries.saturating_add(1);
        let timeout = self.transport.timeout;

        for attempt in 1..=attempts {
            let session = self.session.as_mut().ok_or(Error::Closed)?;
            let response = tokio::time::timeout(timeout, async {
                match request {
                    Request::Get(oid) => session.get(oid).await,
                    Request::GetNext(oid) => session.getnext(oid).await,
                    Request::GetBulk(oid, max_reps) => session.getbulk(&[oid], 0, max_reps).await,
                }
            })
            .await;

            match response {
                Ok(Ok(pdu)) => {
                    if pdu.error_status != 0 {
                        return Err(Error::Agent {
                            status: pdu.error_status,
                            index: pdu.error_index,
                        });
                    }
                    let mut out = Vec::new();
                    for (oid, value) in pdu.varbinds {
                        out.push(VarBind::new(from_wire_oid(&oid)?, from_wire_value(value)));
                    }
                    trace!(count = out.len(), "response decoded");
                    return Ok(out);
                }
                Ok(Err(e)) => return Err(Error::Protocol(e.to_string())),
                Err(_) => {
                    debug!(target = %self.target, attempt, attempts, "request timed out");
                }
            }
        }

        Err(Error::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            attempts,
        })
    }
}

impl Transport for SnmpClient {
    /// Identifiers are requested one PDU at a time so a single bad OID
    /// reports its own error index; the first failure aborts the call.
    async fn get(&mut self, oids: &[Oid]) -> Result<Vec<VarBind>, Error> {
        let mut out = Vec::with_capacity(oids.len());
        for oid in oids {
            let wire = to_wire_oid(oid)?;
            out.extend(self.send(Request::Get(&wire)).await?);
        }
        Ok(out)
    }

    async fn get_next(&mut self, oid: &Oid) -> Result<Vec<VarBind>, Error> {
        let wire = to_wire_oid(oid)?;
        self.send(Request::GetNext(&wire)).await
    }

    async fn get_bulk(&mut self, oid: &Oid, max_repetitions: u32) -> Result<Vec<VarBind>, Error> {
        if !self.version.supports_bulk() {
            return Err(Error::UnsupportedVersion(format!(
                "GETBULK is not available on SNMP version {}",
                self.version
            )));
        }
        let wire = to_wire_oid(oid)?;
        self.send(Request::GetBulk(&wire, max_repetitions)).await
    }

    fn close(&mut self) {
        if self.session.take().is_some() {
            debug!(target = %self.target, "SNMP session closed");
        }
    }
}

// ── Wire conversion ─────────────────────────────────────────────────

fn to_wire_oid(oid: &Oid) -> Result<snmp2::Oid<'static>, Error> {
    let arcs: Vec<u64> = oid.arcs().iter().map(|&a| u64::from(a)).collect();
    snmp2::Oid::from(&arcs).map_err(|e| Error::InvalidOid {
        input: oid.to_string(),
        reason: format!("{e:?}"),
    })
}

fn from_wire_oid(oid: &snmp2::Oid<'_>) -> Result<Oid, Error> {
    oid.to_string().parse()
}

fn from_wire_value(value: snmp2::Value<'_>) -> Value {
    match value {
        snmp2::Value::Integer(n) => Value::Integer(n),
        snmp2::Value::OctetString(bytes) => Value::OctetString(bytes.to_vec()),
        snmp2::Value::ObjectIdentifier(oid) => match from_wire_oid(&oid) {
            Ok(oid) => Value::ObjectIdentifier(oid),
            Err(_) => Value::Other(oid.to_string()),
        },
        snmp2::Value::IpAddress(addr) => Value::IpAddress(addr),
        snmp2::Value::Counter32(n) => Value::Counter32(n),
        snmp2::Value::Unsigned32(n) => Value::Gauge32(n),
        snmp2::Value::Timeticks(n) => Value::TimeTicks(n),
        snmp2::Value::Opaque(bytes) => Value::Opaque(bytes.to_vec()),
        snmp2::Value::Counter64(n) => Value::Counter64(n),
        snmp2::Value::Null => Value::Null,
        snmp2::Value::NoSuchObject => Value::NoSuchObject,
        snmp2::Value::NoSuchInstance => Value::NoSuchInstance,
        snmp2::Value::EndOfMibView => Value::EndOfMibView,
        other => Value::Other(format!("{other:?}")),
    }
}

// ── SNMPv3 ──────────────────────────────────────────────────────────

#[cfg(feature = "v3")]
async fn open_v3(
    addr: &str,
    usm: &crate::security::UsmParams,
) -> Result<snmp2::AsyncSession, Error> {
    use crate::security::{AuthProtocol, PrivProtocol, SecurityLevel};
    use snmp2::v3;

    let secret = |s: Option<&secrecy::SecretString>| -> Vec<u8> {
        s.map(|s| s.expose_secret().as_bytes().to_vec())
            .unwrap_or_default()
    };
    let auth_password = secret(usm.auth_password.as_ref());

    let auth_protocol = match usm.auth_protocol {
        AuthProtocol::Md5 => v3::AuthProtocol::Md5,
        AuthProtocol::Sha => v3::AuthProtocol::Sha1,
        AuthProtocol::Sha224 => v3::AuthProtocol::Sha224,
        AuthProtocol::Sha256 => v3::AuthProtocol::Sha256,
        AuthProtocol::Sha384 => v3::AuthProtocol::Sha384,
        AuthProtocol::Sha512 => v3::AuthProtocol::Sha512,
    };
    let cipher = match usm.priv_protocol {
        PrivProtocol::Des => v3::Cipher::Des,
        PrivProtocol::Aes => v3::Cipher::Aes128,
        PrivProtocol::Aes192 => v3::Cipher::Aes192,
        PrivProtocol::Aes256 => v3::Cipher::Aes256,
    };
    let auth = match usm.level {
        SecurityLevel::NoAuthNoPriv => v3::Auth::NoAuthNoPriv,
        SecurityLevel::AuthNoPriv => v3::Auth::AuthNoPriv,
        SecurityLevel::AuthPriv => v3::Auth::AuthPriv {
            cipher,
            privacy_password: secret(usm.priv_password.as_ref()),
        },
    };

    let security = v3::Security::new(usm.username.as_bytes(), &auth_password)
        .with_auth_protocol(auth_protocol)
        .with_auth(auth);

    let mut session = snmp2::AsyncSession::new_v3(addr, 0, security).await?;
    session
        .init()
        .await
        .map_err(|e| Error::Security(format!("engine discovery failed: {e}")))?;
    Ok(session)
}

#[cfg(not(feature = "v3"))]
#[allow(clippy::unused_async)]
async fn open_v3(
    _addr: &str,
    _usm: &crate::security::UsmParams,
) -> Result<snmp2::AsyncSession, Error> {
    Err(Error::Security(
        "this build has no SNMPv3 support (enable the `v3` feature)".into(),
    ))
}
