//! Async SNMP protocol client for oidscope.
//!
//! This crate owns everything that touches the wire: identifier and
//! value types, credentials, and the [`Transport`] trait with its UDP
//! implementation [`SnmpClient`]. The operation engine in
//! `oidscope-core` is written against [`Transport`] only.
//!
//! SNMPv1 and v2c are always available. SNMPv3 (USM) is behind the `v3`
//! cargo feature.

pub mod client;
pub mod error;
pub mod oid;
pub mod security;
pub mod transport;
pub mod value;

pub use client::{ClientConfig, SnmpClient};
pub use error::Error;
pub use oid::Oid;
pub use security::{AuthProtocol, Credentials, PrivProtocol, SecurityLevel, UsmParams};
pub use transport::{Transport, TransportConfig, Version};
pub use value::{Value, VarBind};
