// ── Display-side result types ──

use oidscope_api::Oid;
use serde::Serialize;
use strum::{Display, EnumString};

/// One formatted result as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnmpResult {
    pub oid: Oid,
    /// Resolved schema name plus instance suffix, or the numeric OID.
    pub name: String,
    pub value: String,
    /// Protocol type label, e.g. `"Counter32"`.
    pub type_name: String,
}

/// Operation kind that produced a [`ResultGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OpKind {
    Get,
    #[strum(serialize = "GETNEXT")]
    #[serde(rename = "GETNEXT")]
    GetNext,
    Walk,
    Table,
}

/// The outcome of one operation.
///
/// Only mutable while `in_progress` is set, i.e. while its walk streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultGroup {
    pub op: OpKind,
    pub label: String,
    pub results: Vec<SnmpResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Root used to group walk results into a tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub walk_root: Option<Oid>,
    pub in_progress: bool,
}

impl ResultGroup {
    /// A finished group.
    pub fn completed(op: OpKind, label: impl Into<String>, results: Vec<SnmpResult>) -> Self {
        Self {
            op,
            label: label.into(),
            results,
            error: None,
            walk_root: None,
            in_progress: false,
        }
    }

    /// A finished group that only carries an error.
    pub fn failed(op: OpKind, label: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::completed(op, label, Vec::new())
        }
    }

    /// An empty walk group that will receive streamed batches.
    pub fn streaming(label: impl Into<String>, root: Oid) -> Self {
        Self {
            walk_root: Some(root),
            in_progress: true,
            ..Self::completed(OpKind::Walk, label, Vec::new())
        }
    }
}
