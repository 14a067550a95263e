// ── Schema oracle ──
//
// The core never parses MIB sources. It asks a `Schema` for names,
// ancestry, table structure and value decorations (enumerations, BITS,
// display hints). `StaticSchema` is an in-memory implementation built
// from `SchemaNode` records, loadable from YAML.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use oidscope_api::Oid;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::CoreError;

/// Structural role of a schema node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    /// Plain registration point (`system`, `interfaces`).
    #[default]
    Node,
    Scalar,
    Table,
    Row,
    Column,
    Notification,
}

/// One named position in the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaNode {
    pub name: String,
    pub oid: Oid,
    #[serde(default)]
    pub kind: NodeKind,
    /// INTEGER enumeration labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub enums: BTreeMap<i64, String>,
    /// BITS labels by bit number (bit 0 is the MSB of the first octet).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bits: BTreeMap<u32, String>,
    /// RFC 2579 DISPLAY-HINT for OCTET STRING values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_hint: Option<String>,
    /// INDEX column names, on row nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index: Vec<String>,
    /// Name of the row this row AUGMENTS, on row nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub augments: Option<String>,
}

impl SchemaNode {
    pub fn new(name: impl Into<String>, oid: Oid, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            oid,
            kind,
            enums: BTreeMap::new(),
            bits: BTreeMap::new(),
            display_hint: None,
            index: Vec::new(),
            augments: None,
        }
    }
}

/// Read-only schema lookups used by formatting, tree grouping and table
/// reconstruction.
///
/// Implementors supply the four primitive lookups; the structural
/// helpers are derived from them.
pub trait Schema: Send + Sync {
    /// Node registered at exactly `oid`.
    fn lookup(&self, oid: &Oid) -> Option<&SchemaNode>;

    /// Deepest node whose OID is a prefix of (or equal to) `oid`.
    fn longest_prefix(&self, oid: &Oid) -> Option<&SchemaNode>;

    /// Node by name.
    fn find(&self, name: &str) -> Option<&SchemaNode>;

    /// Registered children of `node`, in OID order.
    fn children(&self, node: &SchemaNode) -> Vec<&SchemaNode>;

    /// Nearest registered ancestor.
    fn parent(&self, node: &SchemaNode) -> Option<&SchemaNode> {
        let mut oid = node.oid.parent()?;
        loop {
            if let Some(found) = self.lookup(&oid) {
                return Some(found);
            }
            oid = oid.parent()?;
        }
    }

    /// The conceptual row under a table node.
    fn row(&self, table: &SchemaNode) -> Option<&SchemaNode> {
        self.children(table)
            .into_iter()
            .find(|n| n.kind == NodeKind::Row)
    }

    /// Column nodes of a table, in OID order.
    fn columns(&self, table: &SchemaNode) -> Vec<&SchemaNode> {
        self.row(table)
            .map(|row| {
                self.children(row)
                    .into_iter()
                    .filter(|n| n.kind == NodeKind::Column)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// INDEX names of a table: the row's own, or those of the row it augments.
    fn effective_indexes(&self, table: &SchemaNode) -> Vec<String> {
        let Some(row) = self.row(table) else {
            return Vec::new();
        };
        if !row.index.is_empty() {
            return row.index.clone();
        }
        row.augments
            .as_deref()
            .and_then(|name| self.find(name))
            .map(|base| base.index.clone())
            .unwrap_or_default()
    }

    /// The table a table, row or column node belongs to.
    fn resolve_table<'a>(&'a self, node: &'a SchemaNode) -> Option<&'a SchemaNode> {
        match node.kind {
            NodeKind::Table => Some(node),
            NodeKind::Row => self.parent(node).filter(|t| t.kind == NodeKind::Table),
            NodeKind::Column => self
                .parent(node)
                .and_then(|row| self.parent(row))
                .filter(|t| t.kind == NodeKind::Table),
            _ => None,
        }
    }
}

// ── StaticSchema ─────────────────────────────────────────────────────

/// In-memory schema keyed by OID.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    nodes: BTreeMap<Oid, SchemaNode>,
    by_name: HashMap<String, Oid>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from node records. A later record for the same OID wins.
    pub fn from_nodes(nodes: impl IntoIterator<Item = SchemaNode>) -> Self {
        let mut schema = Self::new();
        for node in nodes {
            schema.insert(node);
        }
        schema
    }

    /// Parse a YAML sequence of node records.
    pub fn from_yaml(text: &str) -> Result<Self, CoreError> {
        let nodes: Vec<SchemaNode> =
            serde_yaml::from_str(text).map_err(|e| CoreError::InvalidSchema {
                message: e.to_string(),
            })?;
        Ok(Self::from_nodes(nodes))
    }

    /// The bundled MIB-2 subset: `system`, `interfaces` and `ifXTable`.
    pub fn mib2() -> Result<Self, CoreError> {
        Self::from_yaml(include_str!("mib2.yaml"))
    }

    pub fn insert(&mut self, node: SchemaNode) {
        self.by_name.insert(node.name.clone(), node.oid.clone());
        self.nodes.insert(node.oid.clone(), node);
    }

    /// Merge another schema into this one.
    pub fn extend(&mut self, other: StaticSchema) {
        for node in other.nodes.into_values() {
            self.insert(node);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Schema for StaticSchema {
    fn lookup(&self, oid: &Oid) -> Option<&SchemaNode> {
        self.nodes.get(oid)
    }

    fn longest_prefix(&self, oid: &Oid) -> Option<&SchemaNode> {
        let arcs = oid.arcs();
        (1..=arcs.len())
            .rev()
            .find_map(|len| arcs.get(..len).and_then(|p| self.nodes.get(&Oid::from(p))))
    }

    fn find(&self, name: &str) -> Option<&SchemaNode> {
        self.by_name.get(name).and_then(|oid| self.nodes.get(oid))
    }

    fn children(&self, node: &SchemaNode) -> Vec<&SchemaNode> {
        let depth = node.oid.len() + 1;
        self.nodes
            .range((Bound::Excluded(&node.oid), Bound::Unbounded))
            .take_while(|(oid, _)| oid.starts_with(&node.oid))
            .filter(|(oid, _)| oid.len() == depth)
            .map(|(_, n)| n)
            .collect()
    }
}
