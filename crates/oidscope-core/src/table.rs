// ── Table reconstruction ──
//
// Column/index discovery from the schema, and a collector that places a
// walk's raw stream into rows keyed by instance suffix.

use indexmap::IndexMap;
use oidscope_api::oid::format_arcs;
use oidscope_api::{Oid, VarBind};
use serde::Serialize;

use crate::format::{format_value, format_varbind};
use crate::model::SnmpResult;
use crate::schema::{Schema, SchemaNode};

/// Shown in cells no value arrived for.
pub const PLACEHOLDER: &str = "-";

/// One output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableColumn {
    pub name: String,
    pub oid: Oid,
}

/// Ordered columns of a table plus the number of leading index columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub table: String,
    pub oid: Oid,
    pub columns: Vec<TableColumn>,
    pub index_cols: usize,
}

impl TableSchema {
    /// Index columns come first in INDEX-clause order, the rest follow in
    /// OID order. Only columns the table actually defines are counted as
    /// index columns; external indexes are skipped.
    pub fn build(schema: &dyn Schema, table: &SchemaNode) -> Self {
        let indexes = schema.effective_indexes(table);
        let defined = schema.columns(table);

        let mut columns: Vec<TableColumn> = indexes
            .iter()
            .filter_map(|name| defined.iter().find(|c| &c.name == name))
            .map(|c| TableColumn {
                name: c.name.clone(),
                oid: c.oid.clone(),
            })
            .collect();
        let index_cols = columns.len();

        columns.extend(
            defined
                .iter()
                .filter(|c| !indexes.contains(&c.name))
                .map(|c| TableColumn {
                    name: c.name.clone(),
                    oid: c.oid.clone(),
                }),
        );

        Self {
            table: table.name.clone(),
            oid: table.oid.clone(),
            columns,
            index_cols,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of the column whose OID is the longest prefix of `oid`.
    fn column_for(&self, oid: &Oid) -> Option<(usize, &TableColumn)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| oid.starts_with(&c.oid))
            .max_by_key(|(_, c)| c.oid.len())
    }
}

/// One reconstructed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    /// Instance suffix, e.g. `"3"` or `"10.0.0.1"`.
    pub key: String,
    pub cells: Vec<String>,
}

/// Finished table fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableData {
    pub name: String,
    pub columns: Vec<String>,
    pub index_cols: usize,
    pub rows: Vec<TableRow>,
    /// Every value the walk returned, formatted, in arrival order.
    #[serde(skip)]
    pub results: Vec<SnmpResult>,
}

/// Accumulates walk values into rows.
pub struct TableWalkCollector<'s> {
    layout: TableSchema,
    schema: &'s dyn Schema,
    rows: IndexMap<String, Vec<Option<String>>>,
    results: Vec<SnmpResult>,
}

impl<'s> TableWalkCollector<'s> {
    pub fn new(layout: TableSchema, schema: &'s dyn Schema) -> Self {
        Self {
            layout,
            schema,
            rows: IndexMap::new(),
            results: Vec::new(),
        }
    }

    /// Place one value. Values outside every known column are skipped.
    pub fn handle(&mut self, varbind: &VarBind) {
        self.results.push(format_varbind(varbind, self.schema));

        let Some((idx, column)) = self.layout.column_for(&varbind.oid) else {
            return;
        };
        let key = match varbind.oid.strip_prefix(&column.oid) {
            Some(suffix) if !suffix.is_empty() => format_arcs(suffix),
            _ => "0".to_owned(),
        };
        let node = self.schema.lookup(&column.oid);
        let text = format_value(&varbind.value, node, self.schema);

        let width = self.layout.columns.len();
        let cells = self.rows.entry(key).or_insert_with(|| vec![None; width]);
        if let Some(cell) = cells.get_mut(idx) {
            *cell = Some(text);
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows in first-seen order, unset cells filled with [`PLACEHOLDER`].
    pub fn finish(self) -> TableData {
        let rows = self
            .rows
            .into_iter()
            .map(|(key, cells)| TableRow {
                key,
                cells: cells
                    .into_iter()
                    .map(|c| c.unwrap_or_else(|| PLACEHOLDER.to_owned()))
                    .collect(),
            })
            .collect();
        TableData {
            name: self.layout.table.clone(),
            columns: self.layout.columns.iter().map(|c| c.name.clone()).collect(),
            index_cols: self.layout.index_cols,
            rows,
            results: self.results,
        }
    }
}
