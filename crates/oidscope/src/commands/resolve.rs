//! Offline name <-> OID translation.

use serde::Serialize;
use tabled::Tabled;

use oidscope_core::{Oid, Schema, resolve_name};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize, Tabled)]
struct Resolved {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "OID")]
    oid: Oid,
    #[tabled(rename = "Kind")]
    kind: String,
}

pub fn handle(schema: &dyn Schema, inputs: &[String], global: &GlobalOpts) -> Result<(), CliError> {
    let rows = inputs
        .iter()
        .map(|input| -> Result<Resolved, CliError> {
            let oid = util::resolve_oid(schema, input)?;
            let kind = schema
                .longest_prefix(&oid)
                .map_or_else(|| "-".to_owned(), |node| node.kind.to_string());
            Ok(Resolved {
                name: resolve_name(&oid, schema),
                oid,
                kind,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let out = output::render_list(global.output, &rows, |r| format!("{} = {}", r.name, r.oid))?;
    output::print_output(&out, global.quiet);
    Ok(())
}
