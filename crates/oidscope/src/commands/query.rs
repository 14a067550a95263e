//! Single-shot GET and GETNEXT handlers.

use tokio::sync::mpsc::UnboundedReceiver;

use oidscope_core::{Explorer, Outcome};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{drive, util};

pub async fn get(
    explorer: &mut Explorer,
    outcomes: &mut UnboundedReceiver<Outcome>,
    oids: &[String],
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let oids = oids
        .iter()
        .map(|text| util::resolve_oid(explorer.schema().as_ref(), text))
        .collect::<Result<Vec<_>, _>>()?;

    let task = explorer.get(oids)?;
    drive(explorer, task, outcomes).await.result()?;
    print_current(explorer, global)
}

pub async fn next(
    explorer: &mut Explorer,
    outcomes: &mut UnboundedReceiver<Outcome>,
    oid: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let oid = util::resolve_oid(explorer.schema().as_ref(), oid)?;

    let task = explorer.get_next(oid)?;
    drive(explorer, task, outcomes).await.result()?;
    print_current(explorer, global)
}

fn print_current(explorer: &Explorer, global: &GlobalOpts) -> Result<(), CliError> {
    let results = explorer
        .history()
        .current()
        .map_or(&[][..], |group| group.results.as_slice());
    let out = output::render_results(global.output, results)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
