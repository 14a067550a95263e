//! Walk handler: streams a subtree, then prints it flat or as a tree.

use tokio::sync::mpsc::UnboundedReceiver;

use oidscope_core::{Explorer, Outcome};

use crate::cli::{GlobalOpts, WalkArgs};
use crate::error::CliError;
use crate::output;

use super::{drive, util};

pub async fn handle(
    explorer: &mut Explorer,
    outcomes: &mut UnboundedReceiver<Outcome>,
    args: WalkArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let root = util::resolve_oid(explorer.schema().as_ref(), &args.oid)?;

    let task = explorer.walk(root)?;
    let finished = drive(explorer, task, outcomes).await;

    // Partial results are printed even when the walk failed.
    let results = explorer
        .history()
        .current()
        .map_or(&[][..], |group| group.results.as_slice());
    let out = match explorer.tree() {
        Some(tree) if args.tree => output::render_tree(
            global.output,
            tree,
            results,
            output::should_color(global.color),
        )?,
        _ => output::render_results(global.output, results)?,
    };
    output::print_output(&out, global.quiet);

    let outcome = finished.result()?;
    output::print_status(&outcome.status(), global.quiet);
    Ok(())
}
