//! Table handler.

use tokio::sync::mpsc::UnboundedReceiver;

use oidscope_core::{Explorer, Outcome};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::drive;

pub async fn handle(
    explorer: &mut Explorer,
    outcomes: &mut UnboundedReceiver<Outcome>,
    name: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let task = explorer.fetch_table(name)?;
    let outcome = drive(explorer, task, outcomes).await.result()?;

    if let Some(data) = explorer.table() {
        let out = output::render_table_data(global.output, data)?;
        output::print_output(&out, global.quiet);
    }
    output::print_status(&outcome.status(), global.quiet);
    Ok(())
}
