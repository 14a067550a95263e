//! Command dispatch: bridges CLI args -> explorer operations -> output formatting.

pub mod query;
pub mod resolve;
pub mod table;
pub mod util;
pub mod walk;

use std::pin::pin;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, trace};

use oidscope_core::{CoreError, Explorer, Outcome, Task, WalkState};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an agent-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    explorer: &mut Explorer,
    outcomes: &mut UnboundedReceiver<Outcome>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Get { oids } => query::get(explorer, outcomes, &oids, global).await,
        Command::Next { oid } => query::next(explorer, outcomes, &oid, global).await,
        Command::Walk(args) => walk::handle(explorer, outcomes, args, global).await,
        Command::Table { name } => table::handle(explorer, outcomes, &name, global).await,
        // Resolve and Completions are handled before dispatch
        Command::Resolve { .. } | Command::Completions(_) => unreachable!(),
    }
}

// ── Driving tasks ────────────────────────────────────────────────────

/// How a dispatched operation ended.
pub struct Finished {
    last: Option<Outcome>,
    timed_out: bool,
}

impl Finished {
    /// The terminal outcome, or the error it stands for.
    pub fn result(self) -> Result<Outcome, CliError> {
        let failed = |status: String| {
            if self.timed_out {
                CliError::Timeout { status }
            } else {
                CliError::OperationFailed { status }
            }
        };
        match self.last {
            Some(outcome @ Outcome::Failed { .. }) => Err(failed(outcome.status())),
            Some(Outcome::WalkFinished {
                status,
                state: WalkState::Failed,
                ..
            }) => Err(failed(status)),
            Some(outcome) => Ok(outcome),
            None => Err(CliError::OperationFailed {
                status: "operation produced no result".into(),
            }),
        }
    }
}

/// Run `task` and every follow-up the explorer schedules until the
/// operation settles. Ctrl-C cancels a running walk; whatever arrived
/// before the cancel is kept.
pub async fn drive(
    explorer: &mut Explorer,
    task: Task,
    outcomes: &mut UnboundedReceiver<Outcome>,
) -> Finished {
    let mut ctrl_c = pin!(tokio::signal::ctrl_c());
    let mut interrupted = false;
    let mut timed_out = false;
    let mut next = Some(task);

    while let Some(mut task) = next {
        let message = tokio::select! {
            biased;
            message = &mut task => message,
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if explorer.cancel_walk() {
                    info!("interrupted, cancelling walk");
                }
                task.await
            }
        };
        timed_out |= message.error().is_some_and(CoreError::is_timeout);
        next = explorer.update(message);
    }

    let mut last = None;
    while let Ok(outcome) = outcomes.try_recv() {
        match &outcome {
            Outcome::WalkBatch { count, total } => trace!(count, total, "walk batch"),
            other => debug!(status = %other.status(), "outcome"),
        }
        last = Some(outcome);
    }
    Finished { last, timed_out }
}
