// ── Explorer ──
//
// Consumer-side orchestrator. Dispatchers validate the session, start an
// operation and hand back a `Task`; the caller awaits it and feeds the
// resulting `Message` into `update`, which stores the outcome and
// reports it on the outcome channel. A running walk keeps returning a
// follow-up pull task until its terminal event arrives.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use oidscope_api::{Oid, SnmpClient, Transport, VarBind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::{EngineConfig, SessionProfile};
use crate::error::CoreError;
use crate::format::format_varbind;
use crate::model::{OpKind, ResultGroup, SnmpResult};
use crate::schema::Schema;
use crate::session::{self, Session};
use crate::store::ResultHistory;
use crate::table::TableData;
use crate::tree::ResultTree;
use crate::walk::{WalkEvent, WalkHandle, WalkOutcome, WalkPulled, WalkState};

/// A pending operation. Resolves to the message to feed back into
/// [`Explorer::update`].
pub type Task = BoxFuture<'static, Message>;

/// Result of a finished [`Task`].
#[derive(Debug)]
pub enum Message {
    Get {
        label: String,
        result: Result<Vec<VarBind>, CoreError>,
    },
    GetNext {
        label: String,
        result: Result<Vec<VarBind>, CoreError>,
    },
    Table {
        label: String,
        result: Result<TableData, CoreError>,
    },
    Walk {
        id: u64,
        pulled: WalkPulled,
    },
}

impl Message {
    /// The failure this message carries, if any.
    pub fn error(&self) -> Option<&CoreError> {
        match self {
            Self::Get { result, .. } | Self::GetNext { result, .. } => result.as_ref().err(),
            Self::Table { result, .. } => result.as_ref().err(),
            Self::Walk { pulled, .. } => match &pulled.event {
                Some(WalkEvent::Finished(WalkOutcome::Failed(e))) => Some(e),
                _ => None,
            },
        }
    }
}

/// Notification for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Started {
        op: OpKind,
        label: String,
    },
    Completed {
        op: OpKind,
        label: String,
        count: usize,
    },
    Failed {
        op: OpKind,
        label: String,
        error: String,
    },
    WalkBatch {
        count: usize,
        total: usize,
    },
    WalkFinished {
        status: String,
        state: WalkState,
        total: usize,
    },
    TableReady {
        name: String,
        rows: usize,
    },
}

impl Outcome {
    /// One-line status text.
    pub fn status(&self) -> String {
        match self {
            Self::Started { label, .. } => format!("{label}..."),
            Self::Completed { label, count, .. } => format!("{label}: {count} results"),
            Self::Failed { op, error, .. } => match op {
                OpKind::Get => format!("GET failed: {error}"),
                OpKind::GetNext => format!("GETNEXT failed: {error}"),
                OpKind::Walk => format!("Walk failed: {error}"),
                OpKind::Table => format!("Table fetch failed: {error}"),
            },
            Self::WalkBatch { total, .. } => format!("Walking... {total} results"),
            Self::WalkFinished { status, .. } => status.clone(),
            Self::TableReady { name, rows } => format!("TABLE {name}: {rows} rows"),
        }
    }
}

/// Control block of the walk this explorer is consuming.
#[derive(Debug)]
struct ActiveWalk {
    id: u64,
    cancel: CancellationToken,
}

// ── Explorer ─────────────────────────────────────────────────────────

/// Owns the optional session, the schema, the history and the current
/// tree and table.
pub struct Explorer<T: Transport = SnmpClient> {
    session: Option<Session<T>>,
    schema: Arc<dyn Schema>,
    history: ResultHistory,
    active_walk: Option<ActiveWalk>,
    walk_seq: u64,
    tree: Option<ResultTree>,
    table: Option<TableData>,
    outcomes: mpsc::UnboundedSender<Outcome>,
}

impl Explorer<SnmpClient> {
    /// Open a session from `profile` and adopt it.
    pub async fn connect(
        &mut self,
        profile: &SessionProfile,
        config: EngineConfig,
    ) -> Result<(), CoreError> {
        let session = Session::connect(profile, config).await?;
        self.connect_with(session);
        Ok(())
    }
}

impl<T: Transport> Explorer<T> {
    /// A disconnected explorer plus the receiving end of its outcomes.
    pub fn new(
        schema: Arc<dyn Schema>,
        history_capacity: usize,
    ) -> (Self, mpsc::UnboundedReceiver<Outcome>) {
        let (outcomes, rx) = mpsc::unbounded_channel();
        let explorer = Self {
            session: None,
            schema,
            history: ResultHistory::new(history_capacity),
            active_walk: None,
            walk_seq: 0,
            tree: None,
            table: None,
            outcomes,
        };
        (explorer, rx)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn session(&self) -> Option<&Session<T>> {
        self.session.as_ref()
    }

    pub fn schema(&self) -> &Arc<dyn Schema> {
        &self.schema
    }

    pub fn history(&self) -> &ResultHistory {
        &self.history
    }

    /// For cursor navigation.
    pub fn history_mut(&mut self) -> &mut ResultHistory {
        &mut self.history
    }

    /// Tree of the walk most recently started.
    pub fn tree(&self) -> Option<&ResultTree> {
        self.tree.as_ref()
    }

    pub fn tree_mut(&mut self) -> Option<&mut ResultTree> {
        self.tree.as_mut()
    }

    /// Table of the last successful fetch.
    pub fn table(&self) -> Option<&TableData> {
        self.table.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        session::is_connected(self.session.as_ref())
    }

    pub fn walk_active(&self) -> bool {
        self.active_walk.is_some()
    }

    /// Tree for whatever group the history cursor is on. `None` unless
    /// it is a walk group.
    pub fn tree_for_current(&self) -> Option<ResultTree> {
        let group = self.history.current()?;
        let root = group.walk_root.clone()?;
        Some(ResultTree::build(
            &group.results,
            Some(root),
            self.schema.as_ref(),
        ))
    }

    // ── Connection ───────────────────────────────────────────────────

    /// Adopt an open session, dropping any previous one.
    pub fn connect_with(&mut self, session: Session<T>) {
        self.disconnect();
        self.session = Some(session);
    }

    /// Idempotent. An active walk is cancelled and its group closed; its
    /// late messages are ignored.
    pub fn disconnect(&mut self) {
        session::disconnect(self.session.as_ref());
        if let Some(active) = self.active_walk.take() {
            active.cancel.cancel();
            self.finish_walk(&WalkOutcome::Cancelled);
        }
        self.session = None;
    }

    fn ready_session(&self) -> Result<&Session<T>, CoreError> {
        self.session
            .as_ref()
            .filter(|s| s.is_connected())
            .ok_or(CoreError::NotConnected)
    }

    // ── Dispatchers ──────────────────────────────────────────────────

    pub fn get(&mut self, oids: Vec<Oid>) -> Result<Task, CoreError> {
        let label = format!(
            "GET {}",
            oids.iter()
                .map(|oid| self.object_label(oid))
                .collect::<Vec<_>>()
                .join(" ")
        );
        let task = self.ready_session()?.get(oids)?;
        self.emit(Outcome::Started {
            op: OpKind::Get,
            label: label.clone(),
        });
        Ok(async move {
            Message::Get {
                label,
                result: task.await,
            }
        }
        .boxed())
    }

    pub fn get_next(&mut self, oid: Oid) -> Result<Task, CoreError> {
        let label = format!("GETNEXT {oid}");
        let task = self.ready_session()?.get_next(oid)?;
        self.emit(Outcome::Started {
            op: OpKind::GetNext,
            label: label.clone(),
        });
        Ok(async move {
            Message::GetNext {
                label,
                result: task.await,
            }
        }
        .boxed())
    }

    /// Start a walk below `root`. Its group streams into history and its
    /// tree grows batch by batch.
    pub fn walk(&mut self, root: Oid) -> Result<Task, CoreError> {
        let handle = self.ready_session()?.start_walk(root.clone())?;
        let label = format!("WALK {}", self.object_label(&root));

        self.walk_seq += 1;
        let id = self.walk_seq;
        self.active_walk = Some(ActiveWalk {
            id,
            cancel: handle.cancel_token(),
        });
        self.history
            .add_group(ResultGroup::streaming(label.clone(), root.clone()));
        self.tree = Some(ResultTree::new(Some(root)));
        self.emit(Outcome::Started {
            op: OpKind::Walk,
            label,
        });
        Ok(pull(id, handle))
    }

    /// Fetch and reconstruct a table by table, row or column name.
    pub fn fetch_table(&mut self, name: &str) -> Result<Task, CoreError> {
        let task = self
            .ready_session()?
            .fetch_table(Arc::clone(&self.schema), name)?;
        let label = format!("TABLE {name}");
        self.emit(Outcome::Started {
            op: OpKind::Table,
            label: label.clone(),
        });
        Ok(async move {
            Message::Table {
                label,
                result: task.await,
            }
        }
        .boxed())
    }

    /// Request cancellation of the active walk. The terminal message
    /// still has to be fed through [`update`](Self::update).
    pub fn cancel_walk(&self) -> bool {
        match &self.active_walk {
            Some(active) => {
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    // ── Update ───────────────────────────────────────────────────────

    /// Apply a finished task. Returns the next pull while a walk runs.
    pub fn update(&mut self, message: Message) -> Option<Task> {
        match message {
            Message::Get { label, result } => {
                self.store_single(OpKind::Get, label, result);
                None
            }
            Message::GetNext { label, result } => {
                self.store_single(OpKind::GetNext, label, result);
                None
            }
            Message::Table { label, result } => {
                self.store_table(label, result);
                None
            }
            Message::Walk { id, pulled } => self.on_walk(id, pulled),
        }
    }

    fn store_single(&mut self, op: OpKind, label: String, result: Result<Vec<VarBind>, CoreError>) {
        match result {
            Ok(values) => {
                let results = self.format_all(&values);
                let count = results.len();
                self.history
                    .add_group(ResultGroup::completed(op, label.clone(), results));
                self.emit(Outcome::Completed { op, label, count });
            }
            Err(e) => self.store_failure(op, label, &e),
        }
    }

    fn store_table(&mut self, label: String, result: Result<TableData, CoreError>) {
        match result {
            Ok(data) => {
                let name = data.name.clone();
                let rows = data.rows.len();
                self.history.add_group(ResultGroup::completed(
                    OpKind::Table,
                    label,
                    data.results.clone(),
                ));
                self.table = Some(data);
                self.emit(Outcome::TableReady { name, rows });
            }
            Err(e) => self.store_failure(OpKind::Table, label, &e),
        }
    }

    fn store_failure(&mut self, op: OpKind, label: String, error: &CoreError) {
        let error = error.to_string();
        self.history
            .add_group(ResultGroup::failed(op, label.clone(), error.clone()));
        self.emit(Outcome::Failed { op, label, error });
    }

    fn on_walk(&mut self, id: u64, pulled: WalkPulled) -> Option<Task> {
        if self.active_walk.as_ref().map(|a| a.id) != Some(id) {
            trace!(id, "dropping message from an inactive walk");
            return None;
        }

        match pulled.event {
            Some(WalkEvent::Batch(values)) => {
                let results = self.format_all(&values);
                let count = results.len();
                if let Some(tree) = self.tree.as_mut() {
                    tree.extend(&results, self.schema.as_ref());
                }
                self.history.append_results(results);
                let total = self.streamed_total();
                self.emit(Outcome::WalkBatch { count, total });
                pulled.handle.map(|handle| pull(id, handle))
            }
            Some(WalkEvent::Finished(outcome)) => {
                self.active_walk = None;
                self.finish_walk(&outcome);
                None
            }
            None => {
                self.active_walk = None;
                self.finish_walk(&WalkOutcome::Cancelled);
                None
            }
        }
    }

    /// Close the streaming group and report how the walk ended.
    fn finish_walk(&mut self, outcome: &WalkOutcome) {
        let total = self.streamed_total();
        let (status, error) = match outcome {
            WalkOutcome::Completed => (format!("Walk complete: {total} results"), None),
            WalkOutcome::Cancelled => (format!("Walk cancelled ({total} results)"), None),
            WalkOutcome::Failed(e) => (format!("Walk failed: {e}"), Some(e.to_string())),
        };
        self.history.finish_stream(error);
        debug!(state = %outcome.state(), total, "walk consumed");
        self.emit(Outcome::WalkFinished {
            status,
            state: outcome.state(),
            total,
        });
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn streamed_total(&self) -> usize {
        self.history.streaming().map_or(0, |g| g.results.len())
    }

    fn format_all(&self, values: &[VarBind]) -> Vec<SnmpResult> {
        values
            .iter()
            .map(|vb| format_varbind(vb, self.schema.as_ref()))
            .collect()
    }

    /// Exact node name, else the deepest covering node, else the number.
    fn object_label(&self, oid: &Oid) -> String {
        self.schema
            .lookup(oid)
            .or_else(|| self.schema.longest_prefix(oid))
            .map_or_else(|| oid.to_string(), |node| node.name.clone())
    }

    fn emit(&self, outcome: Outcome) {
        // The UI may have gone away; nothing to do then.
        let _ = self.outcomes.send(outcome);
    }
}

fn pull(id: u64, handle: WalkHandle) -> Task {
    handle
        .pull()
        .map(move |pulled| Message::Walk { id, pulled })
        .boxed()
}
