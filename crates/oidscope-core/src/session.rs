// ── Session ──
//
// One live connection to one agent. The transport sits behind an async
// mutex so a walk, a table fetch and single-shot requests never
// interleave PDUs. Connectivity is published on a `watch` channel and
// read back through the one `is_connected` predicate.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use oidscope_api::{Oid, SnmpClient, Transport, VarBind, Version};
use tokio::sync::{Mutex, MutexGuard, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, SessionProfile};
use crate::error::CoreError;
use crate::schema::Schema;
use crate::table::{TableData, TableSchema, TableWalkCollector};
use crate::walk::{
    Enumerator, Producer, WalkHandle, WalkMessage, WalkOutcome, WalkSlot, WalkStrategy,
};

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

// ── OpTask ───────────────────────────────────────────────────────────

/// A spawned single-shot operation. Resolves to the operation's result.
#[derive(Debug)]
pub struct OpTask<T> {
    handle: JoinHandle<Result<T, CoreError>>,
}

impl<T: Send + 'static> OpTask<T> {
    fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(fut),
        }
    }
}

impl<T> Future for OpTask<T> {
    type Output = Result<T, CoreError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|joined| joined.map_err(CoreError::from).and_then(|r| r))
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// Connection to one SNMP agent.
///
/// Cheaply cloneable; clones share the transport, the state channel and
/// the walk slot.
pub struct Session<T: Transport = SnmpClient> {
    inner: Arc<SessionInner<T>>,
}

impl<T: Transport> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SessionInner<T> {
    target: String,
    version: Version,
    config: EngineConfig,
    transport: Mutex<T>,
    state: watch::Sender<ConnectionState>,
    walk: Arc<WalkSlot>,
}

impl<T: Transport> SessionInner<T> {
    fn connected(&self) -> bool {
        *self.state.borrow() == ConnectionState::Connected
    }

    /// Called by whoever held the transport when they are done with it.
    /// A disconnect that happened meanwhile could not close it; do so now.
    fn release(&self, transport: &mut MutexGuard<'_, T>) {
        if !self.connected() {
            transport.close();
        }
    }
}

impl Session<SnmpClient> {
    /// Resolve the profile and open the UDP transport. No retry.
    pub async fn connect(profile: &SessionProfile, config: EngineConfig) -> Result<Self, CoreError> {
        if profile.target.trim().is_empty() {
            return Err(CoreError::InvalidProfile {
                message: "target is empty".into(),
            });
        }
        let client = SnmpClient::connect(&profile.client_config(&config.transport)).await?;
        info!(target = %profile.target, version = %profile.version, "connected");
        Ok(Self::from_transport(
            client,
            profile.target.clone(),
            profile.version,
            config,
        ))
    }
}

impl<T: Transport> Session<T> {
    /// Wrap an already-open transport.
    pub fn from_transport(
        transport: T,
        target: impl Into<String>,
        version: Version,
        config: EngineConfig,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connected);
        Self {
            inner: Arc::new(SessionInner {
                target: target.into(),
                version,
                config,
                transport: Mutex::new(transport),
                state,
                walk: Arc::new(WalkSlot::default()),
            }),
        }
    }

    pub fn target(&self) -> &str {
        &self.inner.target
    }

    pub fn version(&self) -> Version {
        self.inner.version
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        is_connected(Some(self))
    }

    /// `true` while a [`WalkHandle`] from this session is alive.
    pub fn walk_active(&self) -> bool {
        self.inner.walk.is_active()
    }

    /// Idempotent. Cancels an active walk and closes the transport, or
    /// leaves the close to the task currently holding it.
    pub fn disconnect(&self) {
        let previous = self.inner.state.send_replace(ConnectionState::Disconnected);
        if previous == ConnectionState::Disconnected {
            return;
        }
        self.inner.walk.cancel_active();
        if let Ok(mut transport) = self.inner.transport.try_lock() {
            transport.close();
        } else {
            debug!(target = %self.inner.target, "transport busy, close deferred to its holder");
        }
        info!(target = %self.inner.target, "disconnected");
    }

    fn ensure_ready(&self) -> Result<(), CoreError> {
        if !self.is_connected() {
            return Err(CoreError::NotConnected);
        }
        if self.walk_active() {
            return Err(CoreError::WalkInProgress);
        }
        Ok(())
    }

    // ── Simple operations ────────────────────────────────────────────

    /// GET one or more identifiers in one operation.
    pub fn get(&self, oids: Vec<Oid>) -> Result<OpTask<Vec<VarBind>>, CoreError> {
        self.ensure_ready()?;
        let inner = Arc::clone(&self.inner);
        Ok(OpTask::spawn(async move {
            let mut transport = inner.transport.lock().await;
            let result = transport.get(&oids).await;
            inner.release(&mut transport);
            result.map_err(|e| {
                warn!(target = %inner.target, error = %e, "GET failed");
                CoreError::from(e)
            })
        }))
    }

    /// GETNEXT: the lexicographic successor of `oid`.
    pub fn get_next(&self, oid: Oid) -> Result<OpTask<Vec<VarBind>>, CoreError> {
        self.ensure_ready()?;
        let inner = Arc::clone(&self.inner);
        Ok(OpTask::spawn(async move {
            let mut transport = inner.transport.lock().await;
            let result = transport.get_next(&oid).await;
            inner.release(&mut transport);
            result.map_err(|e| {
                warn!(target = %inner.target, error = %e, "GETNEXT failed");
                CoreError::from(e)
            })
        }))
    }

    // ── Walks ────────────────────────────────────────────────────────

    /// Start a walk below `root`. Bulk on v2c/v3, GETNEXT on v1.
    pub fn start_walk(&self, root: Oid) -> Result<WalkHandle, CoreError> {
        if !self.is_connected() {
            return Err(CoreError::NotConnected);
        }
        let cancel = CancellationToken::new();
        let guard = self
            .inner
            .walk
            .claim(&cancel)
            .ok_or(CoreError::WalkInProgress)?;

        let config = &self.inner.config;
        let strategy = WalkStrategy::for_version(self.inner.version);
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let producer = Producer {
            enumerator: Enumerator::new(root.clone(), strategy, config.max_repetitions),
            batch_size: config.batch_size,
            tx: tx.clone(),
            cancel: cancel.clone(),
        };
        debug!(target = %self.inner.target, root = %root, %strategy, "walk started");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = {
                let mut transport = inner.transport.lock().await;
                let outcome = producer.run(&mut *transport).await;
                inner.release(&mut transport);
                outcome
            };
            if let WalkOutcome::Failed(e) = &outcome {
                warn!(target = %inner.target, error = %e, "walk failed");
            }
            // Fails only if the handle is gone, which is fine.
            let _ = tx.send(WalkMessage::Done(outcome)).await;
        });

        Ok(WalkHandle::new(root, rx, cancel, guard))
    }

    // ── Tables ───────────────────────────────────────────────────────

    /// Walk a table and reconstruct its rows. `table` may name the table,
    /// its row or one of its columns.
    pub fn fetch_table(
        &self,
        schema: Arc<dyn Schema>,
        table: &str,
    ) -> Result<OpTask<TableData>, CoreError> {
        self.ensure_ready()?;

        let schema_error = |reason: &str| CoreError::Schema {
            table: table.to_owned(),
            reason: reason.to_owned(),
        };
        let node = schema.find(table).ok_or_else(|| schema_error("unknown object"))?;
        let table_node = schema
            .resolve_table(node)
            .ok_or_else(|| schema_error("not a table, row or column"))?;
        let layout = TableSchema::build(schema.as_ref(), table_node);
        if layout.columns.is_empty() {
            return Err(schema_error("no columns defined"));
        }

        let inner = Arc::clone(&self.inner);
        let strategy = WalkStrategy::for_version(inner.version);
        let max_repetitions = inner.config.max_repetitions;
        Ok(OpTask::spawn(async move {
            debug!(target = %inner.target, table = %layout.table, "table fetch started");
            let values = {
                let mut transport = inner.transport.lock().await;
                let values = Enumerator::new(layout.oid.clone(), strategy, max_repetitions)
                    .collect(&mut *transport)
                    .await;
                inner.release(&mut transport);
                values?
            };
            let mut collector = TableWalkCollector::new(layout, schema.as_ref());
            for vb in &values {
                collector.handle(vb);
            }
            debug!(rows = collector.row_count(), count = values.len(), "table fetch finished");
            Ok(collector.finish())
        }))
    }
}

// ── Free functions ───────────────────────────────────────────────────

/// The connectivity predicate every component uses. Safe on `None`.
pub fn is_connected<T: Transport>(session: Option<&Session<T>>) -> bool {
    session.is_some_and(|s| s.inner.connected())
}

/// Disconnect if there is a session. Safe on `None`, idempotent.
pub fn disconnect<T: Transport>(session: Option<&Session<T>>) {
    if let Some(session) = session {
        session.disconnect();
    }
}
