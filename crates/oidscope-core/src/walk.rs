// ── Walk engine ──
//
// A walk enumerates every identifier below a root. One producer task
// drives the transport step by step and moves fixed-size batches onto a
// bounded queue; the consumer pulls them through a `WalkHandle`.
// Cancellation is cooperative and checked before each step and before
// each push, so a request already on the wire is allowed to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use oidscope_api::{Oid, Transport, VarBind, Version};
use strum::Display;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::CoreError;

// ── Strategy & state ─────────────────────────────────────────────────

/// How each enumeration step talks to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WalkStrategy {
    /// One GETNEXT per step (SNMPv1).
    Simple,
    /// One GETBULK per step.
    Bulk,
}

impl WalkStrategy {
    pub fn for_version(version: Version) -> Self {
        if version.supports_bulk() {
            Self::Bulk
        } else {
            Self::Simple
        }
    }
}

/// Lifecycle of one walk as seen by its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WalkState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// How a walk ended. Carried by the terminal marker.
#[derive(Debug)]
pub enum WalkOutcome {
    Completed,
    Cancelled,
    Failed(CoreError),
}

impl WalkOutcome {
    pub fn state(&self) -> WalkState {
        match self {
            Self::Completed => WalkState::Completed,
            Self::Cancelled => WalkState::Cancelled,
            Self::Failed(_) => WalkState::Failed,
        }
    }
}

/// What the queue carries.
#[derive(Debug)]
pub(crate) enum WalkMessage {
    Batch(Vec<VarBind>),
    Done(WalkOutcome),
}

/// One event delivered to the consumer.
#[derive(Debug)]
pub enum WalkEvent {
    Batch(Vec<VarBind>),
    Finished(WalkOutcome),
}

// ── Enumerator ───────────────────────────────────────────────────────

/// Step-by-step subtree enumeration over a [`Transport`].
#[derive(Debug)]
pub struct Enumerator {
    root: Oid,
    last: Oid,
    strategy: WalkStrategy,
    max_repetitions: u32,
    yielded: usize,
    done: bool,
}

impl Enumerator {
    pub fn new(root: Oid, strategy: WalkStrategy, max_repetitions: u32) -> Self {
        Self {
            last: root.clone(),
            root,
            strategy,
            max_repetitions: max_repetitions.max(1),
            yielded: 0,
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Values yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Perform one request and return the values it contributed.
    ///
    /// Stops when a value leaves the root subtree, on an exception value,
    /// or on v1 `noSuchName`. A walk that finds nothing below the root
    /// falls back to a GET on the root itself.
    pub async fn step<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> Result<Vec<VarBind>, oidscope_api::Error> {
        if self.done {
            return Ok(Vec::new());
        }

        let response = match self.strategy {
            WalkStrategy::Simple => transport.get_next(&self.last).await,
            WalkStrategy::Bulk => transport.get_bulk(&self.last, self.max_repetitions).await,
        };
        let response = match response {
            Ok(values) => values,
            Err(e) if e.is_no_such_name() => Vec::new(),
            Err(e) => return Err(e),
        };

        let mut out = Vec::with_capacity(response.len());
        if response.is_empty() {
            self.done = true;
        }
        for vb in response {
            let inside = vb.oid.len() > self.root.len() && vb.oid.starts_with(&self.root);
            if vb.value.is_exception() || !inside {
                self.done = true;
                break;
            }
            if vb.oid <= self.last {
                return Err(oidscope_api::Error::OidNotIncreasing {
                    oid: vb.oid.to_string(),
                });
            }
            self.last = vb.oid.clone();
            out.push(vb);
        }
        self.yielded += out.len();

        if self.done && self.yielded == 0 {
            out = self.fallback_get(transport).await?;
            self.yielded = out.len();
        }
        Ok(out)
    }

    async fn fallback_get<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> Result<Vec<VarBind>, oidscope_api::Error> {
        let values = match transport.get(std::slice::from_ref(&self.root)).await {
            Ok(values) => values,
            Err(e) if e.is_no_such_name() => Vec::new(),
            Err(e) => return Err(e),
        };
        Ok(values
            .into_iter()
            .filter(|vb| !vb.value.is_exception())
            .collect())
    }

    /// Run to completion without batching.
    pub async fn collect<T: Transport>(
        mut self,
        transport: &mut T,
    ) -> Result<Vec<VarBind>, oidscope_api::Error> {
        let mut all = Vec::new();
        while !self.done {
            all.extend(self.step(transport).await?);
        }
        Ok(all)
    }
}

// ── Producer ─────────────────────────────────────────────────────────

pub(crate) struct Producer {
    pub enumerator: Enumerator,
    pub batch_size: usize,
    pub tx: mpsc::Sender<WalkMessage>,
    pub cancel: CancellationToken,
}

impl Producer {
    /// Drive the enumeration, pushing full batches as they fill. The
    /// partial batch is flushed unless cancelled. The caller sends the
    /// terminal marker after releasing the transport.
    pub async fn run<T: Transport>(mut self, transport: &mut T) -> WalkOutcome {
        let batch_size = self.batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);

        loop {
            if self.cancel.is_cancelled() {
                return WalkOutcome::Cancelled;
            }
            let values = match self.enumerator.step(transport).await {
                Ok(values) => values,
                Err(e) => {
                    self.push(std::mem::take(&mut batch)).await;
                    return WalkOutcome::Failed(e.into());
                }
            };
            for vb in values {
                batch.push(vb);
                if batch.len() >= batch_size {
                    let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                    if !self.push(full).await {
                        return WalkOutcome::Cancelled;
                    }
                }
            }
            if self.enumerator.is_done() {
                break;
            }
        }

        if !self.push(batch).await && self.cancel.is_cancelled() {
            return WalkOutcome::Cancelled;
        }
        WalkOutcome::Completed
    }

    /// Move one batch onto the queue. Suspends while the queue is full.
    /// Returns `false` if cancelled or the consumer is gone.
    async fn push(&self, batch: Vec<VarBind>) -> bool {
        if batch.is_empty() {
            return true;
        }
        if self.cancel.is_cancelled() {
            return false;
        }
        let count = batch.len();
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            sent = self.tx.send(WalkMessage::Batch(batch)) => {
                trace!(count, "walk batch queued");
                sent.is_ok()
            }
        }
    }
}

// ── Walk guard ───────────────────────────────────────────────────────

/// Per-session walk slot: the "a walk is active" flag and the active
/// walk's cancellation token.
#[derive(Debug, Default)]
pub(crate) struct WalkSlot {
    active: AtomicBool,
    cancel: Mutex<Option<CancellationToken>>,
}

impl WalkSlot {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Claim the slot for a new walk.
    pub fn claim(self: &Arc<Self>, cancel: &CancellationToken) -> Option<WalkGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = Some(cancel.clone());
        Some(WalkGuard {
            slot: Arc::clone(self),
            cancel: cancel.clone(),
        })
    }

    /// Cancel whichever walk currently holds the slot.
    pub fn cancel_active(&self) {
        let token = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
        }
    }
}

/// Releases the walk slot when the handle goes away. Also cancels the
/// producer, since nobody is left to read its batches.
#[derive(Debug)]
pub(crate) struct WalkGuard {
    slot: Arc<WalkSlot>,
    cancel: CancellationToken,
}

impl Drop for WalkGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.slot
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.slot.active.store(false, Ordering::Release);
    }
}

// ── Handle ───────────────────────────────────────────────────────────

/// Consumer side of a running walk.
///
/// Dropping the handle cancels the walk and frees the session for other
/// operations.
#[derive(Debug)]
pub struct WalkHandle {
    root: Oid,
    rx: mpsc::Receiver<WalkMessage>,
    cancel: CancellationToken,
    state: WalkState,
    _guard: WalkGuard,
}

/// Result of [`WalkHandle::pull`]. `handle` is `None` once the walk has
/// delivered its terminal event.
#[derive(Debug)]
pub struct WalkPulled {
    pub event: Option<WalkEvent>,
    pub handle: Option<WalkHandle>,
}

impl WalkHandle {
    pub(crate) fn new(
        root: Oid,
        rx: mpsc::Receiver<WalkMessage>,
        cancel: CancellationToken,
        guard: WalkGuard,
    ) -> Self {
        Self {
            root,
            rx,
            cancel,
            state: WalkState::Running,
            _guard: guard,
        }
    }

    pub fn root(&self) -> &Oid {
        &self.root
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    /// Request cancellation. Batches still queued are discarded; the next
    /// event is the terminal one.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            debug!(root = %self.root, "walk cancellation requested");
        }
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next batch or the terminal event. `None` after the terminal event.
    pub async fn next(&mut self) -> Option<WalkEvent> {
        if self.state != WalkState::Running {
            return None;
        }
        loop {
            let outcome = match self.rx.recv().await {
                Some(WalkMessage::Batch(batch)) => {
                    if self.cancel.is_cancelled() {
                        continue;
                    }
                    return Some(WalkEvent::Batch(batch));
                }
                Some(WalkMessage::Done(outcome)) => outcome,
                None => {
                    WalkOutcome::Failed(CoreError::Internal("walk producer exited".into()))
                }
            };
            let outcome = match outcome {
                WalkOutcome::Completed | WalkOutcome::Failed(_) if self.cancel.is_cancelled() => {
                    WalkOutcome::Cancelled
                }
                other => other,
            };
            self.state = outcome.state();
            debug!(root = %self.root, state = %self.state, "walk finished");
            return Some(WalkEvent::Finished(outcome));
        }
    }

    /// Move the handle into a `'static` future that yields the next event
    /// and, unless the walk is over, the handle back.
    pub fn pull(mut self) -> BoxFuture<'static, WalkPulled> {
        async move {
            let event = self.next().await;
            let handle = match event {
                Some(WalkEvent::Batch(_)) => Some(self),
                _ => None,
            };
            WalkPulled { event, handle }
        }
        .boxed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use oidscope_api::Value;
    use pretty_assertions::assert_eq;

    fn oid(s: &str) -> Oid {
        s.parse().unwrap()
    }

    /// Agent that answers from a fixed, sorted list.
    struct ListAgent {
        values: Vec<VarBind>,
        requests: usize,
    }

    impl ListAgent {
        fn new(oids: &[&str]) -> Self {
            let mut values: Vec<VarBind> = oids
                .iter()
                .map(|o| VarBind::new(oid(o), Value::Integer(1)))
                .collect();
            values.sort_by(|a, b| a.oid.cmp(&b.oid));
            Self {
                values,
                requests: 0,
            }
        }

        fn after(&self, oid: &Oid, n: usize) -> Vec<VarBind> {
            let mut out: Vec<VarBind> = self
                .values
                .iter()
                .filter(|vb| &vb.oid > oid)
                .take(n)
                .cloned()
                .collect();
            if out.len() < n {
                out.push(VarBind::new(oid.clone(), Value::EndOfMibView));
            }
            out
        }
    }

    impl Transport for ListAgent {
        async fn get(&mut self, oids: &[Oid]) -> Result<Vec<VarBind>, oidscope_api::Error> {
            self.requests += 1;
            Ok(oids
                .iter()
                .map(|o| {
                    self.values
                        .iter()
                        .find(|vb| &vb.oid == o)
                        .cloned()
                        .unwrap_or_else(|| VarBind::new(o.clone(), Value::NoSuchObject))
                })
                .collect())
        }

        async fn get_next(&mut self, oid: &Oid) -> Result<Vec<VarBind>, oidscope_api::Error> {
            self.requests += 1;
            Ok(self.after(oid, 1))
        }

        async fn get_bulk(
            &mut self,
            oid: &Oid,
            max_repetitions: u32,
        ) -> Result<Vec<VarBind>, oidscope_api::Error> {
            self.requests += 1;
            Ok(self.after(oid, usize::try_from(max_repetitions).unwrap()))
        }

        fn close(&mut self) {}
    }

    #[tokio::test]
    async fn bulk_and_simple_agree() {
        let oids = ["1.3.6.1.2.1.1.1.0", "1.3.6.1.2.1.1.3.0", "1.3.6.1.2.1.1.5.0", "1.3.6.1.2.1.2.1.0"];
        let root = oid("1.3.6.1.2.1.1");

        let mut agent = ListAgent::new(&oids);
        let simple = Enumerator::new(root.clone(), WalkStrategy::Simple, 10)
            .collect(&mut agent)
            .await
            .unwrap();
        assert_eq!(agent.requests, 4);

        let mut agent = ListAgent::new(&oids);
        let bulk = Enumerator::new(root, WalkStrategy::Bulk, 2)
            .collect(&mut agent)
            .await
            .unwrap();
        assert_eq!(bulk, simple);
        assert_eq!(simple.len(), 3);
    }

    #[tokio::test]
    async fn walking_a_leaf_falls_back_to_get() {
        let mut agent = ListAgent::new(&["1.3.6.1.2.1.1.5.0", "1.3.6.1.2.1.1.6.0"]);
        let got = Enumerator::new(oid("1.3.6.1.2.1.1.5.0"), WalkStrategy::Bulk, 10)
            .collect(&mut agent)
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].oid, oid("1.3.6.1.2.1.1.5.0"));
    }

    #[tokio::test]
    async fn missing_root_yields_nothing() {
        let mut agent = ListAgent::new(&["1.3.6.1.2.1.1.5.0"]);
        let got = Enumerator::new(oid("1.3.6.1.4"), WalkStrategy::Simple, 10)
            .collect(&mut agent)
            .await
            .unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn non_increasing_oid_fails() {
        struct Loop;
        impl Transport for Loop {
            async fn get(&mut self, _: &[Oid]) -> Result<Vec<VarBind>, oidscope_api::Error> {
                Ok(Vec::new())
            }
            async fn get_next(&mut self, _: &Oid) -> Result<Vec<VarBind>, oidscope_api::Error> {
                Ok(vec![VarBind::new(oid("1.3.6.1.2.1.1.1.0"), Value::Null)])
            }
            async fn get_bulk(
                &mut self,
                o: &Oid,
                _: u32,
            ) -> Result<Vec<VarBind>, oidscope_api::Error> {
                self.get_next(o).await
            }
            fn close(&mut self) {}
        }

        let err = Enumerator::new(oid("1.3.6.1.2.1.1"), WalkStrategy::Simple, 1)
            .collect(&mut Loop)
            .await
            .unwrap_err();
        assert!(matches!(err, oidscope_api::Error::OidNotIncreasing { .. }));
    }

    #[test]
    fn strategy_follows_version() {
        assert_eq!(WalkStrategy::for_version(Version::V1), WalkStrategy::Simple);
        assert_eq!(WalkStrategy::for_version(Version::V2c), WalkStrategy::Bulk);
    }

    #[test]
    fn slot_is_exclusive_until_guard_drops() {
        let slot = Arc::new(WalkSlot::default());
        let token = CancellationToken::new();
        let guard = slot.claim(&token).unwrap();
        assert!(slot.is_active());
        assert!(slot.claim(&CancellationToken::new()).is_none());
        drop(guard);
        assert!(!slot.is_active());
        assert!(token.is_cancelled());
        assert!(slot.claim(&CancellationToken::new()).is_some());
    }
}
