// Shared test agent for the engine integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use oidscope_api::{Error, Oid, Transport, Value, VarBind};

pub fn oid(s: &str) -> Oid {
    s.parse().unwrap()
}

/// Request counters, shared with the test after the agent moves into a
/// session.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    pub get: Arc<AtomicUsize>,
    pub get_next: Arc<AtomicUsize>,
    pub get_bulk: Arc<AtomicUsize>,
    pub close: Arc<AtomicUsize>,
}

impl Counters {
    /// Requests that went on the "wire".
    pub fn requests(&self) -> usize {
        self.get.load(Ordering::SeqCst)
            + self.get_next.load(Ordering::SeqCst)
            + self.get_bulk.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.close.load(Ordering::SeqCst)
    }
}

/// In-memory agent over a sorted map, with call counting, failure
/// injection and per-request delay.
pub struct SpyAgent {
    values: BTreeMap<Oid, Value>,
    counters: Counters,
    fail_on: Option<usize>,
    delay: Option<Duration>,
    closed: bool,
}

impl SpyAgent {
    pub fn new(values: impl IntoIterator<Item = (Oid, Value)>) -> Self {
        Self {
            values: values.into_iter().collect(),
            counters: Counters::default(),
            fail_on: None,
            delay: None,
            closed: false,
        }
    }

    /// `count` integer instances `root.1 ..= root.count`.
    pub fn sequence(root: &str, count: u32) -> Self {
        let root = oid(root);
        Self::new((1..=count).map(|i| (root.child(i), Value::Integer(i64::from(i)))))
    }

    /// Fail the `n`th request (1-based) with a timeout.
    pub fn fail_on(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }

    async fn request(&mut self, counter: &AtomicUsize) -> Result<(), Error> {
        if self.closed {
            return Err(Error::Closed);
        }
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on == Some(self.counters.requests()) {
            return Err(Error::Timeout {
                timeout_ms: 2000,
                attempts: 4,
            });
        }
        Ok(())
    }

    fn after(&self, oid: &Oid, n: usize) -> Vec<VarBind> {
        let mut out: Vec<VarBind> = self
            .values
            .range::<Oid, _>((std::ops::Bound::Excluded(oid), std::ops::Bound::Unbounded))
            .take(n)
            .map(|(o, v)| VarBind::new(o.clone(), v.clone()))
            .collect();
        if out.len() < n {
            out.push(VarBind::new(oid.clone(), Value::EndOfMibView));
        }
        out
    }
}

impl Transport for SpyAgent {
    async fn get(&mut self, oids: &[Oid]) -> Result<Vec<VarBind>, Error> {
        let counter = Arc::clone(&self.counters.get);
        self.request(&counter).await?;
        Ok(oids
            .iter()
            .map(|o| {
                let value = self.values.get(o).cloned().unwrap_or(Value::NoSuchObject);
                VarBind::new(o.clone(), value)
            })
            .collect())
    }

    async fn get_next(&mut self, oid: &Oid) -> Result<Vec<VarBind>, Error> {
        let counter = Arc::clone(&self.counters.get_next);
        self.request(&counter).await?;
        Ok(self.after(oid, 1))
    }

    async fn get_bulk(&mut self, oid: &Oid, max_repetitions: u32) -> Result<Vec<VarBind>, Error> {
        let counter = Arc::clone(&self.counters.get_bulk);
        self.request(&counter).await?;
        Ok(self.after(oid, usize::try_from(max_repetitions).unwrap()))
    }

    fn close(&mut self) {
        self.closed = true;
        self.counters.close.fetch_add(1, Ordering::SeqCst);
    }
}
