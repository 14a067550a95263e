// Integration tests for the session and walk engine against an in-memory agent.
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{SpyAgent, oid};
use oidscope_api::{Version, VarBind};
use oidscope_core::{
    CoreError, EngineConfig, Enumerator, NodeKind, Schema, SchemaNode, Session, StaticSchema,
    WalkEvent, WalkHandle, WalkOutcome, WalkState, WalkStrategy,
};
use pretty_assertions::assert_eq;

const ROOT: &str = "1.3.6.1.4.1.9999.1";

// ── Helpers ─────────────────────────────────────────────────────────

fn engine(batch_size: usize, queue_capacity: usize) -> EngineConfig {
    EngineConfig {
        batch_size,
        queue_capacity,
        ..EngineConfig::default()
    }
}

fn session(agent: SpyAgent, version: Version, config: EngineConfig) -> Session<SpyAgent> {
    Session::from_transport(agent, "agent.test", version, config)
}

/// Drain a walk: the batches in order and the terminal outcome.
async fn drain(handle: &mut WalkHandle) -> (Vec<Vec<VarBind>>, WalkOutcome) {
    let mut batches = Vec::new();
    loop {
        match handle.next().await.unwrap() {
            WalkEvent::Batch(batch) => batches.push(batch),
            WalkEvent::Finished(outcome) => return (batches, outcome),
        }
    }
}

// ── Batching ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_walk_batches_follow_batch_size() {
    let s = session(SpyAgent::sequence(ROOT, 250), Version::V2c, engine(100, 8));
    let mut handle = s.start_walk(oid(ROOT)).unwrap();

    let (batches, outcome) = drain(&mut handle).await;
    let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![100, 100, 50]);
    assert!(matches!(outcome, WalkOutcome::Completed));
    assert_eq!(handle.state(), WalkState::Completed);
    assert!(handle.next().await.is_none());

    let mut reference = SpyAgent::sequence(ROOT, 250);
    let expected = Enumerator::new(oid(ROOT), WalkStrategy::Bulk, 50)
        .collect(&mut reference)
        .await
        .unwrap();
    assert_eq!(batches.concat(), expected);
}

#[tokio::test]
async fn test_v1_walk_uses_getnext() {
    let agent = SpyAgent::sequence(ROOT, 25);
    let counters = agent.counters();
    let s = session(agent, Version::V1, engine(10, 8));
    let mut handle = s.start_walk(oid(ROOT)).unwrap();

    let (batches, outcome) = drain(&mut handle).await;
    let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![10, 10, 5]);
    assert!(matches!(outcome, WalkOutcome::Completed));
    assert_eq!(counters.get_bulk.load(std::sync::atomic::Ordering::SeqCst), 0);
    // One request per value plus the one that leaves the subtree.
    assert_eq!(counters.requests(), 26);
}

#[tokio::test]
async fn test_walk_of_leaf_falls_back_to_get() {
    let agent = SpyAgent::sequence(ROOT, 3);
    let s = session(agent, Version::V2c, engine(100, 8));
    let leaf = format!("{ROOT}.2");
    let mut handle = s.start_walk(oid(&leaf)).unwrap();

    let (batches, outcome) = drain(&mut handle).await;
    assert!(matches!(outcome, WalkOutcome::Completed));
    let values = batches.concat();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].oid, oid(&leaf));
}

// ── Session state ───────────────────────────────────────────────────

#[tokio::test]
async fn test_not_connected_makes_no_requests() {
    let agent = SpyAgent::sequence(ROOT, 5);
    let counters = agent.counters();
    let s = session(agent, Version::V2c, EngineConfig::default());
    s.disconnect();
    s.disconnect();

    assert!(matches!(s.get(vec![oid(ROOT)]), Err(CoreError::NotConnected)));
    assert!(matches!(s.get_next(oid(ROOT)), Err(CoreError::NotConnected)));
    assert!(matches!(s.start_walk(oid(ROOT)), Err(CoreError::NotConnected)));
    assert_eq!(counters.requests(), 0);
    assert_eq!(counters.closes(), 1);
    assert!(!oidscope_core::is_connected(Some(&s)));
    assert!(!oidscope_core::is_connected::<SpyAgent>(None));
}

#[tokio::test]
async fn test_get_many_identifiers_in_one_request() {
    let agent = SpyAgent::sequence(ROOT, 5);
    let counters = agent.counters();
    let s = session(agent, Version::V2c, EngineConfig::default());

    let values = s
        .get(vec![oid(&format!("{ROOT}.1")), oid(&format!("{ROOT}.4"))])
        .unwrap()
        .await
        .unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(counters.get.load(std::sync::atomic::Ordering::SeqCst), 1);

    let next = s.get_next(oid(&format!("{ROOT}.4"))).unwrap().await.unwrap();
    assert_eq!(next[0].oid, oid(&format!("{ROOT}.5")));
}

#[tokio::test]
async fn test_one_walk_per_session() {
    let agent = SpyAgent::sequence(ROOT, 50).delay(Duration::from_millis(5));
    let s = session(agent, Version::V2c, engine(10, 1));

    let first = s.start_walk(oid(ROOT)).unwrap();
    assert!(s.walk_active());
    assert!(matches!(s.start_walk(oid(ROOT)), Err(CoreError::WalkInProgress)));
    assert!(matches!(s.get(vec![oid(ROOT)]), Err(CoreError::WalkInProgress)));
    assert!(matches!(
        s.get_next(oid(ROOT)),
        Err(CoreError::WalkInProgress)
    ));

    drop(first);
    assert!(!s.walk_active());
    let mut second = s.start_walk(oid(ROOT)).unwrap();
    let (batches, outcome) = drain(&mut second).await;
    assert!(matches!(outcome, WalkOutcome::Completed));
    assert_eq!(batches.concat().len(), 50);
}

// ── Cancellation & failure ──────────────────────────────────────────

#[tokio::test]
async fn test_cancel_after_first_batch() {
    let agent = SpyAgent::sequence(ROOT, 250).delay(Duration::from_millis(2));
    let s = session(agent, Version::V2c, engine(10, 1));
    let mut handle = s.start_walk(oid(ROOT)).unwrap();

    let first = handle.next().await.unwrap();
    assert!(matches!(first, WalkEvent::Batch(ref b) if b.len() == 10));

    handle.cancel();
    match handle.next().await.unwrap() {
        WalkEvent::Finished(outcome) => assert!(matches!(outcome, WalkOutcome::Cancelled)),
        WalkEvent::Batch(_) => panic!("batch delivered after cancel"),
    }
    assert_eq!(handle.state(), WalkState::Cancelled);
    assert!(handle.next().await.is_none());
}

#[tokio::test]
async fn test_failure_keeps_delivered_batches() {
    // Bulk steps return 50 values each; the fourth request times out.
    let s = session(
        SpyAgent::sequence(ROOT, 250).fail_on(4),
        Version::V2c,
        engine(100, 8),
    );
    let mut handle = s.start_walk(oid(ROOT)).unwrap();

    let (batches, outcome) = drain(&mut handle).await;
    let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![100, 50]);
    let WalkOutcome::Failed(error) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(error.to_string(), "request timed out after 2000ms (4 attempts)");
    assert_eq!(handle.state(), WalkState::Failed);
    assert!(s.is_connected());
}

#[tokio::test]
async fn test_disconnect_during_walk() {
    let agent = SpyAgent::sequence(ROOT, 250).delay(Duration::from_millis(5));
    let counters = agent.counters();
    let s = session(agent, Version::V2c, engine(10, 1));
    let mut handle = s.start_walk(oid(ROOT)).unwrap();

    assert!(matches!(handle.next().await, Some(WalkEvent::Batch(_))));
    s.disconnect();

    let (_, outcome) = drain(&mut handle).await;
    assert!(matches!(outcome, WalkOutcome::Cancelled));
    assert!(!s.is_connected());
    assert_eq!(counters.closes(), 1);
    assert!(matches!(s.get(vec![oid(ROOT)]), Err(CoreError::NotConnected)));
}

// ── Backpressure ────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_queue_suspends_producer() {
    let agent = SpyAgent::sequence(ROOT, 250);
    let counters = agent.counters();
    let s = session(agent, Version::V1, engine(10, 1));
    let mut handle = s.start_walk(oid(ROOT)).unwrap();

    // Nobody consumes: one batch queued, one more held by the producer.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let stalled = counters.requests();
    assert!(stalled <= 30, "producer ran ahead: {stalled} requests");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(counters.requests(), stalled);

    // Consuming resumes it and nothing is lost.
    let (batches, outcome) = drain(&mut handle).await;
    assert!(matches!(outcome, WalkOutcome::Completed));
    assert_eq!(batches.concat().len(), 250);
    assert_eq!(counters.requests(), 251);
}

// ── Tables ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_table_without_columns_fails_before_any_request() {
    let schema: Arc<dyn Schema> = Arc::new(StaticSchema::from_nodes([
        SchemaNode::new("acmeTable", oid("1.3.6.1.4.1.9999.2"), NodeKind::Table),
        SchemaNode::new("acmeEntry", oid("1.3.6.1.4.1.9999.2.1"), NodeKind::Row),
    ]));
    let agent = SpyAgent::sequence(ROOT, 5);
    let counters = agent.counters();
    let s = session(agent, Version::V2c, EngineConfig::default());

    let err = s.fetch_table(schema, "acmeTable").err().unwrap();
    assert!(matches!(err, CoreError::Schema { ref reason, .. } if reason == "no columns defined"));
    assert_eq!(err.to_string(), "table acmeTable: no columns defined");
    assert_eq!(counters.requests(), 0);
    assert!(s.is_connected());
}
