// Explorer flows: dispatch, await, update, as a UI loop would.
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{SpyAgent, oid};
use oidscope_api::{Value, Version};
use oidscope_core::{
    CoreError, EngineConfig, Explorer, OpKind, Outcome, Session, StaticSchema, Task, WalkState,
};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc::UnboundedReceiver;

const IF_TABLE: &str = "1.3.6.1.2.1.2.2";

// ── Helpers ─────────────────────────────────────────────────────────

fn interfaces_agent() -> SpyAgent {
    SpyAgent::new([
        (oid("1.3.6.1.2.1.1.1.0"), Value::OctetString(b"core switch".to_vec())),
        (oid("1.3.6.1.2.1.2.2.1.1.1"), Value::Integer(1)),
        (oid("1.3.6.1.2.1.2.2.1.1.2"), Value::Integer(2)),
        (oid("1.3.6.1.2.1.2.2.1.2.1"), Value::OctetString(b"lo".to_vec())),
        (oid("1.3.6.1.2.1.2.2.1.2.2"), Value::OctetString(b"eth0".to_vec())),
        (oid("1.3.6.1.2.1.2.2.1.8.1"), Value::Integer(1)),
        (oid("1.3.6.1.2.1.2.2.1.8.2"), Value::Integer(2)),
    ])
}

fn explorer(agent: SpyAgent, config: EngineConfig) -> (Explorer<SpyAgent>, UnboundedReceiver<Outcome>) {
    let schema = Arc::new(StaticSchema::mib2().unwrap());
    let (mut explorer, rx) = Explorer::new(schema, 3);
    explorer.connect_with(Session::from_transport(agent, "agent.test", Version::V2c, config));
    (explorer, rx)
}

/// Run a task and every follow-up to completion.
async fn run(explorer: &mut Explorer<SpyAgent>, task: Task) {
    let mut next = Some(task);
    while let Some(task) = next {
        next = explorer.update(task.await);
    }
}

fn drain(rx: &mut UnboundedReceiver<Outcome>) -> Vec<Outcome> {
    let mut out = Vec::new();
    while let Ok(outcome) = rx.try_recv() {
        out.push(outcome);
    }
    out
}

// ── Single-shot operations ──────────────────────────────────────────

#[tokio::test]
async fn test_get_stores_group_and_reports() {
    let (mut ex, mut rx) = explorer(interfaces_agent(), EngineConfig::default());

    let task = ex.get(vec![oid("1.3.6.1.2.1.1.1.0")]).unwrap();
    run(&mut ex, task).await;

    let group = ex.history().current().unwrap();
    assert_eq!(group.label, "GET sysDescr");
    assert_eq!(group.results[0].name, "sysDescr.0");
    assert_eq!(group.results[0].value, "core switch");
    assert_eq!(
        drain(&mut rx),
        vec![
            Outcome::Started {
                op: OpKind::Get,
                label: "GET sysDescr".into(),
            },
            Outcome::Completed {
                op: OpKind::Get,
                label: "GET sysDescr".into(),
                count: 1,
            },
        ]
    );
}

#[tokio::test]
async fn test_not_connected_is_synchronous() {
    let schema = Arc::new(StaticSchema::mib2().unwrap());
    let (mut ex, mut rx) = Explorer::<SpyAgent>::new(schema, 3);

    assert!(matches!(ex.get(vec![oid("1.3.6.1")]), Err(CoreError::NotConnected)));
    assert!(matches!(ex.walk(oid("1.3.6.1")), Err(CoreError::NotConnected)));
    assert!(matches!(ex.fetch_table("ifTable"), Err(CoreError::NotConnected)));
    assert!(drain(&mut rx).is_empty());
    assert!(ex.history().is_empty());
}

#[tokio::test]
async fn test_failed_get_reports_error_text() {
    let (mut ex, mut rx) = explorer(interfaces_agent().fail_on(1), EngineConfig::default());

    let task = ex.get_next(oid("1.3.6.1.2.1.1")).unwrap();
    run(&mut ex, task).await;

    let outcomes = drain(&mut rx);
    let last = outcomes.last().unwrap();
    assert_eq!(
        last.status(),
        "GETNEXT failed: request timed out after 2000ms (4 attempts)"
    );
    let group = ex.history().current().unwrap();
    assert_eq!(group.op, OpKind::GetNext);
    assert!(group.error.is_some());
}

#[tokio::test]
async fn test_history_keeps_newest_groups() {
    let (mut ex, _rx) = explorer(interfaces_agent(), EngineConfig::default());
    for _ in 0..4 {
        let task = ex.get_next(oid("1.3.6.1.2.1.1")).unwrap();
        run(&mut ex, task).await;
    }
    assert_eq!(ex.history().len(), 3);
    assert_eq!(ex.history().position(), 3);
    ex.history_mut().prev();
    assert_eq!(ex.history().position(), 2);
}

// ── Walks ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_walk_streams_into_history_and_tree() {
    let config = EngineConfig {
        batch_size: 2,
        ..EngineConfig::default()
    };
    let (mut ex, mut rx) = explorer(interfaces_agent(), config);

    let task = ex.walk(oid(IF_TABLE)).unwrap();
    assert!(ex.history().current().unwrap().in_progress);
    run(&mut ex, task).await;

    let group = ex.history().current().unwrap();
    assert_eq!(group.label, "WALK ifTable");
    assert!(!group.in_progress);
    assert_eq!(group.results.len(), 6);

    let tree = ex.tree().unwrap();
    assert_eq!(tree.result_count(), 6);
    let entry = &tree.children()[0];
    assert_eq!(entry.name, "ifEntry");
    let columns: Vec<&str> = entry.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, vec!["ifIndex", "ifDescr", "ifOperStatus"]);
    assert_eq!(entry.children[2].children[1].result.as_ref().unwrap().value, "down(2)");
    assert_eq!(ex.tree_for_current().unwrap().result_count(), 6);

    let outcomes = drain(&mut rx);
    let batches = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::WalkBatch { .. }))
        .count();
    assert_eq!(batches, 3);
    assert_eq!(
        outcomes.last().unwrap(),
        &Outcome::WalkFinished {
            status: "Walk complete: 6 results".into(),
            state: WalkState::Completed,
            total: 6,
        }
    );
    assert!(!ex.walk_active());
}

#[tokio::test]
async fn test_cancelled_walk_keeps_partial_results() {
    let agent = SpyAgent::sequence("1.3.6.1.4.1.9999.1", 500).delay(Duration::from_millis(2));
    let config = EngineConfig {
        batch_size: 10,
        queue_capacity: 1,
        ..EngineConfig::default()
    };
    let (mut ex, mut rx) = explorer(agent, config);

    let task = ex.walk(oid("1.3.6.1.4.1.9999.1")).unwrap();
    let mut next = ex.update(task.await);
    assert!(ex.cancel_walk());
    while let Some(task) = next {
        next = ex.update(task.await);
    }

    let Some(Outcome::WalkFinished { status, state, total }) = drain(&mut rx).pop() else {
        panic!("walk did not finish");
    };
    assert_eq!(state, WalkState::Cancelled);
    assert_eq!(total, 10);
    assert_eq!(status, "Walk cancelled (10 results)");
    assert_eq!(ex.history().current().unwrap().results.len(), 10);
    assert!(!ex.cancel_walk());
}

#[tokio::test]
async fn test_walk_message_after_disconnect_is_ignored() {
    let agent = SpyAgent::sequence("1.3.6.1.4.1.9999.1", 100).delay(Duration::from_millis(2));
    let config = EngineConfig {
        batch_size: 10,
        ..EngineConfig::default()
    };
    let (mut ex, mut rx) = explorer(agent, config);

    let task = ex.walk(oid("1.3.6.1.4.1.9999.1")).unwrap();
    ex.disconnect();
    let finished = drain(&mut rx).pop().unwrap();
    assert_eq!(finished.status(), "Walk cancelled (0 results)");

    let message = task.await;
    assert!(ex.update(message).is_none());
    assert!(drain(&mut rx).is_empty());
    assert!(ex.history().current().unwrap().results.is_empty());
    assert!(!ex.is_connected());
}

#[tokio::test]
async fn test_late_single_reply_does_not_orphan_walk() {
    let root = "1.3.6.1.4.1.9999.1";
    let config = EngineConfig {
        batch_size: 10,
        ..EngineConfig::default()
    };
    let (mut ex, mut rx) = explorer(SpyAgent::sequence(root, 30), config);

    // The GET reply lands after the walk's group was opened.
    let get = ex.get(vec![oid("1.3.6.1.4.1.9999.1.1")]).unwrap();
    let walk = ex.walk(oid(root)).unwrap();
    assert!(ex.update(get.await).is_none());
    assert_eq!(ex.history().current().unwrap().op, OpKind::Get);
    run(&mut ex, walk).await;

    let walk_group = ex.history().iter().find(|g| g.op == OpKind::Walk).unwrap();
    assert_eq!(walk_group.results.len(), 30);
    assert!(!walk_group.in_progress);
    assert!(ex.history().streaming().is_none());
    assert_eq!(ex.tree().unwrap().result_count(), 30);
    assert_eq!(
        drain(&mut rx).pop().unwrap(),
        Outcome::WalkFinished {
            status: "Walk complete: 30 results".into(),
            state: WalkState::Completed,
            total: 30,
        }
    );
}

// ── Tables ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_table_fetch_reconstructs_rows() {
    let (mut ex, mut rx) = explorer(interfaces_agent(), EngineConfig::default());

    let task = ex.fetch_table("ifEntry").unwrap();
    run(&mut ex, task).await;

    let table = ex.table().unwrap();
    assert_eq!(table.name, "ifTable");
    assert_eq!(table.columns[0], "ifIndex");
    assert_eq!(table.index_cols, 1);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[1].key, "2");
    assert_eq!(table.rows[1].cells[1], "eth0");

    let last = drain(&mut rx).pop().unwrap();
    assert_eq!(last.status(), "TABLE ifTable: 2 rows");
    assert_eq!(ex.history().current().unwrap().op, OpKind::Table);
}

#[tokio::test]
async fn test_unknown_table_is_rejected_up_front() {
    let (mut ex, mut rx) = explorer(interfaces_agent(), EngineConfig::default());

    let err = ex.fetch_table("sysDescr").err().unwrap();
    assert_eq!(err.to_string(), "table sysDescr: not a table, row or column");
    let err = ex.fetch_table("noSuchThing").err().unwrap();
    assert!(matches!(err, CoreError::Schema { .. }));
    assert!(drain(&mut rx).is_empty());
}
