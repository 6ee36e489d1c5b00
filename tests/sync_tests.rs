/// Snapshot sync and reconciliation tests
mod common;

use common::{get_field, provision, test_context, ACCESS_TOKEN};
use lumen_sync::sync::{reconcile, Reconciliation, Snapshot, SyncType};
use serde_json::json;

fn snapshot(modified: i64, task_texts: &[&str]) -> Snapshot {
    Snapshot {
        tasks: task_texts.iter().map(|t| json!({ "text": t })).collect(),
        modified,
        ..Snapshot::empty()
    }
}

#[tokio::test]
async fn test_push_then_pull_is_verbatim() {
    let ctx = test_context();
    provision(&ctx, "a@x.com", "active", Some(ACCESS_TOKEN)).await;

    let snap = snapshot(5000, &["write tests", "review"]);
    let ack = ctx
        .sync
        .push("a@x.com", &snap, Some("Grace"), SyncType::Update)
        .await
        .unwrap();
    assert!(ack.success);

    let pulled = ctx.sync.pull("a@x.com").await.unwrap().unwrap();
    assert_eq!(pulled.data, snap);
    assert_eq!(pulled.timestamp, 5000);
    assert_eq!(pulled.first_name, "Grace");
}

#[tokio::test]
async fn test_pull_before_any_push_is_absent() {
    let ctx = test_context();
    provision(&ctx, "a@x.com", "active", Some(ACCESS_TOKEN)).await;

    assert!(ctx.sync.pull("a@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_push_overwrites_wholesale() {
    let ctx = test_context();
    provision(&ctx, "a@x.com", "active", Some(ACCESS_TOKEN)).await;

    ctx.sync
        .push("a@x.com", &snapshot(1000, &["a", "b", "c"]), None, SyncType::Update)
        .await
        .unwrap();
    ctx.sync
        .push("a@x.com", &snapshot(2000, &["only"]), None, SyncType::Update)
        .await
        .unwrap();

    let pulled = ctx.sync.pull("a@x.com").await.unwrap().unwrap();
    // No merge: the earlier three tasks are gone entirely
    assert_eq!(pulled.data.tasks.len(), 1);
    assert_eq!(pulled.data.tasks[0]["text"], "only");
    assert_eq!(pulled.timestamp, 2000);
}

#[tokio::test]
async fn test_initial_push_sets_migration_marker() {
    let ctx = test_context();
    provision(&ctx, "a@x.com", "active", Some(ACCESS_TOKEN)).await;

    ctx.sync
        .push("a@x.com", &snapshot(1, &["seed"]), None, SyncType::Initial)
        .await
        .unwrap();
    assert!(get_field(&ctx, "a@x.com", "synced_from_local").await.is_some());

    // Regular updates never touch the marker
    let ctx = test_context();
    provision(&ctx, "b@x.com", "active", Some(ACCESS_TOKEN)).await;
    ctx.sync
        .push("b@x.com", &snapshot(1, &["seed"]), None, SyncType::Update)
        .await
        .unwrap();
    assert!(get_field(&ctx, "b@x.com", "synced_from_local").await.is_none());
}

#[tokio::test]
async fn test_device_adopts_newer_server_snapshot() {
    // Local ts=1000 with 3 tasks, server ts=2000 with 1 task: after
    // reconciliation the device holds exactly the server snapshot.
    let ctx = test_context();
    provision(&ctx, "a@x.com", "active", Some(ACCESS_TOKEN)).await;

    let server_snap = snapshot(2000, &["only"]);
    ctx.sync
        .push("a@x.com", &server_snap, None, SyncType::Update)
        .await
        .unwrap();

    let local = snapshot(1000, &["l1", "l2", "l3"]);
    let pulled = ctx.sync.pull("a@x.com").await.unwrap().unwrap();

    match reconcile(local, Some(pulled.data)) {
        Reconciliation::UseServer(winner) => {
            assert_eq!(winner, server_snap);
            assert_eq!(winner.tasks.len(), 1);
            assert_eq!(winner.modified, 2000);
        }
        Reconciliation::PushLocal(_) => panic!("server snapshot should win"),
    }
}

#[tokio::test]
async fn test_newer_local_snapshot_overwrites_server() {
    let ctx = test_context();
    provision(&ctx, "a@x.com", "active", Some(ACCESS_TOKEN)).await;

    ctx.sync
        .push("a@x.com", &snapshot(2000, &["old1", "old2"]), None, SyncType::Update)
        .await
        .unwrap();

    let local = snapshot(3000, &["new"]);
    let pulled = ctx.sync.pull("a@x.com").await.unwrap().unwrap();

    let local = match reconcile(local, Some(pulled.data)) {
        Reconciliation::PushLocal(local) => local,
        Reconciliation::UseServer(_) => panic!("local snapshot should win"),
    };
    ctx.sync
        .push("a@x.com", &local, None, SyncType::Update)
        .await
        .unwrap();

    let pulled = ctx.sync.pull("a@x.com").await.unwrap().unwrap();
    assert_eq!(pulled.data, local);
    assert_eq!(pulled.timestamp, 3000);
}

#[tokio::test]
async fn test_snapshot_timestamp_never_regresses_through_reconciliation() {
    let ctx = test_context();
    provision(&ctx, "a@x.com", "active", Some(ACCESS_TOKEN)).await;

    ctx.sync
        .push("a@x.com", &snapshot(2000, &["s"]), None, SyncType::Update)
        .await
        .unwrap();

    // A device holding older state reconciles: it adopts the server copy
    // instead of pushing, so the stored timestamp stays at 2000
    let pulled = ctx.sync.pull("a@x.com").await.unwrap().unwrap();
    assert!(matches!(
        reconcile(snapshot(1000, &["l"]), Some(pulled.data)),
        Reconciliation::UseServer(_)
    ));

    let pulled = ctx.sync.pull("a@x.com").await.unwrap().unwrap();
    assert_eq!(pulled.timestamp, 2000);
}

#[tokio::test]
async fn test_revocation_leaves_snapshot_in_place() {
    let ctx = test_context();
    provision(&ctx, "a@x.com", "active", Some(ACCESS_TOKEN)).await;

    let snap = snapshot(7000, &["keep me"]);
    ctx.sync
        .push("a@x.com", &snap, None, SyncType::Update)
        .await
        .unwrap();
    ctx.accounts.revoke_access(ACCESS_TOKEN).await.unwrap();

    // The snapshot survives for an eventual re-provisioning
    let pulled = ctx.sync.pull("a@x.com").await.unwrap().unwrap();
    assert_eq!(pulled.data, snap);
}
