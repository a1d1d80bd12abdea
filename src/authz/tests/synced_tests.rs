//! Shared enforcer under concurrent decisions, mutations and reloads

use std::sync::Arc;
use std::time::Duration;
use warden_authz::persist::Adapter;
use warden_authz::{to_rule, Enforcer, MemoryAdapter, Model, SyncedEnforcer};

const RBAC_MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act
"#;

async fn synced(adapter: MemoryAdapter) -> Arc<SyncedEnforcer> {
    let model = Model::from_text(RBAC_MODEL).unwrap();
    let adapter: Arc<dyn Adapter> = Arc::new(adapter);
    let enforcer = Enforcer::new(model, Some(adapter)).await.unwrap();
    Arc::new(SyncedEnforcer::new(enforcer))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_decisions_and_mutations() {
    let adapter = MemoryAdapter::new()
        .with_rules("p", "p", vec![to_rule(&["admin", "data1", "read"])])
        .await
        .with_rules("g", "g", vec![to_rule(&["alice", "admin"])])
        .await;
    let e = synced(adapter.clone()).await;

    let mut readers = Vec::new();
    for _ in 0..8 {
        let e = e.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..100 {
                // alice keeps her grant throughout
                assert!(e.enforce(["alice", "data1", "read"]).await.unwrap());
            }
        }));
    }

    let writer = {
        let e = e.clone();
        tokio::spawn(async move {
            for i in 0..50 {
                let user = format!("user{}", i);
                e.add_grouping_policy(&[user.as_str(), "admin"]).await.unwrap();
            }
        })
    };

    for reader in readers {
        reader.await.unwrap();
    }
    writer.await.unwrap();

    assert!(e.enforce(["user49", "data1", "read"]).await.unwrap());
    assert_eq!(e.get_grouping_policy().await.len(), 51);
    assert_eq!(adapter.rules("g", "g").await.len(), 51);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_auto_load_with_concurrent_decisions() {
    let adapter = MemoryAdapter::new()
        .with_rules("p", "p", vec![to_rule(&["alice", "data1", "read"])])
        .await;
    let e = synced(adapter.clone()).await;
    assert!(e.start_auto_load_policy(Duration::from_millis(5)));

    let reader = {
        let e = e.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                assert!(e.enforce(["alice", "data1", "read"]).await.unwrap());
                tokio::task::yield_now().await;
            }
        })
    };

    adapter
        .add_policy("p", "p", &to_rule(&["bob", "data2", "write"]))
        .await
        .unwrap();
    reader.await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(e.enforce(["bob", "data2", "write"]).await.unwrap());

    e.stop_auto_load_policy().await;
    assert!(!e.is_auto_loading_running());
}

#[tokio::test]
async fn test_direct_access_through_guards() {
    let e = synced(MemoryAdapter::new()).await;

    e.write().await.enable_enforce(false);
    assert!(!e.read().await.is_enabled());
    assert!(!e.enforce(["alice", "data1", "read"]).await.unwrap());

    e.write().await.enable_enforce(true);
    e.add_policy(&["alice", "data1", "read"]).await.unwrap();
    let (allowed, explain) = e.enforce_ex(["alice", "data1", "read"]).await.unwrap();
    assert!(allowed);
    assert_eq!(explain, vec!["alice", "data1", "read"]);
}
