//! Enforcement benchmarks
//!
//! Criterion benchmarks for decision latency across model kinds and policy sizes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Runtime;
use warden_authz::{to_rule, Enforcer, Model, SyncedEnforcer, Value};

const BASIC_MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = r.sub == p.sub && r.obj == p.obj && r.act == p.act
"#;

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

const ABAC_RULE_MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub_rule, obj, act

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = eval(p.sub_rule) && r.obj == p.obj && r.act == p.act
"#;

fn enforcer(text: &str, p: &[[&str; 3]], g: &[[&str; 2]]) -> Enforcer {
    let mut model = Model::from_text(text).unwrap();
    for row in p {
        model.add_policy("p", "p", to_rule(row));
    }
    for row in g {
        model.add_policy("g", "g", to_rule(row));
    }
    Enforcer::from_model(model).unwrap()
}

// ============================================================================
// DECISION LATENCY BENCHMARKS
// ============================================================================

fn bench_basic_decision(c: &mut Criterion) {
    let e = enforcer(
        BASIC_MODEL,
        &[["alice", "data1", "read"], ["bob", "data2", "write"]],
        &[],
    );

    c.bench_function("basic_decision", |b| {
        b.iter(|| black_box(e.enforce(black_box(["alice", "data1", "read"])).unwrap()))
    });
}

fn bench_rbac_decision(c: &mut Criterion) {
    let e = enforcer(
        RBAC_MODEL,
        &[
            ["alice", "data1", "read"],
            ["bob", "data2", "write"],
            ["data2_admin", "data2", "read"],
            ["data2_admin", "data2", "write"],
        ],
        &[["alice", "data2_admin"]],
    );

    c.bench_function("rbac_decision", |b| {
        b.iter(|| black_box(e.enforce(black_box(["alice", "data2", "read"])).unwrap()))
    });
}

fn bench_eval_decision(c: &mut Criterion) {
    let e = enforcer(
        ABAC_RULE_MODEL,
        &[["r.sub.Age > 18", "/data1", "read"], ["r.sub.Age < 60", "/data2", "write"]],
        &[],
    );
    let sub = Value::from(json!({ "Age": 30 }));

    c.bench_function("eval_decision", |b| {
        b.iter(|| {
            let request = [sub.clone(), Value::from("/data2"), Value::from("write")];
            black_box(e.enforce(request).unwrap())
        })
    });
}

// ============================================================================
// SCALING BENCHMARKS
// ============================================================================

fn bench_policy_count_impact(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy_count_impact");

    for size in [10usize, 100, 1000] {
        let mut model = Model::from_text(RBAC_MODEL).unwrap();
        for i in 0..size {
            let role = format!("role{}", i);
            let obj = format!("data{}", i);
            model.add_policy("p", "p", to_rule(&[role.as_str(), obj.as_str(), "read"]));
            model.add_policy("g", "g", to_rule(&[format!("user{}", i), role]));
        }
        let e = Enforcer::from_model(model).unwrap();
        let last_user = format!("user{}", size - 1);
        let last_obj = format!("data{}", size - 1);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(e.enforce([&last_user, &last_obj, &"read".to_string()]).unwrap()))
        });
    }

    group.finish();
}

fn bench_role_hierarchy_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("role_hierarchy_depth");

    for depth in [1usize, 5, 10] {
        let mut model = Model::from_text(RBAC_MODEL).unwrap();
        model.add_policy("p", "p", to_rule(&[format!("role{}", depth), "data".into(), "read".into()]));
        model.add_policy("g", "g", to_rule(&["alice", "role1"]));
        for i in 1..depth {
            model.add_policy("g", "g", to_rule(&[format!("role{}", i), format!("role{}", i + 1)]));
        }
        let e = Enforcer::from_model(model).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| black_box(e.enforce(["alice", "data", "read"]).unwrap()))
        });
    }

    group.finish();
}

// ============================================================================
// SHARED ENFORCER
// ============================================================================

fn bench_synced_decision(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let e = Arc::new(SyncedEnforcer::new(enforcer(
        RBAC_MODEL,
        &[["data2_admin", "data2", "read"]],
        &[["alice", "data2_admin"]],
    )));

    c.bench_function("synced_decision", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(e.enforce(["alice", "data2", "read"]).await.unwrap()) })
    });
}

// ============================================================================
// CRITERION CONFIGURATION
// ============================================================================

criterion_group!(
    benches,
    bench_basic_decision,
    bench_rbac_decision,
    bench_eval_decision,
    bench_policy_count_impact,
    bench_role_hierarchy_depth,
    bench_synced_decision,
);

criterion_main!(benches);
