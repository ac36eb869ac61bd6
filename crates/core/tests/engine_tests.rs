//! Integration tests for the dependency engine over the in-memory store

// Integration tests can use unwrap/expect for cleaner assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use taskmesh_core::store::{EdgeStore, MemoryStore, TaskStore};
use taskmesh_core::tasks::{AddOutcome, DependencyEngine, NewTask};
use taskmesh_core::{Error, ProjectId, TaskId};

async fn seeded(ids: &[&str]) -> (Arc<MemoryStore>, DependencyEngine) {
    let store = Arc::new(MemoryStore::new());
    for id in ids {
        let mut task = NewTask::new(ProjectId::new("project"), format!("task {id}")).into_task();
        task.id = TaskId::new(*id);
        store.create(task).await.unwrap();
    }
    let engine = DependencyEngine::from_store(store.clone());
    (store, engine)
}

fn ids(raw: &[&str]) -> Vec<TaskId> {
    raw.iter().map(|s| TaskId::new(*s)).collect()
}

fn t(s: &str) -> TaskId {
    TaskId::new(s)
}

#[tokio::test]
async fn test_scenario_orders_parents_first() {
    let (_, engine) = seeded(&["1", "2", "3", "4"]).await;

    // 2 and 3 before 1, 1 before 4
    engine.add_dependency(&t("1"), &t("2")).await.unwrap();
    engine.add_dependency(&t("1"), &t("3")).await.unwrap();
    engine.add_dependency(&t("4"), &t("1")).await.unwrap();

    let order = engine.resolve_order().await.unwrap();
    assert_eq!(order, ids(&["2", "3", "1", "4"]));
}

#[tokio::test]
async fn test_cycle_round_trip() {
    let (store, engine) = seeded(&["A", "B", "C"]).await;

    assert_eq!(
        engine.add_dependency(&t("B"), &t("A")).await.unwrap(),
        AddOutcome::Added
    );
    assert_eq!(
        engine.add_dependency(&t("C"), &t("B")).await.unwrap(),
        AddOutcome::Added
    );

    let before = store.list_all().await.unwrap();
    let err = engine.add_dependency(&t("A"), &t("C")).await.unwrap_err();
    assert!(matches!(err, Error::CircularDependency { .. }));
    assert_eq!(store.list_all().await.unwrap(), before);

    assert_eq!(engine.resolve_order().await.unwrap(), ids(&["A", "B", "C"]));
}

#[tokio::test]
async fn test_self_loop_rejected_for_every_id() {
    let (store, engine) = seeded(&["a", "b"]).await;
    for id in ["a", "b", "never-created"] {
        let err = engine.add_dependency(&t(id), &t(id)).await.unwrap_err();
        assert!(matches!(err, Error::CircularDependency { .. }), "{id}");
    }
    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_add_is_a_no_op() {
    let (store, engine) = seeded(&["a", "b", "c"]).await;
    engine.add_dependency(&t("b"), &t("a")).await.unwrap();
    engine.add_dependency(&t("c"), &t("b")).await.unwrap();

    assert_eq!(
        engine.add_dependency(&t("b"), &t("a")).await.unwrap(),
        AddOutcome::AlreadyPresent
    );
    assert_eq!(store.list_all().await.unwrap().len(), 2);
    assert_eq!(engine.resolve_order().await.unwrap(), ids(&["a", "b", "c"]));
}

#[tokio::test]
async fn test_remove_missing_edge_returns_zero() {
    let (_, engine) = seeded(&["x", "y"]).await;
    assert_eq!(engine.remove_dependency(&t("x"), &t("y")).await.unwrap(), 0);

    engine.add_dependency(&t("x"), &t("y")).await.unwrap();
    assert_eq!(engine.remove_dependency(&t("x"), &t("y")).await.unwrap(), 1);
    assert_eq!(engine.remove_dependency(&t("x"), &t("y")).await.unwrap(), 0);
}

#[tokio::test]
async fn test_remove_requires_both_tasks() {
    let (_, engine) = seeded(&["x"]).await;
    assert!(matches!(
        engine.remove_dependency(&t("ghost"), &t("x")).await,
        Err(Error::TaskNotFound { .. })
    ));
    assert!(matches!(
        engine.remove_dependency(&t("x"), &t("ghost")).await,
        Err(Error::DependencyNotFound { .. })
    ));
}

#[tokio::test]
async fn test_resolve_order_is_deterministic_and_skips_isolated_tasks() {
    let (_, engine) = seeded(&["a", "b", "c", "d", "island"]).await;
    engine.add_dependency(&t("d"), &t("b")).await.unwrap();
    engine.add_dependency(&t("d"), &t("c")).await.unwrap();
    engine.add_dependency(&t("b"), &t("a")).await.unwrap();

    let first = engine.resolve_order().await.unwrap();
    let second = engine.resolve_order().await.unwrap();
    assert_eq!(first, second);
    assert!(!first.contains(&t("island")));
    assert_eq!(first.len(), 4);
}

#[tokio::test]
async fn test_opaque_ids_sort_as_strings() {
    let (_, engine) = seeded(&["10", "9", "100"]).await;
    engine.add_dependency(&t("100"), &t("10")).await.unwrap();
    engine.add_dependency(&t("100"), &t("9")).await.unwrap();

    assert_eq!(
        engine.resolve_order().await.unwrap(),
        ids(&["10", "9", "100"])
    );
}

#[tokio::test]
async fn test_execution_waves_group_independent_tasks() {
    let (_, engine) = seeded(&["a", "b", "c", "d"]).await;
    engine.add_dependency(&t("c"), &t("a")).await.unwrap();
    engine.add_dependency(&t("c"), &t("b")).await.unwrap();
    engine.add_dependency(&t("d"), &t("c")).await.unwrap();

    let waves = engine.execution_waves().await.unwrap();
    assert_eq!(waves, vec![ids(&["a", "b"]), ids(&["c"]), ids(&["d"])]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opposite_edges_admit_exactly_one() {
    for _ in 0..50 {
        let (store, engine) = seeded(&["A", "B"]).await;

        let forward = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.add_dependency(&t("B"), &t("A")).await })
        };
        let backward = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.add_dependency(&t("A"), &t("B")).await })
        };

        let results = [forward.await.unwrap(), backward.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let cycles = results
            .iter()
            .filter(|r| matches!(r, Err(Error::CircularDependency { .. })))
            .count();
        assert_eq!((successes, cycles), (1, 1));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
        assert!(engine.resolve_order().await.is_ok());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_chain_closing_edges_never_form_cycle() {
    for _ in 0..20 {
        let (store, engine) = seeded(&["a", "b", "c"]).await;
        engine.add_dependency(&t("b"), &t("a")).await.unwrap();

        // b -> c and c -> a are each safe alone but close a -> b -> c -> a together
        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.add_dependency(&t("c"), &t("b")).await })
        };
        let second = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.add_dependency(&t("a"), &t("c")).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(store.list_all().await.unwrap().len(), 2);
        assert!(engine.check_integrity().await.unwrap().is_healthy());
    }
}
