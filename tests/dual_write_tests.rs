//! Integration tests for dual-write coordination

use graphvault::{
    CommitInfo, DualWriteCoordinator, GraphNode, GraphRelationship, SecondaryStore, StoredGraph,
    VersionStore,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Secondary that fails every call
struct AlwaysFailing;

impl SecondaryStore for AlwaysFailing {
    fn write_node(&mut self, node: &GraphNode) -> anyhow::Result<()> {
        anyhow::bail!("secondary offline (node {})", node.id)
    }

    fn write_relationship(&mut self, rel: &GraphRelationship) -> anyhow::Result<()> {
        anyhow::bail!("secondary offline (relationship {})", rel.id)
    }

    fn commit(&mut self) -> anyhow::Result<()> {
        anyhow::bail!("secondary offline")
    }
}

/// Secondary that records what reached it, shared with the test
#[derive(Clone, Default)]
struct Shared {
    ids: Arc<Mutex<Vec<String>>>,
    batches: Arc<Mutex<Vec<usize>>>,
}

impl Shared {
    fn ids(&self) -> Vec<String> {
        self.ids.lock().unwrap().clone()
    }
}

impl SecondaryStore for Shared {
    fn write_node(&mut self, node: &GraphNode) -> anyhow::Result<()> {
        self.ids.lock().unwrap().push(node.id.clone());
        Ok(())
    }

    fn write_relationship(&mut self, rel: &GraphRelationship) -> anyhow::Result<()> {
        self.ids.lock().unwrap().push(rel.id.clone());
        Ok(())
    }

    fn write_batch(&mut self, items: &[graphvault::BufferedWrite]) -> graphvault::BatchWriteOutcome {
        self.batches.lock().unwrap().push(items.len());
        let results = items
            .iter()
            .map(|item| {
                self.ids.lock().unwrap().push(item.id().to_string());
                Ok(())
            })
            .collect();
        graphvault::BatchWriteOutcome::new(results)
    }
}

#[test]
fn test_failing_secondary_never_fails_primary() {
    let mut coordinator = DualWriteCoordinator::new().with_secondary(Box::new(AlwaysFailing));

    coordinator.add_node(GraphNode::new("a", "File")).unwrap();
    coordinator.add_node(GraphNode::new("b", "File")).unwrap();
    coordinator
        .add_relationship(GraphRelationship::new("r1", "IMPORTS", "a", "b"))
        .unwrap();

    assert_eq!(coordinator.nodes().len(), 2);
    assert_eq!(coordinator.relationships().len(), 1);
    assert!(coordinator.node("b").is_some());

    let stats = coordinator.stats();
    assert_eq!(stats.primary_nodes, 2);
    assert_eq!(stats.primary_relationships, 1);
    assert_eq!(stats.secondary_nodes, 0);
    assert_eq!(stats.secondary_errors, 3);
}

#[test]
fn test_failing_secondary_in_batch_counts_each_item() {
    let mut coordinator = DualWriteCoordinator::new().with_secondary(Box::new(AlwaysFailing));

    coordinator.begin_batch();
    for id in ["a", "b", "c", "d"] {
        coordinator.add_node(GraphNode::new(id, "File")).unwrap();
    }
    coordinator.commit_batch();

    let stats = coordinator.stats();
    // Four failed items plus the failed commit
    assert_eq!(stats.secondary_errors, 5);
    assert_eq!(stats.flushes, 1);
    assert_eq!(coordinator.buffered_len(), 0);
    assert!(!coordinator.is_in_batch_mode());
    assert_eq!(coordinator.nodes().len(), 4);
}

#[test]
fn test_batch_writes_hidden_until_commit() {
    let shared = Shared::default();
    let mut coordinator = DualWriteCoordinator::new().with_secondary(Box::new(shared.clone()));

    coordinator.begin_batch();
    assert!(coordinator.is_in_batch_mode());
    coordinator.add_node(GraphNode::new("a", "File")).unwrap();
    coordinator.add_node(GraphNode::new("b", "File")).unwrap();
    coordinator
        .add_relationship(GraphRelationship::new("r1", "IMPORTS", "a", "b"))
        .unwrap();

    assert_eq!(coordinator.nodes().len(), 2);
    assert_eq!(coordinator.buffered_len(), 3);
    assert!(shared.ids().is_empty());

    coordinator.commit_batch();
    assert_eq!(shared.ids(), vec!["a", "b", "r1"]);
    assert_eq!(*shared.batches.lock().unwrap(), vec![3]);
    assert_eq!(coordinator.stats().secondary_relationships, 1);
}

#[test]
fn test_auto_flush_at_threshold() {
    let shared = Shared::default();
    let mut coordinator = DualWriteCoordinator::new()
        .with_secondary(Box::new(shared.clone()))
        .with_batch_threshold(4);

    coordinator.begin_batch();
    for i in 0..10 {
        coordinator
            .add_node(GraphNode::new(format!("n{}", i), "File"))
            .unwrap();
    }

    // Two automatic flushes of four, two items still buffered
    assert_eq!(*shared.batches.lock().unwrap(), vec![4, 4]);
    assert_eq!(coordinator.buffered_len(), 2);
    assert_eq!(shared.ids().len(), 8);

    coordinator.commit_batch();
    assert_eq!(*shared.batches.lock().unwrap(), vec![4, 4, 2]);
    assert_eq!(coordinator.stats().flushes, 3);
    assert_eq!(coordinator.stats().secondary_nodes, 10);
}

#[test]
fn test_immediate_mode_writes_through() {
    let shared = Shared::default();
    let mut coordinator = DualWriteCoordinator::new().with_secondary(Box::new(shared.clone()));

    coordinator.add_node(GraphNode::new("a", "File")).unwrap();
    assert_eq!(shared.ids(), vec!["a"]);
    assert!(shared.batches.lock().unwrap().is_empty());
}

#[test]
fn test_ingest_then_persist_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let store = VersionStore::new(temp_dir.path());
    let shared = Shared::default();
    let mut coordinator = DualWriteCoordinator::new().with_secondary(Box::new(shared.clone()));

    let graph = StoredGraph::new(
        vec![GraphNode::new("a", "File"), GraphNode::new("b", "Function")],
        vec![GraphRelationship::new("r1", "CONTAINS", "a", "b")],
    );
    coordinator.ingest(graph.clone()).unwrap();
    assert!(!coordinator.is_in_batch_mode());
    assert_eq!(shared.ids().len(), 3);

    let meta = coordinator
        .persist(&store, &CommitInfo::new("octocat", "hello-world", "abc1234").with_message("init"))
        .unwrap();
    assert_eq!(meta.node_count, 2);
    assert_eq!(meta.commit_message, "init");
    assert_eq!(store.load("octocat", "hello-world", "abc1234").unwrap(), Some(graph));
}

#[cfg(feature = "sqlite-secondary")]
#[test]
fn test_sqlite_secondary_mirrors_ingested_graph() {
    use graphvault::dual_write::SqliteGraphStore;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("secondary.db");
    let mut coordinator =
        DualWriteCoordinator::new().with_secondary(Box::new(SqliteGraphStore::open(&db_path).unwrap()));

    let graph = StoredGraph::new(
        vec![
            GraphNode::new("src/lib.rs", "File"),
            GraphNode::new("fn:parse", "Function"),
            GraphNode::new("fn:emit", "Function"),
        ],
        vec![
            GraphRelationship::new("r1", "CONTAINS", "src/lib.rs", "fn:parse"),
            GraphRelationship::new("r2", "CONTAINS", "src/lib.rs", "fn:emit"),
        ],
    );
    coordinator.ingest(graph).unwrap();
    assert_eq!(coordinator.stats().secondary_errors, 0);
    drop(coordinator);

    let secondary = SqliteGraphStore::open(&db_path).unwrap();
    assert_eq!(secondary.node_count().unwrap(), 3);
    assert_eq!(secondary.nodes_by_label("Function").unwrap().len(), 2);
    assert_eq!(secondary.outgoing("src/lib.rs", Some("CONTAINS")).unwrap().len(), 2);
}

#[cfg(feature = "sqlite-secondary")]
#[test]
fn test_sqlite_secondary_tracks_consecutive_ingests() {
    use graphvault::dual_write::{SnapshotKey, SqliteGraphStore};

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("secondary.db");
    let store = VersionStore::new(temp_dir.path().join("data"));

    let first = CommitInfo::new("acme", "tool", "aaa1111");
    let second = CommitInfo::new("acme", "tool", "bbb2222");
    let elsewhere = CommitInfo::new("other", "tool", "ccc3333");

    // Each run gets its own coordinator, as separate `graphvault store` calls do
    let runs = [
        (&first, vec!["src/old.rs", "src/lib.rs"]),
        (&second, vec!["src/lib.rs"]),
        (&elsewhere, vec!["src/lib.rs", "src/main.rs"]),
    ];
    for (commit, ids) in runs {
        let secondary = SqliteGraphStore::open(&db_path).unwrap();
        let mut coordinator = DualWriteCoordinator::new().with_secondary(Box::new(secondary));
        coordinator.begin_snapshot(commit);
        let graph = StoredGraph::new(ids.iter().map(|id| GraphNode::new(*id, "File")).collect(), vec![]);
        coordinator.ingest(graph).unwrap();
        coordinator.persist(&store, commit).unwrap();
        assert_eq!(coordinator.stats().secondary_errors, 0);
    }

    let mut secondary = SqliteGraphStore::open(&db_path).unwrap();
    for commit in [&first, &second, &elsewhere] {
        secondary.select_snapshot(SnapshotKey::new(&commit.owner, &commit.repo, &commit.commit_sha));
        let primary = store
            .load(&commit.owner, &commit.repo, &commit.commit_sha)
            .unwrap()
            .unwrap();
        assert_eq!(secondary.node_count().unwrap(), primary.node_count());
    }

    secondary.select_snapshot(SnapshotKey::new("acme", "tool", "bbb2222"));
    assert!(secondary.node("src/old.rs").unwrap().is_none());

    // Re-ingesting a commit replaces its mirrored rows
    let mut coordinator = DualWriteCoordinator::new()
        .with_secondary(Box::new(SqliteGraphStore::open(&db_path).unwrap()));
    coordinator.begin_snapshot(&first);
    coordinator
        .ingest(StoredGraph::new(vec![GraphNode::new("src/lib.rs", "File")], vec![]))
        .unwrap();
    drop(coordinator);
    secondary.select_snapshot(SnapshotKey::new("acme", "tool", "aaa1111"));
    assert_eq!(secondary.node_count().unwrap(), 1);
}
