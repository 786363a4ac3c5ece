//! SQLite-backed secondary store
//!
//! Mirrors nodes and relationships into two tables so the graph can be queried
//! with SQL (by label, by edge endpoint) without loading a whole snapshot.
//! Properties are stored as JSON text.
//!
//! Every row belongs to one snapshot `(owner, repo, commit_sha)`. Writes and
//! queries go to the current snapshot; [`SecondaryStore::begin_snapshot`]
//! switches it and drops what was mirrored for that commit before, so each
//! snapshot's rows match the last graph ingested for it. Rows written before
//! any snapshot is selected belong to the unscoped snapshot `("", "", "")`.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::{BatchWriteOutcome, BufferedWrite, CommitInfo, SecondaryStore};
use crate::graph::{GraphNode, GraphRelationship, Properties};

/// Address of the snapshot rows are written to and read from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotKey {
    pub owner: String,
    pub repo: String,
    pub commit_sha: String,
}

impl SnapshotKey {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, commit_sha: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            commit_sha: commit_sha.into(),
        }
    }
}

pub struct SqliteGraphStore {
    conn: Connection,
    snapshot: SnapshotKey,
}

impl SqliteGraphStore {
    /// Open (or create) a store file and ensure its schema
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.display(), e))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| anyhow::anyhow!("Failed to open in-memory database: {}", e))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn,
            snapshot: SnapshotKey::default(),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS snapshot_nodes (
                    owner TEXT NOT NULL,
                    repo TEXT NOT NULL,
                    commit_sha TEXT NOT NULL,
                    id TEXT NOT NULL,
                    label TEXT NOT NULL,
                    properties TEXT NOT NULL,
                    PRIMARY KEY (owner, repo, commit_sha, id)
                )",
                [],
            )
            .map_err(|e| anyhow::anyhow!("Failed to create snapshot_nodes table: {}", e))?;

        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS snapshot_relationships (
                    owner TEXT NOT NULL,
                    repo TEXT NOT NULL,
                    commit_sha TEXT NOT NULL,
                    id TEXT NOT NULL,
                    rel_type TEXT NOT NULL,
                    source TEXT NOT NULL,
                    target TEXT NOT NULL,
                    properties TEXT NOT NULL,
                    PRIMARY KEY (owner, repo, commit_sha, id)
                )",
                [],
            )
            .map_err(|e| anyhow::anyhow!("Failed to create snapshot_relationships table: {}", e))?;

        self.conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_snapshot_nodes_label
                 ON snapshot_nodes(owner, repo, commit_sha, label)",
                [],
            )
            .map_err(|e| anyhow::anyhow!("Failed to create label index: {}", e))?;

        self.conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_snapshot_relationships_source
                 ON snapshot_relationships(owner, repo, commit_sha, source, rel_type)",
                [],
            )
            .map_err(|e| anyhow::anyhow!("Failed to create source index: {}", e))?;

        Ok(())
    }

    /// Snapshot that writes and queries currently target
    pub fn snapshot(&self) -> &SnapshotKey {
        &self.snapshot
    }

    /// Point queries and writes at `snapshot` without touching its rows
    pub fn select_snapshot(&mut self, snapshot: SnapshotKey) {
        self.snapshot = snapshot;
    }

    /// Every snapshot with at least one mirrored node
    pub fn snapshots(&self) -> Result<Vec<SnapshotKey>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT DISTINCT owner, repo, commit_sha FROM snapshot_nodes
                 ORDER BY owner, repo, commit_sha",
            )
            .map_err(|e| anyhow::anyhow!("Failed to prepare query: {}", e))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(SnapshotKey {
                    owner: row.get(0)?,
                    repo: row.get(1)?,
                    commit_sha: row.get(2)?,
                })
            })
            .map_err(|e| anyhow::anyhow!("Failed to query snapshots: {}", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Failed to read snapshot row: {}", e))?;
        Ok(rows)
    }

    pub fn node_count(&self) -> Result<usize> {
        self.count(
            "SELECT COUNT(*) FROM snapshot_nodes
             WHERE owner = ?1 AND repo = ?2 AND commit_sha = ?3",
        )
    }

    pub fn relationship_count(&self) -> Result<usize> {
        self.count(
            "SELECT COUNT(*) FROM snapshot_relationships
             WHERE owner = ?1 AND repo = ?2 AND commit_sha = ?3",
        )
    }

    pub fn node(&self, id: &str) -> Result<Option<GraphNode>> {
        let key = &self.snapshot;
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT id, label, properties FROM snapshot_nodes
                 WHERE owner = ?1 AND repo = ?2 AND commit_sha = ?3 AND id = ?4",
            )
            .map_err(|e| anyhow::anyhow!("Failed to prepare query: {}", e))?;

        let row = stmt
            .query_row(params![key.owner, key.repo, key.commit_sha, id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })
            .optional()
            .map_err(|e| anyhow::anyhow!("Failed to query node: {}", e))?;

        row.map(|(id, label, props)| node_from_row(id, label, &props))
            .transpose()
    }

    /// Every node carrying `label`, ordered by id
    pub fn nodes_by_label(&self, label: &str) -> Result<Vec<GraphNode>> {
        let key = &self.snapshot;
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT id, label, properties FROM snapshot_nodes
                 WHERE owner = ?1 AND repo = ?2 AND commit_sha = ?3 AND label = ?4
                 ORDER BY id",
            )
            .map_err(|e| anyhow::anyhow!("Failed to prepare query: {}", e))?;

        let rows = stmt
            .query_map(params![key.owner, key.repo, key.commit_sha, label], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })
            .map_err(|e| anyhow::anyhow!("Failed to query nodes: {}", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Failed to read node row: {}", e))?;

        rows.into_iter()
            .map(|(id, label, props)| node_from_row(id, label, &props))
            .collect()
    }

    /// Relationships leaving `source`, optionally restricted to one type
    pub fn outgoing(&self, source: &str, rel_type: Option<&str>) -> Result<Vec<GraphRelationship>> {
        let key = &self.snapshot;
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT id, rel_type, source, target, properties
                 FROM snapshot_relationships
                 WHERE owner = ?1 AND repo = ?2 AND commit_sha = ?3
                   AND source = ?4 AND (?5 IS NULL OR rel_type = ?5)
                 ORDER BY id",
            )
            .map_err(|e| anyhow::anyhow!("Failed to prepare query: {}", e))?;

        let rows = stmt
            .query_map(
                params![key.owner, key.repo, key.commit_sha, source, rel_type],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .map_err(|e| anyhow::anyhow!("Failed to query relationships: {}", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Failed to read relationship row: {}", e))?;

        rows.into_iter()
            .map(|(id, rel_type, source, target, props)| {
                Ok(GraphRelationship {
                    id,
                    rel_type,
                    source,
                    target,
                    properties: parse_properties(&props)?,
                })
            })
            .collect()
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let key = &self.snapshot;
        let n: i64 = self
            .conn
            .query_row(sql, params![key.owner, key.repo, key.commit_sha], |row| row.get(0))
            .map_err(|e| anyhow::anyhow!("Failed to count rows: {}", e))?;
        Ok(n as usize)
    }

    /// Delete every row of the current snapshot in one transaction
    fn clear_snapshot(&self) -> Result<()> {
        let key = &self.snapshot;
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| anyhow::anyhow!("Failed to start transaction: {}", e))?;
        for table in ["snapshot_nodes", "snapshot_relationships"] {
            tx.execute(
                &format!(
                    "DELETE FROM {} WHERE owner = ?1 AND repo = ?2 AND commit_sha = ?3",
                    table
                ),
                params![key.owner, key.repo, key.commit_sha],
            )
            .map_err(|e| anyhow::anyhow!("Failed to clear {}: {}", table, e))?;
        }
        tx.commit()
            .map_err(|e| anyhow::anyhow!("Failed to commit transaction: {}", e))
    }
}

fn node_from_row(id: String, label: String, props: &str) -> Result<GraphNode> {
    Ok(GraphNode {
        id,
        label,
        properties: parse_properties(props)?,
    })
}

fn parse_properties(raw: &str) -> Result<Properties> {
    serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("Failed to decode properties: {}", e))
}

fn insert_node(conn: &Connection, key: &SnapshotKey, node: &GraphNode) -> Result<()> {
    let props = serde_json::to_string(&node.properties)?;
    conn.execute(
        "INSERT OR REPLACE INTO snapshot_nodes (owner, repo, commit_sha, id, label, properties)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![key.owner, key.repo, key.commit_sha, node.id, node.label, props],
    )
    .map_err(|e| anyhow::anyhow!("Failed to store node {}: {}", node.id, e))?;
    Ok(())
}

fn insert_relationship(conn: &Connection, key: &SnapshotKey, rel: &GraphRelationship) -> Result<()> {
    let props = serde_json::to_string(&rel.properties)?;
    conn.execute(
        "INSERT OR REPLACE INTO snapshot_relationships
         (owner, repo, commit_sha, id, rel_type, source, target, properties)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            key.owner,
            key.repo,
            key.commit_sha,
            rel.id,
            rel.rel_type,
            rel.source,
            rel.target,
            props
        ],
    )
    .map_err(|e| anyhow::anyhow!("Failed to store relationship {}: {}", rel.id, e))?;
    Ok(())
}

impl SecondaryStore for SqliteGraphStore {
    /// Switch to the commit's snapshot and drop its previous rows
    fn begin_snapshot(&mut self, commit: &CommitInfo) -> Result<()> {
        self.snapshot = SnapshotKey::new(&commit.owner, &commit.repo, &commit.commit_sha);
        self.clear_snapshot()
    }

    fn write_node(&mut self, node: &GraphNode) -> Result<()> {
        insert_node(&self.conn, &self.snapshot, node)
    }

    fn write_relationship(&mut self, rel: &GraphRelationship) -> Result<()> {
        insert_relationship(&self.conn, &self.snapshot, rel)
    }

    /// All items in one transaction; a failed commit fails every item
    fn write_batch(&mut self, items: &[BufferedWrite]) -> BatchWriteOutcome {
        let tx = match self.conn.unchecked_transaction() {
            Ok(tx) => tx,
            Err(e) => {
                let message = e.to_string();
                return BatchWriteOutcome::new(
                    items
                        .iter()
                        .map(|_| Err(anyhow::anyhow!("Failed to start transaction: {}", message)))
                        .collect(),
                );
            }
        };

        let key = &self.snapshot;
        let mut results: Vec<Result<()>> = items
            .iter()
            .map(|item| match item {
                BufferedWrite::Node(node) => insert_node(&tx, key, node),
                BufferedWrite::Relationship(rel) => insert_relationship(&tx, key, rel),
            })
            .collect();

        if let Err(e) = tx.commit() {
            let message = e.to_string();
            for result in results.iter_mut().filter(|r| r.is_ok()) {
                *result = Err(anyhow::anyhow!("Failed to commit transaction: {}", message));
            }
        }
        BatchWriteOutcome::new(results)
    }

    /// Writes are durable per transaction; refresh planner statistics after a bulk load
    fn commit(&mut self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA optimize;")
            .map_err(|e| anyhow::anyhow!("Failed to optimize database: {}", e))
    }
}
