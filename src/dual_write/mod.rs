//! Dual-write coordination between the primary graph and a secondary store
//!
//! The primary [`KnowledgeGraph`] is authoritative: every write lands there
//! synchronously and its failure fails the call. A configured
//! [`SecondaryStore`] receives the same writes on a best-effort basis. Its
//! failures are logged and counted, never returned.
//!
//! # Batch mode
//!
//! Between [`DualWriteCoordinator::begin_batch`] and
//! [`DualWriteCoordinator::commit_batch`] secondary writes are buffered. The
//! buffer is flushed when it reaches the batch threshold and again on commit.
//! A flush is attempted once: whatever the per-item outcome, the buffer is
//! cleared afterwards.
//!
//! # Snapshots
//!
//! [`DualWriteCoordinator::begin_snapshot`] starts a fresh graph for one
//! commit: the primary is emptied and the secondary is told to replace what it
//! mirrored for that commit, so both hold the same nodes afterwards.

pub mod primary;
#[cfg(feature = "sqlite-secondary")]
pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::GraphVaultConfig;
use crate::error::{GraphVaultError, Result};
use crate::graph::{GraphMetadata, GraphNode, GraphRelationship, StoredGraph};
use crate::store::VersionStore;

pub use primary::KnowledgeGraph;
#[cfg(feature = "sqlite-secondary")]
pub use sqlite::{SnapshotKey, SqliteGraphStore};

/// Buffered secondary writes that trigger an automatic flush
pub const DEFAULT_BATCH_THRESHOLD: usize = 500;

/// One write destined for the secondary store
#[derive(Debug, Clone, PartialEq)]
pub enum BufferedWrite {
    Node(GraphNode),
    Relationship(GraphRelationship),
}

impl BufferedWrite {
    pub fn id(&self) -> &str {
        match self {
            Self::Node(node) => &node.id,
            Self::Relationship(rel) => &rel.id,
        }
    }
}

/// Per-item results of a secondary batch write, in input order
#[derive(Debug, Default)]
pub struct BatchWriteOutcome {
    results: Vec<anyhow::Result<()>>,
}

impl BatchWriteOutcome {
    pub fn new(results: Vec<anyhow::Result<()>>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[anyhow::Result<()>] {
        &self.results
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Query-capable store that mirrors the primary graph
///
/// Implementations report failures through `anyhow`; the coordinator never
/// lets them escape.
pub trait SecondaryStore: Send {
    /// Direct following writes at `commit`, discarding rows mirrored for it before
    fn begin_snapshot(&mut self, _commit: &CommitInfo) -> anyhow::Result<()> {
        Ok(())
    }

    fn write_node(&mut self, node: &GraphNode) -> anyhow::Result<()>;

    fn write_relationship(&mut self, rel: &GraphRelationship) -> anyhow::Result<()>;

    /// Write several items, reporting one result per item
    ///
    /// The default issues the single-item writes one after another.
    fn write_batch(&mut self, items: &[BufferedWrite]) -> BatchWriteOutcome {
        let results = items
            .iter()
            .map(|item| match item {
                BufferedWrite::Node(node) => self.write_node(node),
                BufferedWrite::Relationship(rel) => self.write_relationship(rel),
            })
            .collect();
        BatchWriteOutcome::new(results)
    }

    /// Release or finalize resources at the end of a batch
    fn commit(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Write counters of both stores
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DualWriteStats {
    pub primary_nodes: usize,
    pub primary_relationships: usize,
    pub secondary_nodes: usize,
    pub secondary_relationships: usize,
    pub secondary_errors: usize,
    /// Batch flushes attempted (automatic and on commit)
    pub flushes: usize,
    pub last_secondary_error: Option<String>,
}

/// Commit identity used when persisting the primary graph
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub owner: String,
    pub repo: String,
    pub commit_sha: String,
    pub message: String,
    /// Defaults to the time of the persist call
    pub date: Option<DateTime<Utc>>,
}

impl CommitInfo {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, commit_sha: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            commit_sha: commit_sha.into(),
            message: String::new(),
            date: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }
}

pub struct DualWriteCoordinator {
    primary: KnowledgeGraph,
    secondary: Option<Box<dyn SecondaryStore>>,
    batch_threshold: usize,
    batch_mode: bool,
    buffer: Vec<BufferedWrite>,
    stats: DualWriteStats,
}

impl Default for DualWriteCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl DualWriteCoordinator {
    /// Coordinator with a primary graph only
    pub fn new() -> Self {
        Self {
            primary: KnowledgeGraph::new(),
            secondary: None,
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
            batch_mode: false,
            buffer: Vec::new(),
            stats: DualWriteStats::default(),
        }
    }

    pub fn with_secondary(mut self, secondary: Box<dyn SecondaryStore>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn with_batch_threshold(mut self, threshold: usize) -> Self {
        self.batch_threshold = threshold.max(1);
        self
    }

    /// Build from configuration, opening the SQLite secondary if one is set
    ///
    /// A secondary that cannot be opened is logged and left out.
    pub fn from_config(config: &GraphVaultConfig) -> Self {
        let coordinator = Self::new().with_batch_threshold(config.batch_threshold);
        match config.secondary_db.as_deref().and_then(open_secondary) {
            Some(secondary) => coordinator.with_secondary(secondary),
            None => coordinator,
        }
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    pub fn batch_threshold(&self) -> usize {
        self.batch_threshold
    }

    /// Write a node to the primary graph, then mirror it
    pub fn add_node(&mut self, node: GraphNode) -> Result<()> {
        let mirrored = self.secondary.is_some().then(|| node.clone());
        self.primary.add_node(node)?;
        self.stats.primary_nodes += 1;
        if let Some(node) = mirrored {
            self.mirror(BufferedWrite::Node(node));
        }
        Ok(())
    }

    /// Write a relationship to the primary graph, then mirror it
    pub fn add_relationship(&mut self, rel: GraphRelationship) -> Result<()> {
        let mirrored = self.secondary.is_some().then(|| rel.clone());
        self.primary.add_relationship(rel)?;
        self.stats.primary_relationships += 1;
        if let Some(rel) = mirrored {
            self.mirror(BufferedWrite::Relationship(rel));
        }
        Ok(())
    }

    /// Start buffering secondary writes (no-op if already batching)
    pub fn begin_batch(&mut self) {
        if !self.batch_mode {
            tracing::debug!(threshold = self.batch_threshold, "batch mode on");
            self.batch_mode = true;
        }
    }

    /// Start a new graph for `commit`
    ///
    /// Pending secondary writes of the previous graph are flushed first. The
    /// primary is emptied; counters keep accumulating. Batch mode is unchanged.
    pub fn begin_snapshot(&mut self, commit: &CommitInfo) {
        self.flush();
        self.primary = KnowledgeGraph::new();
        if let Some(secondary) = self.secondary.as_mut() {
            if let Err(e) = secondary.begin_snapshot(commit) {
                let err = GraphVaultError::SecondaryWrite(format!("begin snapshot: {:#}", e));
                tracing::warn!(code = err.code(), error = %err, "secondary snapshot reset failed");
                self.stats.secondary_errors += 1;
                self.stats.last_secondary_error = Some(err.to_string());
            }
        }
        tracing::debug!(
            repo = %format!("{}/{}", commit.owner, commit.repo),
            commit = %commit.commit_sha,
            "snapshot started"
        );
    }

    /// Flush remaining buffered writes, commit the secondary and leave batch mode
    ///
    /// Does nothing outside batch mode.
    pub fn commit_batch(&mut self) {
        if !self.batch_mode {
            return;
        }
        self.flush();
        if let Some(secondary) = self.secondary.as_mut() {
            if let Err(e) = secondary.commit() {
                let err = GraphVaultError::SecondaryWrite(format!("commit: {:#}", e));
                tracing::warn!(code = err.code(), error = %err, "secondary commit failed");
                self.stats.secondary_errors += 1;
                self.stats.last_secondary_error = Some(err.to_string());
            }
        }
        self.batch_mode = false;
        tracing::debug!(stats = ?self.stats, "batch committed");
    }

    pub fn is_in_batch_mode(&self) -> bool {
        self.batch_mode
    }

    /// Number of secondary writes waiting for the next flush
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> DualWriteStats {
        self.stats.clone()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        self.primary.nodes()
    }

    pub fn relationships(&self) -> &[GraphRelationship] {
        self.primary.relationships()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.primary.node(id)
    }

    /// Primary graph as a snapshot payload
    pub fn snapshot(&self) -> StoredGraph {
        self.primary.to_snapshot()
    }

    /// Write a whole graph, buffering secondary writes for its duration
    ///
    /// Stops at the first invalid item; items before it stay written. If the
    /// caller already opened a batch it stays open.
    pub fn ingest(&mut self, graph: StoredGraph) -> Result<()> {
        let owns_batch = !self.batch_mode;
        if owns_batch {
            self.begin_batch();
        }
        let result = self.ingest_items(graph);
        if owns_batch {
            self.commit_batch();
        }
        result
    }

    /// Snapshot the primary graph into the version store
    pub fn persist(&self, store: &VersionStore, commit: &CommitInfo) -> Result<GraphMetadata> {
        store.store(
            &commit.owner,
            &commit.repo,
            &commit.commit_sha,
            &commit.message,
            commit.date.unwrap_or_else(Utc::now),
            &self.snapshot(),
        )
    }

    fn ingest_items(&mut self, graph: StoredGraph) -> Result<()> {
        for node in graph.nodes {
            self.add_node(node)?;
        }
        for rel in graph.relationships {
            self.add_relationship(rel)?;
        }
        Ok(())
    }

    fn mirror(&mut self, write: BufferedWrite) {
        if self.batch_mode {
            self.buffer.push(write);
            if self.buffer.len() >= self.batch_threshold {
                self.flush();
            }
            return;
        }

        let Some(secondary) = self.secondary.as_mut() else {
            return;
        };
        let result = match &write {
            BufferedWrite::Node(node) => secondary.write_node(node),
            BufferedWrite::Relationship(rel) => secondary.write_relationship(rel),
        };
        self.record(&write, result);
    }

    /// Send the buffer to the secondary once and clear it
    fn flush(&mut self) {
        let pending = std::mem::take(&mut self.buffer);
        if pending.is_empty() {
            return;
        }
        let Some(secondary) = self.secondary.as_mut() else {
            return;
        };

        let outcome = secondary.write_batch(&pending);
        self.stats.flushes += 1;
        tracing::debug!(
            items = pending.len(),
            failed = outcome.failed(),
            "flushed secondary batch"
        );

        let mut results = outcome.results.into_iter();
        for write in &pending {
            let result = results
                .next()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no result reported for {}", write.id())));
            self.record(write, result);
        }
    }

    fn record(&mut self, write: &BufferedWrite, result: anyhow::Result<()>) {
        match (write, result) {
            (BufferedWrite::Node(_), Ok(())) => self.stats.secondary_nodes += 1,
            (BufferedWrite::Relationship(_), Ok(())) => self.stats.secondary_relationships += 1,
            (_, Err(e)) => {
                let err = GraphVaultError::SecondaryWrite(format!("{}: {:#}", write.id(), e));
                tracing::warn!(code = err.code(), error = %err, "secondary write failed");
                self.stats.secondary_errors += 1;
                self.stats.last_secondary_error = Some(err.to_string());
            }
        }
    }
}

#[cfg(feature = "sqlite-secondary")]
fn open_secondary(path: &std::path::Path) -> Option<Box<dyn SecondaryStore>> {
    match SqliteGraphStore::open(path) {
        Ok(store) => Some(Box::new(store)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "secondary store unavailable");
            None
        }
    }
}

#[cfg(not(feature = "sqlite-secondary"))]
fn open_secondary(path: &std::path::Path) -> Option<Box<dyn SecondaryStore>> {
    tracing::warn!(
        path = %path.display(),
        "built without sqlite-secondary, ignoring secondary store"
    );
    None
}
