//! Commit-addressed version store for graph snapshots
//!
//! Layout under the data directory:
//!
//! ```text
//! {data_dir}/index.json                          every AnalysisHistoryEntry, rewritten whole
//! {data_dir}/graphs/{owner}/{repo}/{sha7}/graph.json   one payload per snapshot
//! ```
//!
//! # Concurrency
//!
//! The in-memory index sits behind one mutex. A store or delete holds it for the
//! whole read-modify-write cycle (payload write, index mutation, index rewrite),
//! so two concurrent stores for the same repository cannot drop each other's
//! history update. Loads only hold it long enough to resolve the payload path.
//!
//! Index and payload writes go through a temp file in the same directory followed
//! by a rename, so readers observe either the old or the new document.

pub mod index;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{GraphVaultError, Result};
use crate::graph::{graph_id, short_sha, AnalysisHistoryEntry, GraphMetadata, StoredGraph};
use crate::validation::validate_commit_address;

pub use index::{HistoryIndex, UpsertOutcome, INDEX_FORMAT_VERSION};

/// Index document file name
pub const INDEX_FILE: &str = "index.json";

/// Directory holding one sub-directory per snapshot
pub const GRAPHS_DIR: &str = "graphs";

/// Payload file name inside a snapshot directory
pub const PAYLOAD_FILE: &str = "graph.json";

/// Directory of a snapshot relative to the data directory
///
/// One path level per component. The flat graph id cannot name directories:
/// `_` is legal inside owners and repositories, so `acme_labs/tool` and
/// `acme/labs_tool` share an id.
pub fn storage_locator(owner: &str, repo: &str, commit_sha: &str) -> String {
    format!("{}/{}/{}/{}", GRAPHS_DIR, owner, repo, short_sha(commit_sha))
}

/// Durable store of graph snapshots keyed by (repository, commit)
///
/// Construct one per data directory and share it by reference; nothing here is
/// global.
pub struct VersionStore {
    root: PathBuf,
    /// `None` until the first operation loads the index from disk
    index: Mutex<Option<HistoryIndex>>,
}

impl VersionStore {
    /// Create a store rooted at `root` without touching the filesystem
    ///
    /// Directories are created and the index is loaded on first use.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index: Mutex::new(None),
        }
    }

    /// Create a store and initialize it immediately
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        store.initialize()?;
        Ok(store)
    }

    /// Create backing directories and load the index (idempotent)
    pub fn initialize(&self) -> Result<()> {
        let mut slot = self.index.lock();
        self.ensure_loaded(&mut slot)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn graphs_dir(&self) -> PathBuf {
        self.root.join(GRAPHS_DIR)
    }

    /// Absolute path of the payload behind a storage locator
    pub fn payload_path(&self, storage_locator: &str) -> PathBuf {
        self.root.join(storage_locator).join(PAYLOAD_FILE)
    }

    /// Persist a snapshot and record it in the repository's history
    ///
    /// An existing entry for `commit_sha` is overwritten at its current
    /// position; otherwise the commit is appended. `commit_number` is always the
    /// repository's commit count at call time plus one, also when overwriting.
    pub fn store(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        commit_message: &str,
        commit_date: DateTime<Utc>,
        graph: &StoredGraph,
    ) -> Result<GraphMetadata> {
        validate_commit_address(owner, repo, commit_sha)?;

        let mut slot = self.index.lock();
        let current = self.ensure_loaded(&mut slot)?;

        let id = graph_id(owner, repo, commit_sha);
        let storage_locator = storage_locator(owner, repo, commit_sha);

        if let Some(other) = current.all_commits().find(|c| {
            c.storage_locator == storage_locator
                && (c.repo_owner != owner || c.repo_name != repo || c.commit_sha != commit_sha)
        }) {
            tracing::warn!(
                locator = %storage_locator,
                existing = %other.commit_sha,
                incoming = %commit_sha,
                "short sha collision, payload will be shared"
            );
        }

        self.write_payload(&storage_locator, graph)?;

        let metadata = GraphMetadata {
            id,
            repo_owner: owner.to_string(),
            repo_name: repo.to_string(),
            commit_sha: commit_sha.to_string(),
            commit_number: current.commit_count(owner, repo) + 1,
            commit_message: commit_message.to_string(),
            commit_date,
            created_at: Utc::now(),
            node_count: graph.node_count(),
            relationship_count: graph.relationship_count(),
            storage_locator,
        };

        let mut next = current.clone();
        let outcome = next.upsert_commit(metadata.clone());
        self.write_index(&next)?;
        *current = next;

        tracing::info!(
            repo = %format!("{}/{}", owner, repo),
            commit = %commit_sha,
            nodes = metadata.node_count,
            relationships = metadata.relationship_count,
            ?outcome,
            "stored graph snapshot"
        );
        Ok(metadata)
    }

    /// Load the snapshot stored for exactly `commit_sha`
    ///
    /// Returns `Ok(None)` when the commit is unknown, its payload is missing, or
    /// the payload cannot be decoded (the latter is logged).
    pub fn load(&self, owner: &str, repo: &str, commit_sha: &str) -> Result<Option<StoredGraph>> {
        let locator = {
            let mut slot = self.index.lock();
            let current = self.ensure_loaded(&mut slot)?;
            match current.commit(owner, repo, commit_sha) {
                Some(meta) => meta.storage_locator.clone(),
                None => return Ok(None),
            }
        };

        let path = self.payload_path(&locator);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "index points at a missing payload");
                return Ok(None);
            }
            Err(e) => return Err(GraphVaultError::io(path, e)),
        };

        match serde_json::from_slice::<StoredGraph>(&bytes) {
            Ok(graph) => Ok(Some(graph)),
            Err(e) => {
                let err = GraphVaultError::serialization(path.display().to_string(), e);
                tracing::warn!(code = err.code(), error = %err, "corrupt graph payload");
                Ok(None)
            }
        }
    }

    /// Remove one snapshot and its metadata
    ///
    /// Returns `false` if the commit was not recorded. Removing the last commit
    /// of a repository removes the repository's history entry.
    pub fn delete_graph(&self, owner: &str, repo: &str, commit_sha: &str) -> Result<bool> {
        let mut slot = self.index.lock();
        let current = self.ensure_loaded(&mut slot)?;

        let mut next = current.clone();
        let Some(removed) = next.remove_commit(owner, repo, commit_sha) else {
            return Ok(false);
        };

        if !next.locator_in_use(&removed.storage_locator) {
            let dir = self.root.join(&removed.storage_locator);
            match fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(GraphVaultError::io(dir, e)),
            }
            self.prune_empty_parents(&dir);
        }

        self.write_index(&next)?;
        *current = next;

        tracing::info!(
            repo = %format!("{}/{}", owner, repo),
            commit = %commit_sha,
            "deleted graph snapshot"
        );
        Ok(true)
    }

    /// Every repository's history
    pub fn get_all_history(&self) -> Result<Vec<AnalysisHistoryEntry>> {
        let mut slot = self.index.lock();
        Ok(self.ensure_loaded(&mut slot)?.entries.clone())
    }

    pub fn get_repo_history(&self, owner: &str, repo: &str) -> Result<Option<AnalysisHistoryEntry>> {
        let mut slot = self.index.lock();
        Ok(self.ensure_loaded(&mut slot)?.entry(owner, repo).cloned())
    }

    pub fn get_commit(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> Result<Option<GraphMetadata>> {
        let mut slot = self.index.lock();
        Ok(self
            .ensure_loaded(&mut slot)?
            .commit(owner, repo, commit_sha)
            .cloned())
    }

    /// Most recently appended commit of a repository
    pub fn latest_commit(&self, owner: &str, repo: &str) -> Result<Option<GraphMetadata>> {
        let mut slot = self.index.lock();
        Ok(self
            .ensure_loaded(&mut slot)?
            .entry(owner, repo)
            .and_then(|e| e.commits.last())
            .cloned())
    }

    /// Copy of the whole index document
    pub fn index_snapshot(&self) -> Result<HistoryIndex> {
        let mut slot = self.index.lock();
        Ok(self.ensure_loaded(&mut slot)?.clone())
    }

    /// Remove repo and owner directories left empty by a delete
    fn prune_empty_parents(&self, snapshot_dir: &Path) {
        let graphs = self.graphs_dir();
        for dir in snapshot_dir.ancestors().skip(1) {
            if dir == graphs || !dir.starts_with(&graphs) {
                break;
            }
            // Fails on non-empty directories, which end the walk
            if fs::remove_dir(dir).is_err() {
                break;
            }
        }
    }

    fn ensure_loaded<'a>(&self, slot: &'a mut Option<HistoryIndex>) -> Result<&'a mut HistoryIndex> {
        if slot.is_none() {
            let graphs = self.graphs_dir();
            fs::create_dir_all(&graphs).map_err(|e| GraphVaultError::io(&graphs, e))?;
            let index = self.read_index()?;
            tracing::debug!(
                root = %self.root.display(),
                repositories = index.entries.len(),
                "loaded history index"
            );
            *slot = Some(index);
        }
        Ok(slot.get_or_insert_with(HistoryIndex::default))
    }

    fn read_index(&self) -> Result<HistoryIndex> {
        let path = self.index_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HistoryIndex::default()),
            Err(e) => return Err(GraphVaultError::io(path, e)),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| GraphVaultError::serialization(path.display().to_string(), e))
    }

    fn write_index(&self, index: &HistoryIndex) -> Result<()> {
        write_json_atomic(&self.root, &self.index_path(), index)
    }

    fn write_payload(&self, storage_locator: &str, graph: &StoredGraph) -> Result<()> {
        let dir = self.root.join(storage_locator);
        fs::create_dir_all(&dir).map_err(|e| GraphVaultError::io(&dir, e))?;
        write_json_atomic(&dir, &dir.join(PAYLOAD_FILE), graph)
    }
}

/// Serialize `value` into a temp file in `dir`, then rename it over `path`
fn write_json_atomic<T: Serialize>(dir: &Path, path: &Path, value: &T) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| GraphVaultError::io(dir, e))?;
    serde_json::to_writer(&mut tmp, value)
        .map_err(|e| GraphVaultError::serialization(path.display().to_string(), e))?;
    tmp.flush().map_err(|e| GraphVaultError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| GraphVaultError::io(path, e.error))?;
    tracing::debug!(path = %path.display(), "wrote document");
    Ok(())
}
