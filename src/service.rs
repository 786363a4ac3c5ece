//! Request surface over one version store
//!
//! Each method mirrors one externally visible operation and turns "absent"
//! into [`GraphVaultError::NotFound`] and incomplete input into
//! [`GraphVaultError::Validation`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{GraphVaultError, Result};
use crate::graph::{compare, repo_key, AnalysisHistoryEntry, DiffSummary, GraphDiff, GraphMetadata, StoredGraph};
use crate::store::VersionStore;

/// Input of [`GraphService::store`]
///
/// Every field is optional at the type level so that incomplete requests can
/// be reported field by field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRequest {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub commit_sha: Option<String>,
    pub commit_message: Option<String>,
    pub commit_date: Option<DateTime<Utc>>,
    pub graph: Option<StoredGraph>,
}

impl StoreRequest {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        commit_sha: impl Into<String>,
        graph: StoredGraph,
    ) -> Self {
        Self {
            owner: Some(owner.into()),
            repo: Some(repo.into()),
            commit_sha: Some(commit_sha.into()),
            graph: Some(graph),
            ..Self::default()
        }
    }
}

/// Result of comparing two stored commits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphComparison {
    pub commit_sha1: String,
    pub commit_sha2: String,
    pub summary: DiffSummary,
    pub diff: GraphDiff,
}

pub struct GraphService {
    store: VersionStore,
}

impl GraphService {
    pub fn new(store: VersionStore) -> Self {
        Self { store }
    }

    /// Service over a store rooted at `data_dir` (initialized lazily)
    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        Self::new(VersionStore::new(data_dir))
    }

    pub fn version_store(&self) -> &VersionStore {
        &self.store
    }

    pub fn store(&self, request: StoreRequest) -> Result<GraphMetadata> {
        let owner = required(request.owner, "owner")?;
        let repo = required(request.repo, "repo")?;
        let commit_sha = required(request.commit_sha, "commitSha")?;
        let graph = request
            .graph
            .ok_or_else(|| GraphVaultError::validation("graph is required"))?;

        self.store.store(
            &owner,
            &repo,
            &commit_sha,
            request.commit_message.as_deref().unwrap_or_default(),
            request.commit_date.unwrap_or_else(Utc::now),
            &graph,
        )
    }

    pub fn history(&self) -> Result<Vec<AnalysisHistoryEntry>> {
        self.store.get_all_history()
    }

    pub fn repo_history(&self, owner: &str, repo: &str) -> Result<AnalysisHistoryEntry> {
        self.store
            .get_repo_history(owner, repo)?
            .ok_or_else(|| GraphVaultError::not_found(format!("history for {}", repo_key(owner, repo))))
    }

    pub fn load_graph(&self, owner: &str, repo: &str, commit_sha: &str) -> Result<StoredGraph> {
        self.store.load(owner, repo, commit_sha)?.ok_or_else(|| {
            GraphVaultError::not_found(format!("graph {}@{}", repo_key(owner, repo), commit_sha))
        })
    }

    /// Diff from `commit_sha1` to `commit_sha2`
    pub fn compare(
        &self,
        owner: &str,
        repo: &str,
        commit_sha1: &str,
        commit_sha2: &str,
    ) -> Result<GraphComparison> {
        let a = self.load_graph(owner, repo, commit_sha1)?;
        let b = self.load_graph(owner, repo, commit_sha2)?;
        let diff = compare(&a, &b);
        Ok(GraphComparison {
            commit_sha1: commit_sha1.to_string(),
            commit_sha2: commit_sha2.to_string(),
            summary: diff.summary(),
            diff,
        })
    }

    pub fn delete_graph(&self, owner: &str, repo: &str, commit_sha: &str) -> Result<bool> {
        self.store.delete_graph(owner, repo, commit_sha)
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(GraphVaultError::validation(format!("{} is required", field))),
    }
}
