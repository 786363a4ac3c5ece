//! History index document
//!
//! One JSON document holding every [`AnalysisHistoryEntry`]. The store keeps it
//! in memory and rewrites it whole after each mutation.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::graph::{AnalysisHistoryEntry, GraphMetadata};

/// Current on-disk index format
pub const INDEX_FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    INDEX_FORMAT_VERSION
}

/// Where an upserted commit landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Existing slot with the same sha overwritten
    Replaced { position: usize },
    /// New commit pushed to the end of the list
    Appended { position: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryIndex {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub entries: Vec<AnalysisHistoryEntry>,
}

impl Default for HistoryIndex {
    fn default() -> Self {
        Self {
            version: INDEX_FORMAT_VERSION,
            entries: Vec::new(),
        }
    }
}

impl HistoryIndex {
    pub fn entry(&self, owner: &str, repo: &str) -> Option<&AnalysisHistoryEntry> {
        self.entries
            .iter()
            .find(|e| e.repo_owner == owner && e.repo_name == repo)
    }

    pub fn commit(&self, owner: &str, repo: &str, commit_sha: &str) -> Option<&GraphMetadata> {
        self.entry(owner, repo)?.find_commit(commit_sha)
    }

    /// Number of commits currently recorded for a repository
    pub fn commit_count(&self, owner: &str, repo: &str) -> usize {
        self.entry(owner, repo).map_or(0, |e| e.commits.len())
    }

    /// Insert or replace the metadata of one commit
    ///
    /// Creates the repository entry on first use. A sha already present keeps
    /// its position in the list.
    pub fn upsert_commit(&mut self, metadata: GraphMetadata) -> UpsertOutcome {
        let entry_pos = match self.entries.iter().position(|e| {
            e.repo_owner == metadata.repo_owner && e.repo_name == metadata.repo_name
        }) {
            Some(pos) => pos,
            None => {
                self.entries.push(AnalysisHistoryEntry::new(
                    &metadata.repo_owner,
                    &metadata.repo_name,
                ));
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[entry_pos];

        entry.last_updated = Utc::now();
        match entry
            .commits
            .iter()
            .position(|c| c.commit_sha == metadata.commit_sha)
        {
            Some(position) => {
                entry.commits[position] = metadata;
                UpsertOutcome::Replaced { position }
            }
            None => {
                entry.commits.push(metadata);
                UpsertOutcome::Appended {
                    position: entry.commits.len() - 1,
                }
            }
        }
    }

    /// Remove one commit, dropping the repository entry when it becomes empty
    pub fn remove_commit(
        &mut self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> Option<GraphMetadata> {
        let entry_pos = self
            .entries
            .iter()
            .position(|e| e.repo_owner == owner && e.repo_name == repo)?;
        let entry = &mut self.entries[entry_pos];
        let commit_pos = entry.commits.iter().position(|c| c.commit_sha == commit_sha)?;

        let removed = entry.commits.remove(commit_pos);
        if entry.commits.is_empty() {
            self.entries.remove(entry_pos);
        } else {
            entry.last_updated = Utc::now();
        }
        Some(removed)
    }

    /// Whether any recorded commit still points at `locator`
    pub fn locator_in_use(&self, locator: &str) -> bool {
        self.entries
            .iter()
            .flat_map(|e| e.commits.iter())
            .any(|c| c.storage_locator == locator)
    }

    /// Every metadata record, entry by entry
    pub fn all_commits(&self) -> impl Iterator<Item = &GraphMetadata> {
        self.entries.iter().flat_map(|e| e.commits.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(owner: &str, repo: &str, sha: &str, number: usize) -> GraphMetadata {
        let now = Utc::now();
        GraphMetadata {
            id: crate::graph::graph_id(owner, repo, sha),
            repo_owner: owner.into(),
            repo_name: repo.into(),
            commit_sha: sha.into(),
            commit_number: number,
            commit_message: String::new(),
            commit_date: now,
            created_at: now,
            node_count: 0,
            relationship_count: 0,
            storage_locator: crate::store::storage_locator(owner, repo, sha),
        }
    }

    #[test]
    fn test_upsert_appends_then_replaces_in_place() {
        let mut index = HistoryIndex::default();
        assert_eq!(
            index.upsert_commit(meta("o", "r", "aaa1111", 1)),
            UpsertOutcome::Appended { position: 0 }
        );
        assert_eq!(
            index.upsert_commit(meta("o", "r", "bbb2222", 2)),
            UpsertOutcome::Appended { position: 1 }
        );

        let mut again = meta("o", "r", "aaa1111", 3);
        again.node_count = 42;
        assert_eq!(
            index.upsert_commit(again),
            UpsertOutcome::Replaced { position: 0 }
        );

        let entry = index.entry("o", "r").unwrap();
        assert_eq!(entry.commits.len(), 2);
        assert_eq!(entry.commits[0].commit_sha, "aaa1111");
        assert_eq!(entry.commits[0].node_count, 42);
    }

    #[test]
    fn test_remove_last_commit_drops_entry() {
        let mut index = HistoryIndex::default();
        index.upsert_commit(meta("o", "r", "aaa1111", 1));
        index.upsert_commit(meta("o", "other", "ccc3333", 1));

        assert!(index.remove_commit("o", "r", "missing").is_none());
        assert!(index.remove_commit("o", "r", "aaa1111").is_some());
        assert!(index.entry("o", "r").is_none());
        assert_eq!(index.entries.len(), 1);
    }

    #[test]
    fn test_repositories_are_independent() {
        let mut index = HistoryIndex::default();
        index.upsert_commit(meta("o", "a", "aaa1111", 1));
        index.upsert_commit(meta("o", "b", "aaa1111", 1));
        assert_eq!(index.commit_count("o", "a"), 1);
        assert_eq!(index.commit_count("o", "b"), 1);
        assert_eq!(index.commit_count("o", "c"), 0);
    }

    #[test]
    fn test_missing_version_defaults() {
        let index: HistoryIndex = serde_json::from_str(r#"{"entries": []}"#).unwrap();
        assert_eq!(index.version, INDEX_FORMAT_VERSION);
    }
}
